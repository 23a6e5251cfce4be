use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ApiError;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Authenticated,
    Anonymous,
}

/// HTTP client bound to one service origin.
///
/// Authenticated requests pick up the bearer token from the session store at
/// send time. A 401 answer ends the session before the error is returned.
pub struct ServiceClient {
    service: &'static str,
    base_url: String,
    http: reqwest::Client,
    session: Arc<Session>,
}

impl ServiceClient {
    pub fn new(service: &'static str, base_url: &str, http: reqwest::Client, session: Arc<Session>) -> Self {
        Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            session,
        }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.call(Method::GET, path, Access::Authenticated, |b| b).await?;
        decode("GET", path, &body)
    }

    pub async fn get_with<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let body = self
            .call(Method::GET, path, Access::Authenticated, |b| b.query(query))
            .await?;
        decode("GET", path, &body)
    }

    pub async fn post<B, T>(&self, path: &str, payload: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .call(Method::POST, path, Access::Authenticated, |b| b.json(payload))
            .await?;
        decode("POST", path, &body)
    }

    /// POST without credentials, for login and registration.
    pub async fn post_anonymous<B, T>(&self, path: &str, payload: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .call(Method::POST, path, Access::Anonymous, |b| b.json(payload))
            .await?;
        decode("POST", path, &body)
    }

    pub async fn put<B, T>(&self, path: &str, payload: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .call(Method::PUT, path, Access::Authenticated, |b| b.json(payload))
            .await?;
        decode("PUT", path, &body)
    }

    /// DELETE; the acknowledgement body is only logged.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let body = self.call(Method::DELETE, path, Access::Authenticated, |b| b).await?;
        tracing::debug!(service = self.service, path, response = %body.trim(), "Deleted");
        Ok(())
    }

    async fn call<F>(&self, method: Method, path: &str, access: Access, prepare: F) -> Result<String, ApiError>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let endpoint = format!("{} {}", method, path);
        let mut builder = self.http.request(method, format!("{}{}", self.base_url, path));
        if access == Access::Authenticated {
            builder = self.attach_token(builder);
        }
        let builder = prepare(builder);

        tracing::debug!(service = self.service, %endpoint, "Request");
        let response = builder.send().await.map_err(|source| self.transport(&endpoint, source))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| self.transport(&endpoint, source))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(self.reject(&endpoint, status, access, &body))
        }
    }

    fn attach_token(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn transport(&self, endpoint: &str, source: reqwest::Error) -> ApiError {
        tracing::error!(service = self.service, endpoint, error = %source, "Request failed");
        ApiError::Transport {
            service: self.service,
            source,
        }
    }

    fn reject(&self, endpoint: &str, status: StatusCode, access: Access, body: &str) -> ApiError {
        let message = error_message(body);
        tracing::warn!(
            service = self.service,
            endpoint,
            status = status.as_u16(),
            %message,
            "Request rejected"
        );

        match status {
            StatusCode::UNAUTHORIZED => {
                if access == Access::Authenticated {
                    self.session.expire();
                }
                ApiError::Unauthorized
            }
            StatusCode::NOT_FOUND => ApiError::NotFound { message },
            s if s.is_client_error() => ApiError::Rejected {
                status: s.as_u16(),
                message,
            },
            s => ApiError::Server {
                status: s.as_u16(),
                message,
            },
        }
    }
}

fn decode<T: DeserializeOwned>(method: &str, path: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|source| ApiError::Malformed {
        endpoint: format!("{} {}", method, path),
        source,
    })
}

/// Services answer errors either as `{"error": ...}` JSON or plain text.
fn error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        #[serde(alias = "message")]
        error: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.trim().to_string(),
    }
}

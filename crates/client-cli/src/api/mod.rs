//! Typed clients for the core, studies and rooms services.

mod client;
mod core_service;
mod rooms_service;
mod studies_service;

use std::sync::Arc;

use thiserror::Error;

pub use self::client::ServiceClient;
pub use self::core_service::CoreApi;
pub use self::rooms_service::RoomsApi;
pub use self::studies_service::StudiesApi;

use crate::config::ServicesConfig;
use crate::session::Session;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not reach the {service} service: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("not authorized")]
    Unauthorized,
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response from {endpoint}: {source}")]
    Malformed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Unauthorized,
    NotFound,
    Rejected,
    Server,
    Malformed,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Transport { .. } => ErrorKind::Network,
            ApiError::Unauthorized => ErrorKind::Unauthorized,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::Rejected { .. } => ErrorKind::Rejected,
            ApiError::Server { .. } => ErrorKind::Server,
            ApiError::Malformed { .. } => ErrorKind::Malformed,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// One client per service, all sharing the same session.
pub struct Backend {
    pub core: CoreApi,
    pub studies: StudiesApi,
    pub rooms: RoomsApi,
    session: Arc<Session>,
}

impl Backend {
    pub fn new(services: &ServicesConfig, session: Arc<Session>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("fruit/", env!("FRUIT_VERSION")))
            .timeout(services.request_timeout())
            .build()?;

        let client = |name: &'static str, url: &str| ServiceClient::new(name, url, http.clone(), session.clone());

        Ok(Self {
            core: CoreApi::new(client("core", &services.core_url)),
            studies: StudiesApi::new(client("studies", &services.studies_url)),
            rooms: RoomsApi::new(client("rooms", &services.rooms_url)),
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

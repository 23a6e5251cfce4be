use shared::{
    AuthResponse, Contact, ContactPayload, ContactsPage, LoginRequest, RegisterRequest, Status,
    StatusHistoryResponse, StatusUpdateRequest, StatusUpdateResponse, StatusesResponse, User, UsersResponse,
};

use super::{ApiError, ServiceClient};

/// Auth, users, contacts and statuses.
pub struct CoreApi {
    client: ServiceClient,
}

impl CoreApi {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.client.post_anonymous("/login", &request).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.client.post_anonymous("/register", request).await
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.client.get("/users/me").await
    }

    /// Admin only.
    pub async fn list_users(&self) -> Result<UsersResponse, ApiError> {
        self.client.get("/users").await
    }

    pub async fn list_contacts(&self, limit: u32, offset: u32) -> Result<ContactsPage, ApiError> {
        self.client
            .get_with("/contacts", &[("limit", limit), ("offset", offset)])
            .await
    }

    pub async fn get_contact(&self, id: i64) -> Result<Contact, ApiError> {
        self.client.get(&format!("/contacts/{}", id)).await
    }

    pub async fn create_contact(&self, payload: &ContactPayload) -> Result<Contact, ApiError> {
        self.client.post("/contacts", payload).await
    }

    pub async fn update_contact(&self, id: i64, payload: &ContactPayload) -> Result<Contact, ApiError> {
        self.client.put(&format!("/contacts/{}", id), payload).await
    }

    pub async fn delete_contact(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete(&format!("/contacts/{}", id)).await
    }

    pub async fn update_contact_status(
        &self,
        id: i64,
        status_id: i64,
        notes: &str,
    ) -> Result<StatusUpdateResponse, ApiError> {
        let request = StatusUpdateRequest {
            status_id,
            notes: notes.to_string(),
        };
        self.client.put(&format!("/contacts/{}/status", id), &request).await
    }

    pub async fn status_history(&self, id: i64) -> Result<StatusHistoryResponse, ApiError> {
        self.client.get(&format!("/contacts/{}/status-history", id)).await
    }

    pub async fn list_statuses(&self) -> Result<StatusesResponse, ApiError> {
        self.client.get("/statuses").await
    }

    pub async fn get_status(&self, id: i64) -> Result<Status, ApiError> {
        self.client.get(&format!("/statuses/{}", id)).await
    }
}

//! Transport seam for the browser-side stores. Every call receives its
//! bearer token explicitly; there is no ambient client configuration to
//! mutate.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    api::response::{ApiResponse, PageMeta},
    error::FieldErrors,
    models::{AuthPayload, ContactDraft, ContactResponse, UserPayload, UserSummary},
};

/// The server's structured failure envelope, surfaced to callers for
/// display.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiFailure {
    pub message: String,
    pub errors: Option<FieldErrors>,
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Api(#[from] ApiFailure),
    #[error("transport error: {0}")]
    Transport(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Active filter set mirrored by the contacts store and sent verbatim as
/// query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactFilters {
    pub search: String,
    pub company: String,
    pub sort_by: String,
    pub sort_order: String,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ContactFilters {
    fn default() -> Self {
        Self {
            search: String::new(),
            company: String::new(),
            sort_by: "created_at".to_string(),
            sort_order: "desc".to_string(),
            page: 1,
            per_page: 15,
        }
    }
}

#[async_trait]
pub trait ContactsGateway: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> GatewayResult<AuthPayload>;
    async fn logout(&self, token: &str) -> GatewayResult<()>;
    async fn fetch_user(&self, token: &str) -> GatewayResult<UserSummary>;
    async fn refresh(&self, token: &str) -> GatewayResult<AuthPayload>;

    async fn list_contacts(
        &self,
        token: &str,
        filters: &ContactFilters,
    ) -> GatewayResult<(Vec<ContactResponse>, PageMeta)>;
    async fn fetch_contact(&self, token: &str, id: Uuid) -> GatewayResult<ContactResponse>;
    async fn create_contact(
        &self,
        token: &str,
        draft: &ContactDraft,
    ) -> GatewayResult<ContactResponse>;
    async fn update_contact(
        &self,
        token: &str,
        id: Uuid,
        draft: &ContactDraft,
    ) -> GatewayResult<ContactResponse>;
    async fn delete_contact(&self, token: &str, id: Uuid) -> GatewayResult<()>;
}

/// HTTP gateway speaking the envelope protocol over reqwest.
pub struct HttpGateway {
    base_url: String,
    http: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn transport(e: reqwest::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}

async fn read_data<T: DeserializeOwned>(response: reqwest::Response) -> GatewayResult<T> {
    let envelope: ApiResponse<T> = response.json().await.map_err(transport)?;
    if envelope.success {
        envelope
            .data
            .ok_or_else(|| GatewayError::Transport("missing data payload".to_string()))
    } else {
        Err(GatewayError::Api(ApiFailure {
            message: envelope.message,
            errors: envelope.errors,
            error: envelope.error,
        }))
    }
}

async fn read_page(
    response: reqwest::Response,
) -> GatewayResult<(Vec<ContactResponse>, PageMeta)> {
    let envelope: ApiResponse<Vec<ContactResponse>> = response.json().await.map_err(transport)?;
    if envelope.success {
        Ok((
            envelope.data.unwrap_or_default(),
            envelope.meta.unwrap_or_default(),
        ))
    } else {
        Err(GatewayError::Api(ApiFailure {
            message: envelope.message,
            errors: envelope.errors,
            error: envelope.error,
        }))
    }
}

async fn read_empty(response: reqwest::Response) -> GatewayResult<()> {
    let envelope: ApiResponse<serde_json::Value> = response.json().await.map_err(transport)?;
    if envelope.success {
        Ok(())
    } else {
        Err(GatewayError::Api(ApiFailure {
            message: envelope.message,
            errors: envelope.errors,
            error: envelope.error,
        }))
    }
}

#[async_trait]
impl ContactsGateway for HttpGateway {
    async fn login(&self, email: &str, password: &str) -> GatewayResult<AuthPayload> {
        let response = self
            .http
            .post(self.url("/api/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;
        read_data(response).await
    }

    async fn logout(&self, token: &str) -> GatewayResult<()> {
        let response = self
            .http
            .post(self.url("/api/logout"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        read_empty(response).await
    }

    async fn fetch_user(&self, token: &str) -> GatewayResult<UserSummary> {
        let response = self
            .http
            .get(self.url("/api/user"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        let payload: UserPayload = read_data(response).await?;
        Ok(payload.user)
    }

    async fn refresh(&self, token: &str) -> GatewayResult<AuthPayload> {
        let response = self
            .http
            .post(self.url("/api/refresh"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        read_data(response).await
    }

    async fn list_contacts(
        &self,
        token: &str,
        filters: &ContactFilters,
    ) -> GatewayResult<(Vec<ContactResponse>, PageMeta)> {
        let response = self
            .http
            .get(self.url("/api/contacts"))
            .bearer_auth(token)
            .query(filters)
            .send()
            .await
            .map_err(transport)?;
        read_page(response).await
    }

    async fn fetch_contact(&self, token: &str, id: Uuid) -> GatewayResult<ContactResponse> {
        let response = self
            .http
            .get(self.url(&format!("/api/contacts/{id}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        read_data(response).await
    }

    async fn create_contact(
        &self,
        token: &str,
        draft: &ContactDraft,
    ) -> GatewayResult<ContactResponse> {
        let response = self
            .http
            .post(self.url("/api/contacts"))
            .bearer_auth(token)
            .json(draft)
            .send()
            .await
            .map_err(transport)?;
        read_data(response).await
    }

    async fn update_contact(
        &self,
        token: &str,
        id: Uuid,
        draft: &ContactDraft,
    ) -> GatewayResult<ContactResponse> {
        let response = self
            .http
            .put(self.url(&format!("/api/contacts/{id}")))
            .bearer_auth(token)
            .json(draft)
            .send()
            .await
            .map_err(transport)?;
        read_data(response).await
    }

    async fn delete_contact(&self, token: &str, id: Uuid) -> GatewayResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("/api/contacts/{id}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        read_empty(response).await
    }
}

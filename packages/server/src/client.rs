//! HTTP implementation of the editor session's `TreeApi`

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use treestage_core::staging::ApiError;
use treestage_core::{ChangeSet, Node, NodeTree, TreeApi};

use crate::HttpError;

/// `TreeApi` over the tree server's REST endpoints
#[derive(Debug, Clone)]
pub struct HttpTreeApi {
    client: Client,
    base_url: String,
}

impl HttpTreeApi {
    /// `base_url` is the server origin, e.g. `http://localhost:5000`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::transport(err.to_string())
}

/// Turn an error status into `ApiError::Server`, using the `HttpError`
/// message when the body carries one
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.map_err(transport)?;
    let message = match serde_json::from_str::<HttpError>(&body) {
        Ok(err) => err.message,
        Err(_) if body.is_empty() => status.to_string(),
        Err(_) => body,
    };
    tracing::debug!("Tree server returned {}: {}", status, message);
    Err(ApiError::server(status.as_u16(), message))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    check_status(response)
        .await?
        .json::<T>()
        .await
        .map_err(transport)
}

#[async_trait]
impl TreeApi for HttpTreeApi {
    async fn get_root(&self) -> Result<Option<NodeTree>, ApiError> {
        let response = self
            .client
            .get(self.url("/tree"))
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await
    }

    async fn get_node(&self, id: i64) -> Result<Node, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/tree/{}", id)))
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound { id });
        }
        read_json(response).await
    }

    async fn apply_changes(&self, changes: &ChangeSet) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.url("/tree"))
            .json(changes)
            .send()
            .await
            .map_err(transport)?;
        check_status(response).await?;
        Ok(())
    }

    async fn reset(&self) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/tree/reset"))
            .send()
            .await
            .map_err(transport)?;
        check_status(response).await?;
        Ok(())
    }

    async fn filter_removed(&self, ids: Vec<i64>) -> Result<Vec<i64>, ApiError> {
        let response = self
            .client
            .post(self.url("/tree/filterOutNotRemovedIds"))
            .json(&ids)
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await
    }
}

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use taskflow_shared::{
    CreateTaskRequest, ErrorResponse, Priority, RenameTaskRequest, Suggestion, SuggestionRequest,
    Task, UpdateTaskStatusRequest,
};
use url::Url;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("bad url: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Everything the presentation layer needs from the server.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list(&self) -> ApiResult<Vec<Task>>;
    async fn create(&self, title: &str, priority: Priority) -> ApiResult<Task>;
    async fn set_completed(&self, id: Uuid, completed: bool) -> ApiResult<Task>;
    async fn rename(&self, id: Uuid, title: &str) -> ApiResult<Task>;
    async fn delete(&self, id: Uuid) -> ApiResult<()>;
    async fn suggest(&self, title: &str) -> ApiResult<Suggestion>;
}

pub struct HttpTaskApi {
    client: Client,
    base: Url,
}

impl HttpTaskApi {
    /// `base` may carry a path prefix (`http://host/api`); request paths
    /// are resolved beneath it.
    pub fn new(mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { client: Client::new(), base }
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base.join(path)?)
    }

    async fn send(request: RequestBuilder) -> ApiResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|err| err.error)
            .unwrap_or(body);
        Err(ApiError::Status { status, message })
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> ApiResult<T> {
        Ok(Self::send(request).await?.json().await?)
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list(&self) -> ApiResult<Vec<Task>> {
        Self::send_json(self.client.get(self.url("tasks")?)).await
    }

    async fn create(&self, title: &str, priority: Priority) -> ApiResult<Task> {
        let body = CreateTaskRequest { title: title.to_string(), priority };
        Self::send_json(self.client.post(self.url("tasks")?).json(&body)).await
    }

    async fn set_completed(&self, id: Uuid, completed: bool) -> ApiResult<Task> {
        let url = self.url(&format!("tasks/{id}/status"))?;
        Self::send_json(self.client.patch(url).json(&UpdateTaskStatusRequest { completed })).await
    }

    async fn rename(&self, id: Uuid, title: &str) -> ApiResult<Task> {
        let url = self.url(&format!("tasks/{id}/title"))?;
        let body = RenameTaskRequest { title: title.to_string() };
        Self::send_json(self.client.patch(url).json(&body)).await
    }

    async fn delete(&self, id: Uuid) -> ApiResult<()> {
        Self::send(self.client.delete(self.url(&format!("tasks/{id}"))?)).await?;
        Ok(())
    }

    async fn suggest(&self, title: &str) -> ApiResult<Suggestion> {
        let body = SuggestionRequest { title: title.to_string() };
        Self::send_json(self.client.post(self.url("suggestions")?).json(&body)).await
    }
}

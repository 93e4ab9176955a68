use crate::{
    CallResult, Envelope, MAX_IMAGE_SIZE, Params, Resource, StoryId,
    requests, responses,
};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// An API client for interfacing with the backend.
///
/// Every endpoint answers with an [`Envelope`]; methods decode it into a
/// [`CallResult`] and reserve `Err` for transport and decoding problems.
pub struct APIClient {
    pub address: String,
    pub inner_client: reqwest::Client,
}

/// Helper methods for http actions
impl APIClient {
    fn format_url(&self, path: &str) -> String {
        format!("{}/api/{path}", &self.address)
    }

    async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> ReqwestResult {
        let request =
            self.inner_client.get(self.format_url(path)).query(query);

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request.send().await
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> ReqwestResult {
        let request = self.inner_client.post(self.format_url(path)).json(body);

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request.send().await
    }

    async fn put(&self, path: &str, body: &impl Serialize) -> ReqwestResult {
        let request = self.inner_client.put(self.format_url(path)).json(body);

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request.send().await
    }

    async fn delete_path(&self, path: &str) -> ReqwestResult {
        let request = self.inner_client.delete(self.format_url(path));

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request.send().await
    }

    async fn multipart_post(&self, path: &str, form: Form) -> ReqwestResult {
        let request =
            self.inner_client.post(self.format_url(path)).multipart(form);

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request.send().await
    }
}

/// Generic resource endpoints
impl APIClient {
    /// Fetch one page of a list endpoint.
    pub async fn list<T: DeserializeOwned>(
        &self,
        resource: Resource,
        params: &Params,
    ) -> Result<CallResult<Vec<T>>, ClientError> {
        let response = self.get(resource.path(), &params.to_query()).await?;
        envelope(response).await
    }

    pub async fn get_one<T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: impl std::fmt::Display,
    ) -> Result<CallResult<T>, ClientError> {
        let response = self.get(&format!("{resource}/{id}"), &[]).await?;
        envelope(response).await
    }

    pub async fn create<T: DeserializeOwned>(
        &self,
        resource: Resource,
        body: &impl Serialize,
    ) -> Result<CallResult<T>, ClientError> {
        let response = self.post(resource.path(), body).await?;
        envelope(response).await
    }

    pub async fn update<T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: impl std::fmt::Display,
        body: &impl Serialize,
    ) -> Result<CallResult<T>, ClientError> {
        let response = self.put(&format!("{resource}/{id}"), body).await?;
        envelope(response).await
    }

    pub async fn delete(
        &self,
        resource: Resource,
        id: impl std::fmt::Display,
    ) -> Result<CallResult<()>, ClientError> {
        let response = self.delete_path(&format!("{resource}/{id}")).await?;
        envelope(response).await
    }

    /// Upload a file with JSON metadata as a multipart form.
    ///
    /// The browser fetch API exposes no upload progress, so `on_progress`
    /// sees 0 before the request and 100 once the backend has answered.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        resource: Resource,
        file: requests::UploadFile,
        metadata: &impl Serialize,
        on_progress: impl Fn(u8),
    ) -> Result<CallResult<T>, ClientError> {
        on_progress(0);

        let form = upload_form(file, metadata)?;
        let response = self
            .multipart_post(&format!("{resource}/upload"), form)
            .await?;
        let result = envelope(response).await;

        on_progress(100);
        result
    }
}

/// Multipart body for an upload: the file under "file" and the JSON
/// encoded metadata under "metadata".
fn upload_form(
    file: requests::UploadFile,
    metadata: &impl Serialize,
) -> Result<Form, ClientError> {
    let metadata =
        serde_json::to_string(metadata).map_err(ClientError::Encode)?;

    let mut part = Part::bytes(file.bytes).file_name(file.file_name);
    if let Some(mime_type) = &file.mime_type {
        part = part.mime_str(mime_type)?;
    }
    Ok(Form::new().part("file", part).text("metadata", metadata))
}

/// Typed endpoints used by the admin screens
impl APIClient {
    pub async fn list_stories(
        &self,
        params: &Params,
    ) -> Result<CallResult<Vec<responses::Story>>, ClientError> {
        self.list(Resource::Stories, params).await
    }

    pub async fn list_tours(
        &self,
        params: &Params,
    ) -> Result<CallResult<Vec<responses::Tour>>, ClientError> {
        self.list(Resource::Tours, params).await
    }

    pub async fn list_books(
        &self,
        params: &Params,
    ) -> Result<CallResult<Vec<responses::Book>>, ClientError> {
        self.list(Resource::Books, params).await
    }

    pub async fn list_gallery(
        &self,
        params: &Params,
    ) -> Result<CallResult<Vec<responses::GalleryImage>>, ClientError> {
        self.list(Resource::Gallery, params).await
    }

    pub async fn get_story(
        &self,
        story_id: StoryId,
    ) -> Result<CallResult<responses::Story>, ClientError> {
        self.get_one(Resource::Stories, story_id).await
    }

    pub async fn create_story(
        &self,
        details: &requests::CreateStory,
    ) -> Result<CallResult<responses::Story>, ClientError> {
        self.create(Resource::Stories, details).await
    }

    pub async fn update_story(
        &self,
        story_id: StoryId,
        details: &requests::UpdateStory,
    ) -> Result<CallResult<responses::Story>, ClientError> {
        self.update(Resource::Stories, story_id, details).await
    }

    pub async fn delete_story(
        &self,
        story_id: StoryId,
    ) -> Result<CallResult<()>, ClientError> {
        self.delete(Resource::Stories, story_id).await
    }

    /// Oversized files are rejected locally as a logical failure without
    /// contacting the backend.
    pub async fn upload_gallery_image(
        &self,
        file: requests::UploadFile,
        metadata: &requests::GalleryImageMetadata,
        on_progress: impl Fn(u8),
    ) -> Result<CallResult<responses::GalleryImage>, ClientError> {
        if file.len() > MAX_IMAGE_SIZE {
            return Ok(CallResult::failure(format!(
                "File is too large ({:.1}MB). Maximum size is {}MB.",
                file.len() as f64 / 1_048_576.0,
                MAX_IMAGE_SIZE / 1_048_576
            )));
        }
        self.upload(Resource::Gallery, file, metadata, on_progress)
            .await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An unhandled API error to display, containing response text.
    #[error("{1}")]
    APIError(StatusCode, String),
    #[error("Network error. Please check your connection.")]
    Network(#[from] reqwest::Error),
    #[error("Unexpected response from server: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Could not encode the request: {0}")]
    Encode(serde_json::Error),
}

/// Read the response body and decode it as an envelope.
pub async fn envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<CallResult<T>, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    decode_envelope(status, &body)
}

/// Decode a response body.
///
/// Error statuses carrying a failure envelope are logical failures; any
/// other error status is an [`ClientError::APIError`].
pub fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<CallResult<T>, ClientError> {
    match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) if status.is_success() || !envelope.success => {
            envelope.into_call_result()
        }
        Ok(_) => Err(ClientError::APIError(status, body.to_string())),
        Err(e) if status.is_success() => Err(ClientError::Decode(e)),
        Err(_) => Err(ClientError::APIError(status, body.to_string())),
    }
}

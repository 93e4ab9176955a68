//! Backend calls shaped for the hooks.
//!
//! List functions take owned [`Params`], mutations take owned request
//! bodies, and uploads take a [`ProgressReporter`], so each can be handed
//! to the matching hook as is.

use payloads::{
    CallResult, ClientError, Params, StoryId, requests, responses,
};

use crate::get_api_client;
use crate::hooks::ProgressReporter;

pub async fn list_stories(
    params: Params,
) -> Result<CallResult<Vec<responses::Story>>, ClientError> {
    get_api_client().list_stories(&params).await
}

pub async fn list_tours(
    params: Params,
) -> Result<CallResult<Vec<responses::Tour>>, ClientError> {
    get_api_client().list_tours(&params).await
}

pub async fn list_books(
    params: Params,
) -> Result<CallResult<Vec<responses::Book>>, ClientError> {
    get_api_client().list_books(&params).await
}

pub async fn list_gallery(
    params: Params,
) -> Result<CallResult<Vec<responses::GalleryImage>>, ClientError> {
    get_api_client().list_gallery(&params).await
}

pub async fn get_story(
    story_id: StoryId,
) -> Result<CallResult<responses::Story>, ClientError> {
    get_api_client().get_story(story_id).await
}

pub async fn create_story(
    details: requests::CreateStory,
) -> Result<CallResult<responses::Story>, ClientError> {
    get_api_client().create_story(&details).await
}

pub async fn update_story(
    story_id: StoryId,
    details: requests::UpdateStory,
) -> Result<CallResult<responses::Story>, ClientError> {
    get_api_client().update_story(story_id, &details).await
}

pub async fn delete_story(
    story_id: StoryId,
) -> Result<CallResult<()>, ClientError> {
    get_api_client().delete_story(story_id).await
}

pub async fn upload_gallery_image(
    file: requests::UploadFile,
    metadata: requests::GalleryImageMetadata,
    progress: ProgressReporter,
) -> Result<CallResult<responses::GalleryImage>, ClientError> {
    get_api_client()
        .upload_gallery_image(file, &metadata, progress.as_fn())
        .await
}

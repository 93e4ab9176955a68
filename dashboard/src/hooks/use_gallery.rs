use payloads::{Params, requests, responses};
use yew::prelude::*;

use crate::hooks::{
    UseApiFormOptions, UseFileUploadHandle, UsePaginatedApiHandle,
    use_file_upload, use_paginated_api,
};
use crate::services;

/// Hook for the gallery grid; "load more" appends further pages.
#[hook]
pub fn use_gallery(
    initial_params: Params,
) -> UsePaginatedApiHandle<responses::GalleryImage> {
    use_paginated_api((), services::list_gallery, initial_params)
}

/// Hook for the gallery upload form.
#[hook]
pub fn use_gallery_upload(
    options: UseApiFormOptions<responses::GalleryImage>,
) -> UseFileUploadHandle<
    requests::UploadFile,
    requests::GalleryImageMetadata,
    responses::GalleryImage,
> {
    use_file_upload((), services::upload_gallery_image, options)
}

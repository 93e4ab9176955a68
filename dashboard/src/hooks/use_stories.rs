use payloads::{Params, StoryId, requests, responses};
use yew::prelude::*;

use crate::hooks::{
    UseApiFormHandle, UseApiFormOptions, UseApiHandle, UseApiOptions,
    UsePaginatedApiHandle, use_api, use_api_form, use_paginated_api,
};
use crate::services;

/// Hook for the stories table, filtered and paged by `initial_params`.
#[hook]
pub fn use_stories(
    initial_params: Params,
) -> UsePaginatedApiHandle<responses::Story> {
    use_paginated_api((), services::list_stories, initial_params)
}

/// Hook to fetch one story, refetching when `story_id` changes.
#[hook]
pub fn use_story(story_id: StoryId) -> UseApiHandle<(), responses::Story> {
    use_api(
        story_id,
        move |()| services::get_story(story_id),
        UseApiOptions::immediate(),
    )
}

#[hook]
pub fn use_create_story(
    options: UseApiFormOptions<responses::Story>,
) -> UseApiFormHandle<requests::CreateStory, responses::Story> {
    use_api_form((), services::create_story, options)
}

#[hook]
pub fn use_update_story(
    story_id: StoryId,
    options: UseApiFormOptions<responses::Story>,
) -> UseApiFormHandle<requests::UpdateStory, responses::Story> {
    use_api_form(
        story_id,
        move |details| services::update_story(story_id, details),
        options,
    )
}

/// Delete confirmation flow; submit with the id of the story to remove.
#[hook]
pub fn use_delete_story(
    options: UseApiFormOptions<()>,
) -> UseApiFormHandle<StoryId, ()> {
    use_api_form((), services::delete_story, options)
}

use payloads::{Params, responses};
use yew::prelude::*;

use crate::hooks::{UsePaginatedApiHandle, use_paginated_api};
use crate::services;

#[hook]
pub fn use_books(
    initial_params: Params,
) -> UsePaginatedApiHandle<responses::Book> {
    use_paginated_api((), services::list_books, initial_params)
}

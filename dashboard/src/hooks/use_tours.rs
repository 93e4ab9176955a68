use payloads::{Params, responses};
use yew::prelude::*;

use crate::hooks::{UsePaginatedApiHandle, use_paginated_api};
use crate::services;

/// Hook for the tours listing shared by the admin table and the public
/// tours page.
#[hook]
pub fn use_tours(
    initial_params: Params,
) -> UsePaginatedApiHandle<responses::Tour> {
    use_paginated_api((), services::list_tours, initial_params)
}

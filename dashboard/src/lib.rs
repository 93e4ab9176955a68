//! Data-fetching state for the admin dashboard and the public site.
//!
//! The hooks in [`hooks`] wrap backend calls with loading, error and
//! pagination state. Each is a thin Yew layer over a plain state machine
//! ([`hooks::ApiCall`], [`hooks::PaginatedApi`], [`hooks::FormSubmit`],
//! [`hooks::FileUpload`]) that can be driven without a renderer.

use payloads::APIClient;

pub mod hooks;
pub mod logs;
pub mod services;

pub use logs::init_logging;

/// Backend used when neither `BACKEND_URL` nor a browser origin is
/// available.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// API client for the configured backend.
///
/// `BACKEND_URL` set at build time wins, then the page's own origin.
pub fn get_api_client() -> APIClient {
    APIClient {
        address: backend_address(),
        inner_client: reqwest::Client::new(),
    }
}

fn backend_address() -> String {
    option_env!("BACKEND_URL")
        .map(|url| url.to_string())
        .or_else(same_origin)
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
}

#[cfg(target_arch = "wasm32")]
fn same_origin() -> Option<String> {
    web_sys::window()?.location().origin().ok()
}

#[cfg(not(target_arch = "wasm32"))]
fn same_origin() -> Option<String> {
    None
}

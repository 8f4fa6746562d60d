/**
 * Application State
 *
 * Shared state for the API server
 */
use crate::api_service::Api;

/// Application state shared across all requests. Request-scoped identity is
/// never stored here; the auth middleware attaches it to each request.
pub struct AppState {
    pub api: Api,
}

impl AppState {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

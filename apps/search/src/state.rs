use std::sync::Arc;

use tokio::sync::Mutex;

use crate::session::Session;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The single operator session. Locking it serialises interactions: an
    /// upload batch or query runs to completion before the next one starts.
    pub session: Arc<Mutex<Session>>,
    /// Whether completion-service error detail is shown on the page.
    pub expose_error_detail: bool,
}

impl AppState {
    pub fn new(session: Session, expose_error_detail: bool) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            expose_error_detail,
        }
    }
}

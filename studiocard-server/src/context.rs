use std::sync::Arc;

use axum::extract::FromRef;
use studiocard_collab::Studio;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub studio: Arc<Studio>,
}

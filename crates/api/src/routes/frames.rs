use axum::routing::delete;
use axum::Router;

use crate::handlers::frame;
use crate::state::AppState;

/// Routes mounted at `/frames`.
///
/// ```text
/// DELETE /{frame_id}   -> delete_frame
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{frame_id}", delete(frame::delete_frame))
}

//! Route definitions for the item collaborator surface.

use axum::routing::get;
use axum::Router;

use crate::handlers::items;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/items/{id}", get(items::get_item).delete(items::delete_item))
}

use crate::state::ClubState;
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

pub const PUBLIC_DIR: &str = "public";

///Stylesheet, favicon and friends, straight off disk.
pub fn router() -> Router<ClubState> {
    Router::new()
        .nest_service("/public", ServeDir::new(PUBLIC_DIR))
        .route_service("/favicon.ico", ServeFile::new("public/favicon.svg"))
}

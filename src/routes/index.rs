use crate::{
    auth::{backend::Auth, get_auth_object},
    error::ClubError,
    liquid_utils::compile,
    state::ClubState,
};
use axum::{extract::State, response::IntoResponse, routing::get, Router};

#[axum::debug_handler]
async fn get_index(
    auth: Auth,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    let aa = get_auth_object(auth).await?;
    compile(
        "www/index.liquid",
        liquid::object!({ "auth": aa }),
        &state.settings,
        &state.cache,
    )
    .await
}

pub fn router() -> Router<ClubState> {
    Router::new().route("/", get(get_index))
}

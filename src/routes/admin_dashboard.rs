use crate::{
    auth::{
        backend::{Auth, ClubAuthBackend},
        get_auth_object, PermissionsTarget,
    },
    error::ClubError,
    flash::Flash,
    liquid_utils::compile_with_newtitle,
    state::ClubState,
};
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use axum_login::permission_required;
use tower_sessions::Session;

#[axum::debug_handler]
async fn get_admin_dashboard(
    auth: Auth,
    session: Session,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    debug!("Counting records");
    let members = state.db.count_members().await?;
    let workshops = state.db.count_workshops().await?;
    let rewards = state.db.count_rewards().await?;

    let flash = Flash::take(&session).await?;
    let aa = get_auth_object(auth).await?;

    compile_with_newtitle(
        "www/admin_dashboard.liquid",
        liquid::object!({
            "auth": aa,
            "flash": flash,
            "counts": {
                "members": members,
                "workshops": workshops,
                "rewards": rewards,
            },
        }),
        &state.settings,
        &state.cache,
        Some("Admin".into()),
    )
    .await
}

pub fn router() -> Router<ClubState> {
    Router::new()
        .route("/admin", get(get_admin_dashboard))
        .route_layer(permission_required!(
            ClubAuthBackend,
            login_url = "/dashboard",
            PermissionsTarget::ManageClub
        ))
}

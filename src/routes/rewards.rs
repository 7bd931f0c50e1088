use crate::{
    auth::{
        backend::{Auth, ClubAuthBackend},
        get_auth_object, PermissionsTarget,
    },
    error::ClubError,
    liquid_utils::compile_with_newtitle,
    progression::Level,
    state::{db_objects::DbReward, ClubState},
};
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use axum_login::permission_required;
use serde::Serialize;

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct ShownReward {
    pub id: String,
    pub name: String,
    pub description: String,
    pub points_cost: u32,
    pub min_level: u8,
    pub quantity: u32,
    pub affordable: bool,
    pub level_ok: bool,
}

impl ShownReward {
    pub fn new(reward: DbReward, points: u32, level: Level) -> Self {
        Self {
            affordable: points >= reward.points_cost,
            level_ok: level >= reward.min_level,
            id: reward.id,
            name: reward.name,
            description: reward.description,
            points_cost: reward.points_cost,
            min_level: reward.min_level.get(),
            quantity: reward.quantity,
        }
    }
}

#[axum::debug_handler]
async fn get_rewards(
    auth: Auth,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    let points = match &auth.user {
        Some(user) => state
            .db
            .get_member(&user.id)
            .await?
            .map_or(0, |m| m.points),
        None => 0,
    };
    let level = Level::for_points(points);

    let rewards: Vec<_> = state
        .db
        .all_rewards()
        .await?
        .into_iter()
        .map(|r| ShownReward::new(r, points, level))
        .collect();

    let aa = get_auth_object(auth).await?;
    compile_with_newtitle(
        "www/rewards.liquid",
        liquid::object!({
            "auth": aa,
            "rewards": rewards,
            "points": points,
        }),
        &state.settings,
        &state.cache,
        Some("Rewards".into()),
    )
    .await
}

pub fn router() -> Router<ClubState> {
    Router::new()
        .route("/rewards", get(get_rewards))
        .route_layer(permission_required!(
            ClubAuthBackend,
            login_url = "/signin",
            PermissionsTarget::SeeRewards
        ))
}

use crate::{
    auth::{
        backend::{Auth, ClubAuthBackend},
        get_auth_object, PermissionsTarget,
    },
    error::{ClubError, RecordKind},
    flash::Flash,
    liquid_utils::compile_with_newtitle,
    progression::Level,
    routes::FormReward,
    state::{db::NewReward, db_objects::DbReward, ClubState},
};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use axum_login::permission_required;
use tower_sessions::Session;

pub const LOCATION: &str = "/admin/rewards";

///Rewards need a name and have to cost something.
pub fn check_reward(reward: &NewReward) -> Result<(), &'static str> {
    if reward.name.is_empty() {
        return Err("Rewards need a name.");
    }
    if reward.points_cost == 0 {
        return Err("Rewards need a point cost above zero.");
    }
    Ok(())
}

fn levels() -> Vec<u8> {
    Level::all().map(Level::get).collect()
}

#[axum::debug_handler]
async fn get_rewards(
    auth: Auth,
    session: Session,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    let rewards = state.db.all_rewards().await?;

    let flash = Flash::take(&session).await?;
    let aa = get_auth_object(auth).await?;

    compile_with_newtitle(
        "www/manage_rewards.liquid",
        liquid::object!({
            "auth": aa,
            "flash": flash,
            "rewards": rewards,
            "levels": levels(),
        }),
        &state.settings,
        &state.cache,
        Some("Manage Rewards".into()),
    )
    .await
}

#[instrument(level = "info", skip(session, state))]
async fn post_add_reward(
    session: Session,
    State(state): State<ClubState>,
    Form(form): Form<FormReward>,
) -> Result<impl IntoResponse, ClubError> {
    let new = NewReward::try_from(form)?;

    let flash = match check_reward(&new) {
        Err(msg) => Flash::error(msg),
        Ok(()) => {
            let reward = state.db.add_reward(new).await?;
            info!(id = ?reward.id, "Added reward");
            Flash::success(format!("Added {}.", reward.name))
        }
    };
    flash.push(&session).await?;

    Ok(Redirect::to(LOCATION))
}

#[axum::debug_handler]
async fn get_edit_reward(
    auth: Auth,
    session: Session,
    Path(id): Path<String>,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    let reward = state
        .db
        .get_reward(&id)
        .await?
        .ok_or(ClubError::MissingRecord {
            kind: RecordKind::Reward,
            id,
        })?;

    let flash = Flash::take(&session).await?;
    let aa = get_auth_object(auth).await?;

    compile_with_newtitle(
        "www/edit_reward.liquid",
        liquid::object!({
            "auth": aa,
            "flash": flash,
            "reward": reward,
            "levels": levels(),
        }),
        &state.settings,
        &state.cache,
        Some("Edit Reward".into()),
    )
    .await
}

#[instrument(level = "info", skip(session, state))]
async fn post_edit_reward(
    session: Session,
    Path(id): Path<String>,
    State(state): State<ClubState>,
    Form(form): Form<FormReward>,
) -> Result<impl IntoResponse, ClubError> {
    let new = NewReward::try_from(form)?;
    if let Err(msg) = check_reward(&new) {
        Flash::error(msg).push(&session).await?;
        return Ok(Redirect::to(&format!("{LOCATION}/{id}")));
    }

    let NewReward {
        name,
        description,
        points_cost,
        min_level,
        quantity,
    } = new;
    state
        .db
        .save_reward(&DbReward {
            id,
            name,
            description,
            points_cost,
            min_level,
            quantity,
        })
        .await?;

    Flash::success("Reward updated.").push(&session).await?;
    Ok(Redirect::to(LOCATION))
}

#[instrument(level = "info", skip(session, state))]
async fn post_delete_reward(
    session: Session,
    Path(id): Path<String>,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    state.db.remove_reward(&id).await?;
    Flash::success("Reward removed.").push(&session).await?;
    Ok(Redirect::to(LOCATION))
}

pub fn router() -> Router<ClubState> {
    Router::new()
        .route(LOCATION, get(get_rewards).post(post_add_reward))
        .route(
            "/admin/rewards/:id",
            get(get_edit_reward).post(post_edit_reward),
        )
        .route("/admin/rewards/:id/delete", post(post_delete_reward))
        .route_layer(permission_required!(
            ClubAuthBackend,
            login_url = "/dashboard",
            PermissionsTarget::ManageClub
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_reward(name: &str, points_cost: u32) -> NewReward {
        NewReward {
            name: name.into(),
            description: String::new(),
            points_cost,
            min_level: Level::MIN,
            quantity: 1,
        }
    }

    #[test]
    fn rewards_need_a_name_and_a_cost() {
        assert!(check_reward(&new_reward("Mug", 50)).is_ok());
        assert!(check_reward(&new_reward("", 50)).is_err());
        assert!(check_reward(&new_reward("Mug", 0)).is_err());
    }
}

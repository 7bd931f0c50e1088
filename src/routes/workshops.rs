use crate::{
    auth::{
        backend::{Auth, ClubAuthBackend},
        get_auth_object, PermissionsTarget,
    },
    error::ClubError,
    flash::Flash,
    liquid_utils::{compile_with_newtitle, CustomFormat},
    membership::{can_register, RegistrationRefusal},
    state::{
        db_objects::{DbMember, DbWorkshop},
        ClubState,
    },
};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Router,
};
use axum_login::permission_required;
use serde::Serialize;
use tower_sessions::Session;

///What the register button on each workshop should say and do.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegisterButton {
    SignIn,
    RequiresLevel,
    AlreadyRegistered,
    Register,
}

impl From<Result<(), RegistrationRefusal>> for RegisterButton {
    fn from(value: Result<(), RegistrationRefusal>) -> Self {
        match value {
            Ok(()) => Self::Register,
            Err(RegistrationRefusal::NotSignedIn) => Self::SignIn,
            Err(RegistrationRefusal::InsufficientLevel { .. }) => Self::RequiresLevel,
            Err(RegistrationRefusal::AlreadyRegistered) => Self::AlreadyRegistered,
        }
    }
}

#[derive(Serialize, Debug)]
struct ShownWorkshop {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub points: u32,
    pub min_level: u8,
    pub button: RegisterButton,
}

impl ShownWorkshop {
    fn new(workshop: DbWorkshop, member: Option<&DbMember>, state: &ClubState) -> Self {
        let button = can_register(member, &workshop).into();
        let DbWorkshop {
            id,
            title,
            description,
            date,
            time,
            location,
            points,
            min_level,
        } = workshop;

        Self {
            id,
            title,
            description,
            date: date.to_env_string(&state.settings.niche.date_format),
            time: time.to_env_string(&state.settings.niche.time_format),
            location,
            points,
            min_level: min_level.get(),
            button,
        }
    }
}

#[axum::debug_handler]
async fn get_workshops(
    auth: Auth,
    session: Session,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    let member = match &auth.user {
        Some(user) => state.db.get_member(&user.id).await?,
        None => None,
    };

    debug!("Getting workshops");
    let workshops: Vec<_> = state
        .db
        .all_workshops()
        .await?
        .into_iter()
        .map(|w| ShownWorkshop::new(w, member.as_ref(), &state))
        .collect();

    let level = member.map(|m| m.level().get());
    let flash = Flash::take(&session).await?;
    let aa = get_auth_object(auth).await?;

    compile_with_newtitle(
        "www/workshops.liquid",
        liquid::object!({
            "auth": aa,
            "flash": flash,
            "workshops": workshops,
            "level": level,
        }),
        &state.settings,
        &state.cache,
        Some("Workshops".into()),
    )
    .await
}

#[axum::debug_handler]
async fn post_register(
    auth: Auth,
    session: Session,
    Path(workshop_id): Path<String>,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    let member_id = auth.user.as_ref().map(|u| u.id.as_str());

    let flash = match state.db.register_for_workshop(member_id, &workshop_id).await {
        Ok(member) => {
            info!(member = ?member.id, ?workshop_id, points = ?member.points, "Registered for workshop");
            Flash::success("Successfully registered for the workshop!")
        }
        Err(ClubError::Registration { source }) => {
            debug!(?source, ?workshop_id, "Registration refused");
            Flash::error(source.to_string())
        }
        Err(e) => return Err(e),
    };
    flash.push(&session).await?;

    Ok(Redirect::to("/workshops"))
}

pub fn router() -> Router<ClubState> {
    Router::new()
        .route("/workshops", get(get_workshops))
        .route("/workshops/:id/register", post(post_register))
        .route_layer(permission_required!(
            ClubAuthBackend,
            login_url = "/signin",
            PermissionsTarget::RegisterForWorkshops
        ))
}

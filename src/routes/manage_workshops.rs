use crate::{
    auth::{
        backend::{Auth, ClubAuthBackend},
        get_auth_object, PermissionsTarget,
    },
    error::{ClubError, RecordKind},
    flash::Flash,
    liquid_utils::{compile_with_newtitle, CustomFormat},
    progression::Level,
    routes::{FormWorkshop, DEFAULT_WORKSHOP_POINTS},
    state::{db::NewWorkshop, db_objects::DbWorkshop, ClubState},
};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use axum_login::permission_required;
use tower_sessions::Session;

pub const LOCATION: &str = "/admin/workshops";

///Dates and times go out in the shape the html inputs want them back in.
fn workshop_object(workshop: DbWorkshop, state: &ClubState) -> liquid::Object {
    liquid::object!({
        "id": workshop.id,
        "title": workshop.title,
        "description": workshop.description,
        "date": workshop.date.to_env_string(&state.settings.niche.date_format),
        "time": workshop.time.to_env_string(&state.settings.niche.time_format),
        "date_input": workshop.date.to_env_string("%Y-%m-%d"),
        "time_input": workshop.time.to_env_string("%H:%M"),
        "location": workshop.location,
        "points": workshop.points,
        "min_level": workshop.min_level.get(),
    })
}

fn levels() -> Vec<u8> {
    Level::all().map(Level::get).collect()
}

#[axum::debug_handler]
async fn get_workshops(
    auth: Auth,
    session: Session,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    let workshops: Vec<_> = state
        .db
        .all_workshops()
        .await?
        .into_iter()
        .map(|w| workshop_object(w, &state))
        .collect();

    let flash = Flash::take(&session).await?;
    let aa = get_auth_object(auth).await?;

    compile_with_newtitle(
        "www/manage_workshops.liquid",
        liquid::object!({
            "auth": aa,
            "flash": flash,
            "workshops": workshops,
            "levels": levels(),
            "default_points": DEFAULT_WORKSHOP_POINTS,
        }),
        &state.settings,
        &state.cache,
        Some("Manage Workshops".into()),
    )
    .await
}

#[instrument(level = "info", skip(session, state))]
async fn post_add_workshop(
    session: Session,
    State(state): State<ClubState>,
    Form(form): Form<FormWorkshop>,
) -> Result<impl IntoResponse, ClubError> {
    let new = NewWorkshop::try_from(form)?;

    let flash = if new.title.is_empty() {
        Flash::error("Workshops need a title.")
    } else {
        let workshop = state.db.add_workshop(new).await?;
        info!(id = ?workshop.id, "Added workshop");
        Flash::success(format!("Added {}.", workshop.title))
    };
    flash.push(&session).await?;

    Ok(Redirect::to(LOCATION))
}

#[axum::debug_handler]
async fn get_edit_workshop(
    auth: Auth,
    session: Session,
    Path(id): Path<String>,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    let workshop = state
        .db
        .get_workshop(&id)
        .await?
        .ok_or(ClubError::MissingRecord {
            kind: RecordKind::Workshop,
            id,
        })?;

    let flash = Flash::take(&session).await?;
    let aa = get_auth_object(auth).await?;

    compile_with_newtitle(
        "www/edit_workshop.liquid",
        liquid::object!({
            "auth": aa,
            "flash": flash,
            "workshop": workshop_object(workshop, &state),
            "levels": levels(),
        }),
        &state.settings,
        &state.cache,
        Some("Edit Workshop".into()),
    )
    .await
}

#[instrument(level = "info", skip(session, state))]
async fn post_edit_workshop(
    session: Session,
    Path(id): Path<String>,
    State(state): State<ClubState>,
    Form(form): Form<FormWorkshop>,
) -> Result<impl IntoResponse, ClubError> {
    let NewWorkshop {
        title,
        description,
        date,
        time,
        location,
        points,
        min_level,
    } = NewWorkshop::try_from(form)?;

    if title.is_empty() {
        Flash::error("Workshops need a title.").push(&session).await?;
        return Ok(Redirect::to(&format!("{LOCATION}/{id}")));
    }

    state
        .db
        .save_workshop(&DbWorkshop {
            id,
            title,
            description,
            date,
            time,
            location,
            points,
            min_level,
        })
        .await?;

    Flash::success("Workshop updated.").push(&session).await?;
    Ok(Redirect::to(LOCATION))
}

#[instrument(level = "info", skip(session, state))]
async fn post_delete_workshop(
    session: Session,
    Path(id): Path<String>,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    state.db.remove_workshop(&id).await?;
    Flash::success("Workshop removed.").push(&session).await?;
    Ok(Redirect::to(LOCATION))
}

pub fn router() -> Router<ClubState> {
    Router::new()
        .route(LOCATION, get(get_workshops).post(post_add_workshop))
        .route(
            "/admin/workshops/:id",
            get(get_edit_workshop).post(post_edit_workshop),
        )
        .route("/admin/workshops/:id/delete", post(post_delete_workshop))
        .route_layer(permission_required!(
            ClubAuthBackend,
            login_url = "/dashboard",
            PermissionsTarget::ManageClub
        ))
}

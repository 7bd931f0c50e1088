//! Admin pages for members - search, add, edit, delete, and handing out points for a workshop.

use crate::{
    auth::{
        backend::{Auth, ClubAuthBackend},
        get_auth_object, PermissionsRole, PermissionsTarget,
    },
    error::{ClubError, RecordKind},
    flash::Flash,
    liquid_utils::{compile_with_newtitle, CustomFormat},
    routes::FormMember,
    state::{db::ClubDB, db_objects::DbMember, ClubState},
};
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use axum_login::permission_required;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tower_sessions::Session;

pub const LOCATION: &str = "/admin/members";

#[derive(Deserialize, Debug, Default)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

///Case-insensitive substring match on name or email. An empty query matches everyone.
pub fn matches_search(member: &DbMember, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty()
        || member.name.to_lowercase().contains(&query)
        || member.email.to_lowercase().contains(&query)
}

///Whether someone other than `except_id` already has this email.
async fn email_taken(
    db: &ClubDB,
    email: &str,
    except_id: Option<&str>,
) -> Result<bool, ClubError> {
    Ok(db
        .find_member_by_email(email)
        .await?
        .is_some_and(|m| Some(m.id.as_str()) != except_id))
}

#[derive(Serialize, Debug)]
struct ShownMember {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub points: u32,
    pub level: u8,
    pub join_date: String,
}

impl ShownMember {
    fn new(member: DbMember, date_format: &str) -> Self {
        Self {
            level: member.level().get(),
            join_date: member.join_date.to_env_string(date_format),
            role: member.role.to_string(),
            id: member.id,
            name: member.name,
            email: member.email,
            points: member.points,
        }
    }
}

fn roles() -> Vec<String> {
    PermissionsRole::iter().map(|r| r.to_string()).collect()
}

#[axum::debug_handler]
async fn get_members(
    auth: Auth,
    session: Session,
    Query(SearchQuery { q }): Query<SearchQuery>,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    let members: Vec<_> = state
        .db
        .all_members()
        .await?
        .into_iter()
        .filter(|m| matches_search(m, &q))
        .map(|m| ShownMember::new(m, &state.settings.niche.date_format))
        .collect();

    let flash = Flash::take(&session).await?;
    let aa = get_auth_object(auth).await?;

    compile_with_newtitle(
        "www/manage_members.liquid",
        liquid::object!({
            "auth": aa,
            "flash": flash,
            "members": members,
            "q": q,
            "roles": roles(),
        }),
        &state.settings,
        &state.cache,
        Some("Members".into()),
    )
    .await
}

#[instrument(level = "info", skip(session, state))]
async fn post_add_member(
    session: Session,
    State(state): State<ClubState>,
    Form(FormMember { name, email, role }): Form<FormMember>,
) -> Result<impl IntoResponse, ClubError> {
    let (name, email) = (name.trim(), email.trim());

    let flash = if name.is_empty() || email.is_empty() {
        Flash::error("Name and email are both needed.")
    } else if email_taken(&state.db, email, None).await? {
        Flash::error(format!("{email} is already in use."))
    } else {
        let member = state.db.add_member(name, email, role).await?;
        info!(id = ?member.id, "Added member");
        Flash::success(format!("Added {name}."))
    };
    flash.push(&session).await?;

    Ok(Redirect::to(LOCATION))
}

async fn member_or_missing(db: &ClubDB, id: &str) -> Result<DbMember, ClubError> {
    db.get_member(id)
        .await?
        .ok_or_else(|| ClubError::MissingRecord {
            kind: RecordKind::Member,
            id: id.to_string(),
        })
}

#[axum::debug_handler]
async fn get_edit_member(
    auth: Auth,
    session: Session,
    Path(id): Path<String>,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    let member = member_or_missing(&state.db, &id).await?;
    let workshops: Vec<_> = state
        .db
        .all_workshops()
        .await?
        .into_iter()
        .map(|w| {
            liquid::object!({
                "id": w.id,
                "title": w.title,
                "points": w.points,
            })
        })
        .collect();
    let activities: Vec<_> = member
        .activities
        .iter()
        .map(|a| {
            liquid::object!({
                "description": a.description.clone(),
                "date": a.date.to_env_string(&state.settings.niche.date_time_format),
            })
        })
        .collect();

    let flash = Flash::take(&session).await?;
    let aa = get_auth_object(auth).await?;

    compile_with_newtitle(
        "www/edit_member.liquid",
        liquid::object!({
            "auth": aa,
            "flash": flash,
            "member": ShownMember::new(member, &state.settings.niche.date_format),
            "activities": activities,
            "workshops": workshops,
            "roles": roles(),
        }),
        &state.settings,
        &state.cache,
        Some("Edit Member".into()),
    )
    .await
}

///Only name, email and role come from the form - points and history stay as they are.
#[instrument(level = "info", skip(session, state))]
async fn post_edit_member(
    session: Session,
    Path(id): Path<String>,
    State(state): State<ClubState>,
    Form(FormMember { name, email, role }): Form<FormMember>,
) -> Result<impl IntoResponse, ClubError> {
    let (name, email) = (name.trim(), email.trim());
    let back = format!("{LOCATION}/{id}");

    if name.is_empty() || email.is_empty() {
        Flash::error("Name and email are both needed.")
            .push(&session)
            .await?;
        return Ok(Redirect::to(&back));
    }
    if email_taken(&state.db, email, Some(&id)).await? {
        Flash::error(format!("{email} is already in use."))
            .push(&session)
            .await?;
        return Ok(Redirect::to(&back));
    }

    let mut member = member_or_missing(&state.db, &id).await?;
    member.name = name.to_string();
    member.email = email.to_string();
    member.role = role;
    state.db.save_member(&member).await?;

    Flash::success(format!("Updated {name}."))
        .push(&session)
        .await?;
    Ok(Redirect::to(LOCATION))
}

#[instrument(level = "info", skip(session, state))]
async fn post_delete_member(
    session: Session,
    Path(id): Path<String>,
    State(state): State<ClubState>,
) -> Result<impl IntoResponse, ClubError> {
    state.db.remove_member(&id).await?;
    Flash::success("Member removed.").push(&session).await?;
    Ok(Redirect::to(LOCATION))
}

#[derive(Deserialize, Debug)]
pub struct AwardForm {
    pub workshop_id: String,
}

#[instrument(level = "info", skip(session, state))]
async fn post_award(
    session: Session,
    Path(id): Path<String>,
    State(state): State<ClubState>,
    Form(AwardForm { workshop_id }): Form<AwardForm>,
) -> Result<impl IntoResponse, ClubError> {
    let member = state.db.award_workshop_points(&id, &workshop_id).await?;
    info!(points = ?member.points, "Awarded points");

    Flash::success(format!(
        "{} now has {} points.",
        member.name, member.points
    ))
    .push(&session)
    .await?;
    Ok(Redirect::to(&format!("{LOCATION}/{id}")))
}

pub fn router() -> Router<ClubState> {
    Router::new()
        .route(LOCATION, get(get_members).post(post_add_member))
        .route("/admin/members/:id", get(get_edit_member).post(post_edit_member))
        .route("/admin/members/:id/delete", post(post_delete_member))
        .route("/admin/members/:id/award", post(post_award))
        .route_layer(permission_required!(
            ClubAuthBackend,
            login_url = "/dashboard",
            PermissionsTarget::ManageClub
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{membership::tests::member, state::db::tests::memory_db};

    #[test]
    fn search_ignores_case_and_checks_both_fields() {
        let m = member(0);
        assert!(matches_search(&m, ""));
        assert!(matches_search(&m, "  "));
        assert!(matches_search(&m, &m.name.to_uppercase()));
        assert!(matches_search(&m, &m.email[..3].to_uppercase()));
        assert!(!matches_search(&m, "definitely not in there"));
    }

    #[tokio::test]
    async fn editing_yourself_keeps_your_email() {
        let db = memory_db().await;
        let ada = db
            .add_member("Ada", "ada@example.com", PermissionsRole::Member)
            .await
            .expect("add");

        assert!(!email_taken(&db, "ada@example.com", Some(&ada.id))
            .await
            .expect("lookup"));
        assert!(email_taken(&db, "ada@example.com", None)
            .await
            .expect("lookup"));
        assert!(!email_taken(&db, "bob@example.com", None)
            .await
            .expect("lookup"));
    }
}

use crate::{
    auth::{
        backend::{Auth, ClubAuthBackend},
        get_auth_object,
    },
    error::ClubError,
    flash::Flash,
    liquid_utils::{compile_with_newtitle, CustomFormat},
    membership::MAX_RECENT_ACTIVITIES,
    progression::Progress,
    state::{
        db_objects::{Activity, DbMember, DbWorkshop},
        ClubState,
    },
};
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use axum_login::login_required;
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;
use tower_sessions::Session;

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct AttendedWorkshop {
    pub id: String,
    pub title: Option<String>,
    pub removed: bool,
}

///Looks each attended id up in `workshops` - ids whose workshop has since been deleted are kept and marked as removed.
pub fn attended_workshops(member: &DbMember, workshops: &[DbWorkshop]) -> Vec<AttendedWorkshop> {
    let by_id: HashMap<_, _> = workshops.iter().map(|w| (w.id.as_str(), w)).collect();

    member
        .workshops_attended
        .iter()
        .map(|id| {
            let title = by_id.get(id.as_str()).map(|w| w.title.clone());
            AttendedWorkshop {
                id: id.clone(),
                removed: title.is_none(),
                title,
            }
        })
        .collect()
}

#[derive(Serialize, Debug)]
struct ShownActivity {
    pub description: String,
    pub date: String,
    pub kind: String,
}

///Newest first, at most [`MAX_RECENT_ACTIVITIES`].
pub fn recent_activities(activities: &[Activity]) -> Vec<&Activity> {
    activities
        .iter()
        .sorted_by(|a, b| b.date.cmp(&a.date))
        .take(MAX_RECENT_ACTIVITIES)
        .collect()
}

#[axum::debug_handler]
async fn get_dashboard(
    mut auth: Auth,
    session: Session,
    State(state): State<ClubState>,
) -> Result<Response, ClubError> {
    let Some(user) = auth.user.clone() else {
        return Ok(Redirect::to("/signin").into_response());
    };
    let Some(member) = state.db.get_member(&user.id).await? else {
        warn!(id = ?user.id, "Signed in member no longer exists");
        auth.logout().await?;
        return Ok(Redirect::to("/signin").into_response());
    };

    debug!("Getting workshops for attended list");
    let workshops = state.db.all_workshops().await?;
    let attended = attended_workshops(&member, &workshops);

    let activities = recent_activities(&member.activities)
        .into_iter()
        .map(|a| ShownActivity {
            description: a.description.clone(),
            date: a
                .date
                .to_env_string(&state.settings.niche.date_time_format),
            kind: a.kind.to_string(),
        })
        .collect_vec();

    let progress = Progress::for_points(member.points);
    let flash = Flash::take(&session).await?;
    let aa = get_auth_object(auth).await?;

    Ok(compile_with_newtitle(
        "www/dashboard.liquid",
        liquid::object!({
            "auth": aa,
            "flash": flash,
            "member": {
                "name": member.name,
                "email": member.email,
                "join_date": member.join_date.to_env_string(&state.settings.niche.date_format),
            },
            "progress": progress,
            "workshop_count": attended.len(),
            "attended": attended,
            "activities": activities,
        }),
        &state.settings,
        &state.cache,
        Some("Dashboard".into()),
    )
    .await?
    .into_response())
}

pub fn router() -> Router<ClubState> {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route_layer(login_required!(ClubAuthBackend, login_url = "/signin"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::tests::{member, workshop};
    use crate::state::db_objects::ActivityKind;
    use chrono::{TimeZone, Utc};

    #[test]
    fn removed_workshops_still_show() {
        let mut m = member(0);
        m.workshops_attended.push("kept".into());
        m.workshops_attended.push("gone".into());

        let attended = attended_workshops(&m, &[workshop("kept", 10, 1)]);
        assert_eq!(
            attended,
            vec![
                AttendedWorkshop {
                    id: "kept".into(),
                    title: Some("Workshop kept".into()),
                    removed: false,
                },
                AttendedWorkshop {
                    id: "gone".into(),
                    title: None,
                    removed: true,
                },
            ]
        );
    }

    #[test]
    fn recent_activities_sorts_and_trims() {
        let activity = |id: &str, hour: u32| Activity {
            id: id.into(),
            kind: ActivityKind::PointsAwarded,
            description: String::new(),
            date: Utc
                .with_ymd_and_hms(2024, 1, 1, hour, 0, 0)
                .single()
                .expect("valid timestamp"),
            workshop_id: None,
        };
        let all = vec![
            activity("a", 1),
            activity("d", 4),
            activity("b", 2),
            activity("c", 3),
        ];

        let ids = recent_activities(&all)
            .into_iter()
            .map(|a| a.id.as_str())
            .collect_vec();
        assert_eq!(ids, vec!["d", "c", "b"]);
    }
}

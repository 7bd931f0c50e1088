pub mod backend;
pub mod login;
pub mod sqlite_session;

use crate::{
    auth::backend::Auth,
    error::ClubError,
    progression::Level,
    state::db_objects::AuthorisationBackendMember,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::{Display, EnumIter, IntoEnumIterator};

#[derive(
    sqlx::Type,
    Clone,
    Copy,
    Ord,
    PartialOrd,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Debug,
    Display,
    EnumIter,
)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PermissionsRole {
    Member,
    Admin,
}

impl Default for PermissionsRole {
    fn default() -> Self {
        Self::Member
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, EnumIter)]
pub enum PermissionsTarget {
    SeeOwnDashboard,
    RegisterForWorkshops,
    SeeRewards,
    ManageClub,
}

impl PermissionsRole {
    pub fn can(self) -> HashSet<PermissionsTarget> {
        PermissionsTarget::iter()
            .filter(|target| match target {
                PermissionsTarget::SeeOwnDashboard
                | PermissionsTarget::RegisterForWorkshops
                | PermissionsTarget::SeeRewards => true,
                PermissionsTarget::ManageClub => self >= Self::Admin,
            })
            .collect()
    }

    pub fn landing_page(self) -> &'static str {
        match self {
            Self::Member => "/dashboard",
            Self::Admin => "/admin",
        }
    }
}

///Everything the templates need to know about who is looking - used by the navbar on every page.
pub async fn get_auth_object(auth: Auth) -> Result<liquid::Object, ClubError> {
    let Some(user) = auth.user else {
        return Ok(liquid::object!({
            "role": "visitor",
            "signed_in": false,
            "permissions": {
                "manage_club": false,
                "register_for_workshops": false,
            },
        }));
    };

    let AuthorisationBackendMember {
        id,
        name,
        email,
        role,
    } = user;
    let level = auth
        .backend
        .get_member(&id)
        .await?
        .map_or(Level::MIN, |member| member.level());
    let perms = role.can();

    Ok(liquid::object!({
        "role": role.to_string(),
        "signed_in": true,
        "permissions": {
            "manage_club": perms.contains(&PermissionsTarget::ManageClub),
            "register_for_workshops": perms.contains(&PermissionsTarget::RegisterForWorkshops),
        },
        "user": {
            "id": id,
            "name": name,
            "email": email,
            "level": level.get(),
        },
    }))
}

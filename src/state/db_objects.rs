use crate::{auth::PermissionsRole, progression::Level};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use strum::Display;

//get everything `id, name, email, role, points, join_date, workshops_attended, activities`
#[derive(Deserialize, Serialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct DbMember {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: PermissionsRole,
    pub points: u32,
    pub join_date: NaiveDate,
    ///opaque workshop ids - these can outlive the workshop they point at
    pub workshops_attended: Json<Vec<String>>,
    ///newest first
    pub activities: Json<Vec<Activity>>,
}

impl DbMember {
    pub fn level(&self) -> Level {
        Level::for_points(self.points)
    }

    pub fn has_attended(&self, workshop_id: &str) -> bool {
        self.workshops_attended.iter().any(|id| id == workshop_id)
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityKind {
    WorkshopRegistration,
    PointsAwarded,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Activity {
    pub id: String,
    pub kind: ActivityKind,
    pub description: String,
    pub date: DateTime<Utc>,
    pub workshop_id: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct DbWorkshop {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: String,
    pub points: u32,
    pub min_level: Level,
}

#[derive(Deserialize, Serialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct DbReward {
    pub id: String,
    pub name: String,
    pub description: String,
    pub points_cost: u32,
    pub min_level: Level,
    pub quantity: u32,
}

///The bits of a member that live in the session - everything else is re-read when needed.
#[derive(Clone, Debug, Serialize)]
pub struct AuthorisationBackendMember {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: PermissionsRole,
}

impl From<DbMember> for AuthorisationBackendMember {
    fn from(DbMember { id, name, email, role, .. }: DbMember) -> Self {
        Self {
            id,
            name,
            email,
            role,
        }
    }
}

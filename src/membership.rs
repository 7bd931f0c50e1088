//! The two ways a member's points change: signing up for a workshop, and an admin awarding points for one.
//!
//! Both work on an owned copy of the member, which the caller then writes back in full.

use crate::{
    progression::Level,
    state::db_objects::{Activity, ActivityKind, DbMember, DbWorkshop},
};
use chrono::{DateTime, Utc};
use snafu::Snafu;

///How many activities a member keeps, newest first.
pub const MAX_RECENT_ACTIVITIES: usize = 3;

#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum RegistrationRefusal {
    #[snafu(display("Please sign in to register for workshops"))]
    NotSignedIn,
    #[snafu(display("You need to be level {required} or higher to join this workshop"))]
    InsufficientLevel { required: Level, current: Level },
    #[snafu(display("You are already registered for this workshop"))]
    AlreadyRegistered,
}

///Checks whether `member` could sign up for `workshop` right now, without changing anything.
pub fn can_register(
    member: Option<&DbMember>,
    workshop: &DbWorkshop,
) -> Result<(), RegistrationRefusal> {
    let Some(member) = member else {
        return Err(RegistrationRefusal::NotSignedIn);
    };

    let current = member.level();
    if current < workshop.min_level {
        return Err(RegistrationRefusal::InsufficientLevel {
            required: workshop.min_level,
            current,
        });
    }

    if member.has_attended(&workshop.id) {
        return Err(RegistrationRefusal::AlreadyRegistered);
    }

    Ok(())
}

///Signs a member up for a workshop, awarding the workshop's points straight away.
pub fn register(
    member: Option<DbMember>,
    workshop: &DbWorkshop,
    activity_id: String,
    now: DateTime<Utc>,
) -> Result<DbMember, RegistrationRefusal> {
    can_register(member.as_ref(), workshop)?;
    let Some(mut member) = member else {
        return Err(RegistrationRefusal::NotSignedIn);
    };

    member.workshops_attended.push(workshop.id.clone());
    member.points = member.points.saturating_add(workshop.points);
    push_activity(
        &mut member,
        Activity {
            id: activity_id,
            kind: ActivityKind::WorkshopRegistration,
            description: format!(
                "Registered for workshop: {} (+{} points)",
                workshop.title, workshop.points
            ),
            date: now,
            workshop_id: Some(workshop.id.clone()),
        },
    );

    Ok(member)
}

///Gives a member the points for a workshop. Doesn't touch the attendance list.
pub fn award_points(
    mut member: DbMember,
    workshop: &DbWorkshop,
    activity_id: String,
    now: DateTime<Utc>,
) -> DbMember {
    member.points = member.points.saturating_add(workshop.points);
    push_activity(
        &mut member,
        Activity {
            id: activity_id,
            kind: ActivityKind::PointsAwarded,
            description: format!(
                "Completed workshop: {} (+{} points)",
                workshop.title, workshop.points
            ),
            date: now,
            workshop_id: Some(workshop.id.clone()),
        },
    );

    member
}

fn push_activity(member: &mut DbMember, activity: Activity) {
    member.activities.insert(0, activity);
    member.activities.truncate(MAX_RECENT_ACTIVITIES);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::PermissionsRole;
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use sqlx::types::Json;

    pub fn member(points: u32) -> DbMember {
        DbMember {
            id: "m1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            role: PermissionsRole::Member,
            points,
            join_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            workshops_attended: Json(vec![]),
            activities: Json(vec![]),
        }
    }

    pub fn workshop(id: &str, points: u32, min_level: u8) -> DbWorkshop {
        DbWorkshop {
            id: id.into(),
            title: format!("Workshop {id}"),
            description: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date"),
            time: NaiveTime::from_hms_opt(18, 0, 0).expect("valid time"),
            location: "Hall".into(),
            points,
            min_level: Level::new(min_level).expect("valid level"),
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, minute, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn new_member_registers_and_levels_up() {
        let registered = register(Some(member(0)), &workshop("w1", 150, 1), "a1".into(), at(0))
            .expect("should be able to register");

        assert_eq!(registered.points, 150);
        assert_eq!(registered.level().get(), 2);
        assert_eq!(registered.activities.len(), 1);
        assert_eq!(registered.activities[0].kind, ActivityKind::WorkshopRegistration);
        assert_eq!(registered.activities[0].workshop_id.as_deref(), Some("w1"));
        assert_eq!(registered.workshops_attended.0, vec!["w1".to_string()]);
    }

    #[test]
    fn registering_twice_changes_nothing() {
        let w = workshop("w1", 10, 1);
        let once = register(Some(member(0)), &w, "a1".into(), at(0)).expect("first registration");

        let err = register(Some(once.clone()), &w, "a2".into(), at(1))
            .expect_err("second registration must fail");
        assert_eq!(err, RegistrationRefusal::AlreadyRegistered);

        assert_eq!(once.workshops_attended.len(), 1);
        assert_eq!(once.activities.len(), 1);
        assert_eq!(once.points, 10);
    }

    #[test]
    fn level_gate_applies_whatever_the_points() {
        let err = register(Some(member(249)), &workshop("w1", 10, 3), "a1".into(), at(0))
            .expect_err("level 2 can't join a level 3 workshop");
        assert_eq!(
            err,
            RegistrationRefusal::InsufficientLevel {
                required: Level::new(3).expect("valid level"),
                current: Level::new(2).expect("valid level"),
            }
        );
        assert_eq!(
            err.to_string(),
            "You need to be level 3 or higher to join this workshop"
        );

        assert!(register(Some(member(250)), &workshop("w1", 10, 3), "a1".into(), at(0)).is_ok());
    }

    #[test]
    fn nobody_signed_in() {
        assert_eq!(
            register(None, &workshop("w1", 10, 1), "a1".into(), at(0)),
            Err(RegistrationRefusal::NotSignedIn)
        );
    }

    #[test]
    fn registration_keeps_three_newest_activities() {
        let mut m = member(0);
        for i in 0..5 {
            m = register(
                Some(m),
                &workshop(&format!("w{i}"), 1, 1),
                format!("a{i}"),
                at(i),
            )
            .expect("registration");
        }

        assert_eq!(m.activities.len(), MAX_RECENT_ACTIVITIES);
        let ids: Vec<_> = m.activities.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a4", "a3", "a2"]);
        assert_eq!(m.workshops_attended.len(), 5);
    }

    #[test]
    fn awards_are_bounded_the_same_way() {
        let w = workshop("w1", 300, 1);
        let mut m = member(0);
        for i in 0..4 {
            m = award_points(m, &w, format!("a{i}"), at(i));
        }

        assert_eq!(m.points, 1200);
        assert_eq!(m.level().get(), 5);
        assert_eq!(m.activities.len(), MAX_RECENT_ACTIVITIES);
        assert_eq!(m.activities[0].id, "a3");
        assert_eq!(m.activities[0].kind, ActivityKind::PointsAwarded);
        assert!(m.workshops_attended.is_empty());
    }

    #[test]
    fn points_saturate() {
        let m = award_points(member(u32::MAX - 1), &workshop("w1", 10, 1), "a".into(), at(0));
        assert_eq!(m.points, u32::MAX);
    }
}

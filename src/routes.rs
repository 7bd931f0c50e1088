pub mod admin_dashboard;
pub mod dashboard;
pub mod index;
pub mod manage_members;
pub mod manage_rewards;
pub mod manage_workshops;
pub mod public;
pub mod rewards;
pub mod workshops;

use crate::{
    auth::PermissionsRole,
    error::{
        ClubError, ParseIntSnafu, ParseTimeSnafu, RewardField, WhatToParse, WorkshopField,
    },
    progression::Level,
    state::db::{NewReward, NewWorkshop},
};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use snafu::ResultExt;
use std::str::FromStr;

///What the workshop points box means when it's left empty.
pub const DEFAULT_WORKSHOP_POINTS: u32 = 10;

#[derive(Deserialize, Debug)]
pub struct FormMember {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: PermissionsRole,
}

///Numbers come in as text so an empty box can fall back to a default rather than failing.
#[derive(Deserialize, Debug)]
pub struct FormWorkshop {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub points: String,
    #[serde(default)]
    pub min_level: String,
}

#[derive(Deserialize, Debug)]
pub struct FormReward {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub points_cost: String,
    #[serde(default)]
    pub min_level: String,
    #[serde(default)]
    pub quantity: String,
}

fn parse_or<T: FromStr<Err = std::num::ParseIntError>>(
    text: &str,
    default: T,
    what: impl Into<WhatToParse>,
) -> Result<T, ClubError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(default);
    }
    text.parse().context(ParseIntSnafu {
        what_to_convert_to: what.into(),
    })
}

fn parse_level(text: &str, what: impl Into<WhatToParse>) -> Result<Level, ClubError> {
    Ok(Level::new(parse_or(text, Level::MIN.get(), what)?)?)
}

pub fn parse_date(date: &str) -> Result<NaiveDate, ClubError> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").context(ParseTimeSnafu {
        original: date.to_string(),
    })
}

///Browsers send `HH:MM`, but some send seconds too.
pub fn parse_time(time: &str) -> Result<NaiveTime, ClubError> {
    let time = time.trim();
    NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .context(ParseTimeSnafu {
            original: time.to_string(),
        })
}

impl TryFrom<FormWorkshop> for NewWorkshop {
    type Error = ClubError;

    fn try_from(
        FormWorkshop {
            title,
            description,
            date,
            time,
            location,
            points,
            min_level,
        }: FormWorkshop,
    ) -> Result<Self, Self::Error> {
        Ok(Self {
            title: title.trim().to_string(),
            description,
            date: parse_date(&date)?,
            time: parse_time(&time)?,
            location,
            points: parse_or(&points, DEFAULT_WORKSHOP_POINTS, WorkshopField::Points)?,
            min_level: parse_level(&min_level, WorkshopField::MinLevel)?,
        })
    }
}

impl TryFrom<FormReward> for NewReward {
    type Error = ClubError;

    fn try_from(
        FormReward {
            name,
            description,
            points_cost,
            min_level,
            quantity,
        }: FormReward,
    ) -> Result<Self, Self::Error> {
        Ok(Self {
            name: name.trim().to_string(),
            description,
            points_cost: parse_or(&points_cost, 0, RewardField::PointsCost)?,
            min_level: parse_level(&min_level, RewardField::MinLevel)?,
            quantity: parse_or(&quantity, 0, RewardField::Quantity)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_workshop(points: &str, min_level: &str) -> FormWorkshop {
        FormWorkshop {
            title: " Knitting ".into(),
            description: String::new(),
            date: "2024-06-01".into(),
            time: "18:30".into(),
            location: "Hall".into(),
            points: points.into(),
            min_level: min_level.into(),
        }
    }

    #[test]
    fn empty_boxes_use_defaults() {
        let w = NewWorkshop::try_from(form_workshop("", "")).expect("valid form");
        assert_eq!(w.title, "Knitting");
        assert_eq!(w.points, DEFAULT_WORKSHOP_POINTS);
        assert_eq!(w.min_level, Level::MIN);
        assert_eq!(w.time, NaiveTime::from_hms_opt(18, 30, 0).expect("valid time"));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        assert!(matches!(
            NewWorkshop::try_from(form_workshop("-5", "1")),
            Err(ClubError::ParseInt { .. })
        ));
        assert!(matches!(
            NewWorkshop::try_from(form_workshop("5", "7")),
            Err(ClubError::Level { .. })
        ));
    }

    #[test]
    fn times_with_seconds_parse() {
        assert!(parse_time("09:15:00").is_ok());
        assert!(matches!(parse_time("late"), Err(ClubError::ParseTime { .. })));
        assert!(matches!(
            parse_date("01/06/2024"),
            Err(ClubError::ParseTime { .. })
        ));
    }

    #[test]
    fn reward_cost_defaults_to_zero_for_validation() {
        let r = NewReward::try_from(FormReward {
            name: "Mug".into(),
            description: String::new(),
            points_cost: String::new(),
            min_level: "2".into(),
            quantity: "3".into(),
        })
        .expect("valid form");
        assert_eq!(r.points_cost, 0);
        assert_eq!(r.min_level.get(), 2);
        assert_eq!(r.quantity, 3);
    }
}

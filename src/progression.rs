//! Points to level mapping. Levels are never stored, they are always worked out from the points a member currently has.

use serde::{Deserialize, Serialize};
use snafu::Snafu;
use std::fmt::{Display, Formatter};

///`(minimum points, level)`, highest first
const THRESHOLDS: [(u32, u8); 4] = [(1000, 5), (500, 4), (250, 3), (100, 2)];

#[derive(Debug, Snafu, Copy, Clone, PartialEq, Eq)]
#[snafu(display("Level must be between {} and {}, got {got}", Level::MIN.0, Level::MAX.0))]
pub struct InvalidLevel {
    pub got: u8,
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(try_from = "u8", into = "u8")]
#[sqlx(transparent)]
pub struct Level(u8);

impl Level {
    pub const MIN: Self = Self(1);
    pub const MAX: Self = Self(5);

    pub fn new(level: u8) -> Result<Self, InvalidLevel> {
        if (Self::MIN.0..=Self::MAX.0).contains(&level) {
            Ok(Self(level))
        } else {
            Err(InvalidLevel { got: level })
        }
    }

    pub fn for_points(points: u32) -> Self {
        THRESHOLDS
            .iter()
            .find(|(min, _)| points >= *min)
            .map_or(Self::MIN, |(_, level)| Self(*level))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    ///The points needed to reach the level above this one, or `None` at the top.
    pub fn next_threshold(self) -> Option<u32> {
        THRESHOLDS
            .iter()
            .rev()
            .find(|(_, level)| *level == self.0 + 1)
            .map(|(min, _)| *min)
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN.0..=Self::MAX.0).map(Self)
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u8> for Level {
    type Error = InvalidLevel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Level> for u8 {
    fn from(value: Level) -> Self {
        value.0
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

///What the dashboards show about how far along a member is.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub points: u32,
    pub level: Level,
    pub next_level_at: Option<u32>,
    pub points_to_next: Option<u32>,
    pub percent_to_next: u8,
}

impl Progress {
    pub fn for_points(points: u32) -> Self {
        let level = Level::for_points(points);
        let next_level_at = level.next_threshold();
        let floor = THRESHOLDS
            .iter()
            .find(|(_, l)| *l == level.0)
            .map_or(0, |(min, _)| *min);

        let percent_to_next = match next_level_at {
            None => 100,
            Some(next) => {
                let span = u64::from(next - floor);
                let done = u64::from(points - floor);
                u8::try_from(done * 100 / span).unwrap_or(100)
            }
        };

        Self {
            points,
            level,
            next_level_at,
            points_to_next: next_level_at.map(|next| next - points),
            percent_to_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_at_boundaries() {
        let expected = [
            (0, 1),
            (99, 1),
            (100, 2),
            (249, 2),
            (250, 3),
            (499, 3),
            (500, 4),
            (999, 4),
            (1000, 5),
            (u32::MAX, 5),
        ];

        for (points, level) in expected {
            assert_eq!(Level::for_points(points).get(), level, "points = {points}");
        }
    }

    #[test]
    fn level_never_goes_down_as_points_go_up() {
        let mut last = Level::MIN;
        for points in 0..=1500 {
            let level = Level::for_points(points);
            assert!(level >= last, "dropped at {points}");
            last = level;
        }
    }

    #[test]
    fn level_range_is_enforced() {
        assert!(Level::new(0).is_err());
        assert!(Level::new(6).is_err());
        assert_eq!(Level::new(3).map(Level::get), Ok(3));
        assert_eq!(Level::all().count(), 5);
    }

    #[test]
    fn next_threshold_per_level() {
        let next: Vec<_> = Level::all().map(Level::next_threshold).collect();
        assert_eq!(next, vec![Some(100), Some(250), Some(500), Some(1000), None]);
    }

    #[test]
    fn progress_midway() {
        let progress = Progress::for_points(150);
        assert_eq!(progress.level.get(), 2);
        assert_eq!(progress.next_level_at, Some(250));
        assert_eq!(progress.points_to_next, Some(100));
        assert_eq!(progress.percent_to_next, 33);

        let top = Progress::for_points(4000);
        assert_eq!(top.points_to_next, None);
        assert_eq!(top.percent_to_next, 100);
    }

    #[test]
    fn level_deserialises_from_form_numbers() {
        let level: Level = serde_json::from_str("4").expect("valid level");
        assert_eq!(level.get(), 4);
        assert!(serde_json::from_str::<Level>("9").is_err());
    }
}

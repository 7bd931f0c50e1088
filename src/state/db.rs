use crate::{
    auth::PermissionsRole,
    cfg::DatabaseSettings,
    error::{ClubError, DatabaseIDMethod, RecordKind, SqlxAction, SqlxSnafu},
    membership::{self, RegistrationRefusal},
    state::db_objects::{DbMember, DbReward, DbWorkshop},
};
use chrono::Utc;
use snafu::ResultExt;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    types::Json,
    Pool, Sqlite,
};
use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

pub static MIGRATOR: Migrator = sqlx::migrate!();

const MEMBER_COLUMNS: &str =
    "id, name, email, role, points, join_date, workshops_attended, activities";
const WORKSHOP_COLUMNS: &str = "id, title, description, date, time, location, points, min_level";
const REWARD_COLUMNS: &str = "id, name, description, points_cost, min_level, quantity";

///Everything needed to make a new workshop - the id gets filled in on insert.
#[derive(Debug, Clone)]
pub struct NewWorkshop {
    pub title: String,
    pub description: String,
    pub date: chrono::NaiveDate,
    pub time: chrono::NaiveTime,
    pub location: String,
    pub points: u32,
    pub min_level: crate::progression::Level,
}

#[derive(Debug, Clone)]
pub struct NewReward {
    pub name: String,
    pub description: String,
    pub points_cost: u32,
    pub min_level: crate::progression::Level,
    pub quantity: u32,
}

///The club's tables. Cheap to clone - built once in `main` and handed to whatever needs it.
#[derive(Clone, Debug)]
pub struct ClubDB {
    pool: Pool<Sqlite>,
    last_id: Arc<AtomicI64>,
}

impl ClubDB {
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, ClubError> {
        let options = SqliteConnectOptions::from_str(&settings.url)
            .context(SqlxSnafu {
                action: SqlxAction::Connecting,
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .connect_with(options)
            .await
            .context(SqlxSnafu {
                action: SqlxAction::Connecting,
            })?;

        Self::new(pool).await
    }

    ///Wraps an existing pool, bringing the schema up to date first.
    pub async fn new(pool: Pool<Sqlite>) -> Result<Self, ClubError> {
        MIGRATOR.run(&pool).await?;
        info!("Database migrations completed");

        Ok(Self {
            pool,
            last_id: Arc::new(AtomicI64::new(0)),
        })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    ///Timestamp-based ids: milliseconds since the epoch, bumped if two are asked for in the same millisecond.
    pub fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_id.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_id.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next.to_string(),
                Err(actual) => last = actual,
            }
        }
    }

    ///Puts the demo member in if there are no members at all.
    #[instrument(level = "debug", skip(self))]
    pub async fn seed_demo_member(&self, name: &str, email: &str) -> Result<(), ClubError> {
        if self.count_members().await? > 0 {
            return Ok(());
        }

        info!(?email, "Empty database, adding demo member");
        self.insert_member(&DbMember {
            id: "1".into(),
            name: name.into(),
            email: email.into(),
            role: PermissionsRole::Admin,
            points: 0,
            join_date: Utc::now().date_naive(),
            workshops_attended: Json(vec![]),
            activities: Json(vec![]),
        })
        .await
    }

    pub async fn get_member(&self, id: &str) -> Result<Option<DbMember>, ClubError> {
        sqlx::query_as::<_, DbMember>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context(SqlxSnafu {
            action: SqlxAction::FindingMember(id.into()),
        })
    }

    pub async fn find_member_by_email(&self, email: &str) -> Result<Option<DbMember>, ClubError> {
        sqlx::query_as::<_, DbMember>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context(SqlxSnafu {
            action: SqlxAction::FindingMember(DatabaseIDMethod::Email(email.to_string())),
        })
    }

    pub async fn all_members(&self) -> Result<Vec<DbMember>, ClubError> {
        sqlx::query_as::<_, DbMember>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .context(SqlxSnafu {
            action: SqlxAction::FindingMembers,
        })
    }

    pub async fn count_members(&self) -> Result<i64, ClubError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM members")
            .fetch_one(&self.pool)
            .await
            .context(SqlxSnafu {
                action: SqlxAction::CountingMembers,
            })
    }

    ///New members start with nothing - no points and no history.
    pub async fn add_member(
        &self,
        name: &str,
        email: &str,
        role: PermissionsRole,
    ) -> Result<DbMember, ClubError> {
        let member = DbMember {
            id: self.next_id(),
            name: name.into(),
            email: email.into(),
            role,
            points: 0,
            join_date: Utc::now().date_naive(),
            workshops_attended: Json(vec![]),
            activities: Json(vec![]),
        };
        self.insert_member(&member).await?;

        Ok(member)
    }

    async fn insert_member(&self, member: &DbMember) -> Result<(), ClubError> {
        sqlx::query(
            r#"
INSERT INTO members (id, name, email, role, points, join_date, workshops_attended, activities)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&member.id)
        .bind(&member.name)
        .bind(&member.email)
        .bind(member.role)
        .bind(member.points)
        .bind(member.join_date)
        .bind(&member.workshops_attended)
        .bind(&member.activities)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .context(SqlxSnafu {
            action: SqlxAction::AddingMember,
        })
    }

    ///Overwrites the whole member record.
    pub async fn save_member(&self, member: &DbMember) -> Result<(), ClubError> {
        let rows = sqlx::query(
            r#"
UPDATE members
SET name = ?, email = ?, role = ?, points = ?, join_date = ?, workshops_attended = ?, activities = ?
WHERE id = ?
        "#,
        )
        .bind(&member.name)
        .bind(&member.email)
        .bind(member.role)
        .bind(member.points)
        .bind(member.join_date)
        .bind(&member.workshops_attended)
        .bind(&member.activities)
        .bind(&member.id)
        .execute(&self.pool)
        .await
        .context(SqlxSnafu {
            action: SqlxAction::UpdatingMember(member.id.as_str().into()),
        })?
        .rows_affected();

        if rows == 0 {
            return Err(ClubError::MissingRecord {
                kind: RecordKind::Member,
                id: member.id.clone(),
            });
        }
        Ok(())
    }

    pub async fn remove_member(&self, id: &str) -> Result<(), ClubError> {
        sqlx::query("DELETE FROM members WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .context(SqlxSnafu {
                action: SqlxAction::RemovingMember(id.into()),
            })
    }

    pub async fn get_workshop(&self, id: &str) -> Result<Option<DbWorkshop>, ClubError> {
        sqlx::query_as::<_, DbWorkshop>(&format!(
            "SELECT {WORKSHOP_COLUMNS} FROM workshops WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context(SqlxSnafu {
            action: SqlxAction::FindingWorkshop(id.to_string()),
        })
    }

    ///Newest first.
    pub async fn all_workshops(&self) -> Result<Vec<DbWorkshop>, ClubError> {
        sqlx::query_as::<_, DbWorkshop>(&format!(
            "SELECT {WORKSHOP_COLUMNS} FROM workshops ORDER BY date DESC, time DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .context(SqlxSnafu {
            action: SqlxAction::FindingAllWorkshops,
        })
    }

    pub async fn count_workshops(&self) -> Result<i64, ClubError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM workshops")
            .fetch_one(&self.pool)
            .await
            .context(SqlxSnafu {
                action: SqlxAction::CountingWorkshops,
            })
    }

    pub async fn add_workshop(&self, new: NewWorkshop) -> Result<DbWorkshop, ClubError> {
        let NewWorkshop {
            title,
            description,
            date,
            time,
            location,
            points,
            min_level,
        } = new;
        let workshop = DbWorkshop {
            id: self.next_id(),
            title,
            description,
            date,
            time,
            location,
            points,
            min_level,
        };

        sqlx::query(
            r#"
INSERT INTO workshops (id, title, description, date, time, location, points, min_level)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&workshop.id)
        .bind(&workshop.title)
        .bind(&workshop.description)
        .bind(workshop.date)
        .bind(workshop.time)
        .bind(&workshop.location)
        .bind(workshop.points)
        .bind(workshop.min_level)
        .execute(&self.pool)
        .await
        .context(SqlxSnafu {
            action: SqlxAction::AddingWorkshop,
        })?;

        Ok(workshop)
    }

    pub async fn save_workshop(&self, workshop: &DbWorkshop) -> Result<(), ClubError> {
        let rows = sqlx::query(
            r#"
UPDATE workshops
SET title = ?, description = ?, date = ?, time = ?, location = ?, points = ?, min_level = ?
WHERE id = ?
        "#,
        )
        .bind(&workshop.title)
        .bind(&workshop.description)
        .bind(workshop.date)
        .bind(workshop.time)
        .bind(&workshop.location)
        .bind(workshop.points)
        .bind(workshop.min_level)
        .bind(&workshop.id)
        .execute(&self.pool)
        .await
        .context(SqlxSnafu {
            action: SqlxAction::UpdatingWorkshop(workshop.id.clone()),
        })?
        .rows_affected();

        if rows == 0 {
            return Err(ClubError::MissingRecord {
                kind: RecordKind::Workshop,
                id: workshop.id.clone(),
            });
        }
        Ok(())
    }

    ///Member records keep pointing at the old id - those are history, not live links.
    pub async fn remove_workshop(&self, id: &str) -> Result<(), ClubError> {
        sqlx::query("DELETE FROM workshops WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .context(SqlxSnafu {
                action: SqlxAction::RemovingWorkshop(id.to_string()),
            })
    }

    pub async fn get_reward(&self, id: &str) -> Result<Option<DbReward>, ClubError> {
        sqlx::query_as::<_, DbReward>(&format!(
            "SELECT {REWARD_COLUMNS} FROM rewards WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context(SqlxSnafu {
            action: SqlxAction::FindingReward(id.to_string()),
        })
    }

    pub async fn all_rewards(&self) -> Result<Vec<DbReward>, ClubError> {
        sqlx::query_as::<_, DbReward>(&format!(
            "SELECT {REWARD_COLUMNS} FROM rewards ORDER BY points_cost, name"
        ))
        .fetch_all(&self.pool)
        .await
        .context(SqlxSnafu {
            action: SqlxAction::FindingAllRewards,
        })
    }

    pub async fn count_rewards(&self) -> Result<i64, ClubError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM rewards")
            .fetch_one(&self.pool)
            .await
            .context(SqlxSnafu {
                action: SqlxAction::CountingRewards,
            })
    }

    pub async fn add_reward(&self, new: NewReward) -> Result<DbReward, ClubError> {
        let NewReward {
            name,
            description,
            points_cost,
            min_level,
            quantity,
        } = new;
        let reward = DbReward {
            id: self.next_id(),
            name,
            description,
            points_cost,
            min_level,
            quantity,
        };

        sqlx::query(
            r#"
INSERT INTO rewards (id, name, description, points_cost, min_level, quantity)
VALUES (?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&reward.id)
        .bind(&reward.name)
        .bind(&reward.description)
        .bind(reward.points_cost)
        .bind(reward.min_level)
        .bind(reward.quantity)
        .execute(&self.pool)
        .await
        .context(SqlxSnafu {
            action: SqlxAction::AddingReward,
        })?;

        Ok(reward)
    }

    pub async fn save_reward(&self, reward: &DbReward) -> Result<(), ClubError> {
        let rows = sqlx::query(
            r#"
UPDATE rewards
SET name = ?, description = ?, points_cost = ?, min_level = ?, quantity = ?
WHERE id = ?
        "#,
        )
        .bind(&reward.name)
        .bind(&reward.description)
        .bind(reward.points_cost)
        .bind(reward.min_level)
        .bind(reward.quantity)
        .bind(&reward.id)
        .execute(&self.pool)
        .await
        .context(SqlxSnafu {
            action: SqlxAction::UpdatingReward(reward.id.clone()),
        })?
        .rows_affected();

        if rows == 0 {
            return Err(ClubError::MissingRecord {
                kind: RecordKind::Reward,
                id: reward.id.clone(),
            });
        }
        Ok(())
    }

    pub async fn remove_reward(&self, id: &str) -> Result<(), ClubError> {
        sqlx::query("DELETE FROM rewards WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .context(SqlxSnafu {
                action: SqlxAction::RemovingReward(id.to_string()),
            })
    }

    ///Read, register, write back. Refusals come back as [`ClubError::Registration`] and leave the member untouched.
    #[instrument(level = "debug", skip(self))]
    pub async fn register_for_workshop(
        &self,
        member_id: Option<&str>,
        workshop_id: &str,
    ) -> Result<DbMember, ClubError> {
        let Some(member_id) = member_id else {
            return Err(RegistrationRefusal::NotSignedIn.into());
        };
        let member = self.get_member(member_id).await?;
        let workshop = self.get_workshop(workshop_id).await?.ok_or_else(|| {
            ClubError::MissingRecord {
                kind: RecordKind::Workshop,
                id: workshop_id.to_string(),
            }
        })?;

        let member = membership::register(member, &workshop, self.next_id(), Utc::now())?;
        self.save_member(&member).await?;

        Ok(member)
    }

    ///Gives a member the points for a workshop they completed.
    #[instrument(level = "debug", skip(self))]
    pub async fn award_workshop_points(
        &self,
        member_id: &str,
        workshop_id: &str,
    ) -> Result<DbMember, ClubError> {
        let member = self
            .get_member(member_id)
            .await?
            .ok_or_else(|| ClubError::MissingRecord {
                kind: RecordKind::Member,
                id: member_id.to_string(),
            })?;
        let workshop = self.get_workshop(workshop_id).await?.ok_or_else(|| {
            ClubError::MissingRecord {
                kind: RecordKind::Workshop,
                id: workshop_id.to_string(),
            }
        })?;

        let member = membership::award_points(member, &workshop, self.next_id(), Utc::now());
        self.save_member(&member).await?;

        Ok(member)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{membership::tests::workshop, progression::Level};
    use chrono::{NaiveDate, NaiveTime};

    ///A fresh, migrated, in-memory database. One connection, as each `:memory:` connection is its own database.
    pub async fn memory_db() -> ClubDB {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        ClubDB::new(pool).await.expect("migrations")
    }

    pub fn new_workshop(title: &str, points: u32, min_level: u8) -> NewWorkshop {
        let w = workshop("unused", points, min_level);
        NewWorkshop {
            title: title.into(),
            description: w.description,
            date: w.date,
            time: w.time,
            location: w.location,
            points,
            min_level: w.min_level,
        }
    }

    #[tokio::test]
    async fn seeding_only_happens_once() {
        let db = memory_db().await;
        db.seed_demo_member("Demo User", "demo@example.com")
            .await
            .expect("seed");
        db.seed_demo_member("Someone Else", "else@example.com")
            .await
            .expect("seed");

        assert_eq!(db.count_members().await.expect("count"), 1);
        let demo = db
            .find_member_by_email("demo@example.com")
            .await
            .expect("lookup")
            .expect("demo member");
        assert_eq!(demo.points, 0);
        assert_eq!(demo.level(), Level::MIN);
    }

    #[tokio::test]
    async fn ids_always_go_up() {
        let db = memory_db().await;
        let ids: Vec<_> = (0..100).map(|_| db.next_id()).collect();

        for pair in ids.windows(2) {
            let a: i64 = pair[0].parse().expect("numeric id");
            let b: i64 = pair[1].parse().expect("numeric id");
            assert!(b > a);
        }
    }

    #[tokio::test]
    async fn register_persists_the_whole_member() {
        let db = memory_db().await;
        let member = db
            .add_member("Ada", "ada@example.com", PermissionsRole::Member)
            .await
            .expect("add member");
        let w = db
            .add_workshop(new_workshop("Soldering", 150, 1))
            .await
            .expect("add workshop");

        db.register_for_workshop(Some(&member.id), &w.id)
            .await
            .expect("register");

        let stored = db
            .get_member(&member.id)
            .await
            .expect("lookup")
            .expect("member");
        assert_eq!(stored.points, 150);
        assert_eq!(stored.level().get(), 2);
        assert_eq!(stored.activities.len(), 1);
        assert!(stored.has_attended(&w.id));
    }

    #[tokio::test]
    async fn refused_registration_leaves_the_record_alone() {
        let db = memory_db().await;
        let member = db
            .add_member("Ada", "ada@example.com", PermissionsRole::Member)
            .await
            .expect("add member");
        let w = db
            .add_workshop(new_workshop("Advanced", 50, 4))
            .await
            .expect("add workshop");

        let err = db
            .register_for_workshop(Some(&member.id), &w.id)
            .await
            .expect_err("level 1 can't join");
        assert!(matches!(
            err,
            ClubError::Registration {
                source: RegistrationRefusal::InsufficientLevel { .. }
            }
        ));

        let stored = db
            .get_member(&member.id)
            .await
            .expect("lookup")
            .expect("member");
        assert_eq!(stored, member);

        assert!(matches!(
            db.register_for_workshop(None, &w.id).await,
            Err(ClubError::Registration {
                source: RegistrationRefusal::NotSignedIn
            })
        ));
    }

    #[tokio::test]
    async fn deleting_a_workshop_keeps_member_history() {
        let db = memory_db().await;
        let member = db
            .add_member("Ada", "ada@example.com", PermissionsRole::Member)
            .await
            .expect("add member");
        let w = db
            .add_workshop(new_workshop("Gone Soon", 20, 1))
            .await
            .expect("add workshop");
        db.register_for_workshop(Some(&member.id), &w.id)
            .await
            .expect("register");

        db.remove_workshop(&w.id).await.expect("remove");

        assert!(db.get_workshop(&w.id).await.expect("lookup").is_none());
        let stored = db
            .get_member(&member.id)
            .await
            .expect("lookup")
            .expect("member");
        assert!(stored.has_attended(&w.id));
        assert_eq!(stored.activities[0].workshop_id.as_deref(), Some(w.id.as_str()));
    }

    #[tokio::test]
    async fn awarding_points_updates_level() {
        let db = memory_db().await;
        let member = db
            .add_member("Ada", "ada@example.com", PermissionsRole::Member)
            .await
            .expect("add member");
        let w = db
            .add_workshop(new_workshop("Big One", 600, 1))
            .await
            .expect("add workshop");

        let awarded = db
            .award_workshop_points(&member.id, &w.id)
            .await
            .expect("award");
        assert_eq!(awarded.level().get(), 4);
        assert!(!awarded.has_attended(&w.id));

        assert!(matches!(
            db.award_workshop_points("nope", &w.id).await,
            Err(ClubError::MissingRecord {
                kind: RecordKind::Member,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn workshops_come_back_newest_first() {
        let db = memory_db().await;
        for (title, day) in [("Old", 1), ("New", 20), ("Middle", 10)] {
            db.add_workshop(NewWorkshop {
                date: NaiveDate::from_ymd_opt(2024, 3, day).expect("valid date"),
                time: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
                ..new_workshop(title, 10, 1)
            })
            .await
            .expect("add workshop");
        }

        let titles: Vec<_> = db
            .all_workshops()
            .await
            .expect("list")
            .into_iter()
            .map(|w| w.title)
            .collect();
        assert_eq!(titles, vec!["New", "Middle", "Old"]);
    }

    #[tokio::test]
    async fn rewards_round_trip_and_update() {
        let db = memory_db().await;
        let mut reward = db
            .add_reward(NewReward {
                name: "Sticker".into(),
                description: "Shiny".into(),
                points_cost: 50,
                min_level: Level::MIN,
                quantity: 10,
            })
            .await
            .expect("add reward");

        reward.quantity = 9;
        db.save_reward(&reward).await.expect("save");
        assert_eq!(
            db.get_reward(&reward.id).await.expect("lookup"),
            Some(reward.clone())
        );

        db.remove_reward(&reward.id).await.expect("remove");
        assert_eq!(db.count_rewards().await.expect("count"), 0);
        assert!(matches!(
            db.save_reward(&reward).await,
            Err(ClubError::MissingRecord { .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_emails_are_rejected_by_the_schema() {
        let db = memory_db().await;
        db.add_member("Ada", "ada@example.com", PermissionsRole::Member)
            .await
            .expect("first");
        assert!(db
            .add_member("Other Ada", "ada@example.com", PermissionsRole::Member)
            .await
            .is_err());
    }
}

use crate::error::{ClubError, SerdeJsonAction, SerdeJsonSnafu, SqlxAction, SqlxSnafu};
use serde_json::from_slice;
use snafu::ResultExt;
use sqlx::{Pool, Sqlite};
use std::time::Duration;
use time::OffsetDateTime;
use tower_sessions::{
    session::{Id, Record},
    session_store, ExpiredDeletion, SessionStore,
};

#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: &Id) -> Result<bool, ClubError> {
        let id = id.to_string();
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sessions WHERE id = ?")
            .bind(&id)
            .fetch_one(&self.pool)
            .await
            .map(|n| n > 0)
            .context(SqlxSnafu {
                action: SqlxAction::FindingSession(id),
            })
    }

    ///Spawns a task that clears out expired sessions every `period`.
    pub fn spawn_cleanup(self, period: Duration) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = self.delete_expired().await {
                    error!(?e, "Error deleting expired sessions");
                }
            }
        });
    }
}

fn backend(error: ClubError) -> session_store::Error {
    session_store::Error::Backend(error.to_string())
}

#[async_trait::async_trait]
impl ExpiredDeletion for SqliteStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        let deleted = sqlx::query("DELETE FROM sessions WHERE expiry_date < ?")
            .bind(OffsetDateTime::now_utc().unix_timestamp())
            .execute(&self.pool)
            .await
            .context(SqlxSnafu {
                action: SqlxAction::DeletingOldSessions,
            })
            .map_err(backend)?
            .rows_affected();

        trace!(?deleted, "Removed expired sessions");
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionStore for SqliteStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.exists(&record.id).await.map_err(backend)? {
            record.id = Id::default();
        }

        self.save(record).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let data = serde_json::to_vec(record)
            .context(SerdeJsonSnafu {
                action: SerdeJsonAction::SessionSerde,
            })
            .map_err(|e| session_store::Error::Encode(e.to_string()))?;
        let id = record.id.to_string();

        sqlx::query(
            r#"
INSERT INTO sessions (id, data, expiry_date)
VALUES (?, ?, ?)
ON CONFLICT (id) DO UPDATE SET
    data = excluded.data,
    expiry_date = excluded.expiry_date
        "#,
        )
        .bind(&id)
        .bind(data)
        .bind(record.expiry_date.unix_timestamp())
        .execute(&self.pool)
        .await
        .map(|_| ())
        .context(SqlxSnafu {
            action: SqlxAction::AddingSession(id),
        })
        .map_err(backend)
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        let session_id = id.to_string();
        let data = sqlx::query_scalar::<_, Vec<u8>>(
            "SELECT data FROM sessions WHERE id = ? AND expiry_date > ?",
        )
        .bind(&session_id)
        .bind(OffsetDateTime::now_utc().unix_timestamp())
        .fetch_optional(&self.pool)
        .await
        .context(SqlxSnafu {
            action: SqlxAction::FindingSession(session_id),
        })
        .map_err(backend)?;

        data.map(|data| {
            from_slice::<Record>(&data)
                .context(SerdeJsonSnafu {
                    action: SerdeJsonAction::SessionSerde,
                })
                .map_err(|e| session_store::Error::Decode(e.to_string()))
        })
        .transpose()
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        let session_id = id.to_string();
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(&session_id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .context(SqlxSnafu {
                action: SqlxAction::RemovingSession(session_id),
            })
            .map_err(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::db::tests::memory_db;
    use std::collections::HashMap;
    use time::Duration as TimeDuration;

    fn record(expires_in: TimeDuration) -> Record {
        Record {
            id: Id::default(),
            data: HashMap::from([("member".to_string(), serde_json::json!("42"))]),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn saved_sessions_load_back() {
        let store = SqliteStore::new(memory_db().await.pool().clone());
        let mut rec = record(TimeDuration::hours(1));
        store.create(&mut rec).await.expect("create");

        let loaded = store.load(&rec.id).await.expect("load").expect("present");
        assert_eq!(loaded.data, rec.data);

        store.delete(&rec.id).await.expect("delete");
        assert!(store.load(&rec.id).await.expect("load").is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_invisible_and_cleaned() {
        let db = memory_db().await;
        let store = SqliteStore::new(db.pool().clone());
        let mut old = record(TimeDuration::hours(-1));
        store.create(&mut old).await.expect("create");

        assert!(store.load(&old.id).await.expect("load").is_none());

        store.delete_expired().await.expect("cleanup");
        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(db.pool())
            .await
            .expect("count");
        assert_eq!(left, 0);
    }
}

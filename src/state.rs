pub mod cache;
pub mod db;
pub mod db_objects;

use crate::{
    cfg::Settings,
    error::ClubError,
    state::{cache::ClubCache, db::ClubDB},
};

///Handed to every route - built once in `main`.
#[derive(Clone, Debug)]
pub struct ClubState {
    pub db: ClubDB,
    pub settings: Settings,
    pub cache: ClubCache,
}

impl ClubState {
    pub async fn new(settings: Settings) -> Result<Self, ClubError> {
        let db = ClubDB::connect(&settings.database).await?;
        db.seed_demo_member(&settings.seed.name, &settings.seed.email)
            .await?;

        let cache = ClubCache::new();
        cache.pre_populate().await;

        Ok(Self {
            db,
            settings,
            cache,
        })
    }

    #[cfg(test)]
    pub fn from_parts(db: ClubDB, settings: Settings) -> Self {
        Self {
            db,
            settings,
            cache: ClubCache::new(),
        }
    }
}

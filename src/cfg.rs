use crate::error::{ClubError, JoinSnafu, ThreadReason};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use snafu::ResultExt;
use std::path::PathBuf;
use tokio::task::spawn_blocking;

#[derive(Debug, Deserialize, Clone)]
pub struct BrandSettings {
    pub instance_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NicheSettings {
    pub date_format: String,
    pub time_format: String,
    pub date_time_format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    pub expiry_days: i64,
    pub cleanup_interval_secs: u64,
}

///Who gets created on an empty database. They start as an admin so someone can manage the club.
#[derive(Debug, Deserialize, Clone)]
pub struct SeedSettings {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub brand: BrandSettings,
    pub niche: NicheSettings,
    pub database: DatabaseSettings,
    pub server: ServerSettings,
    pub session: SessionSettings,
    pub seed: SeedSettings,
}

impl Settings {
    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("brand.instance_name", "Club Hub")?
            .set_default("niche.date_format", "%a %d %b %Y")?
            .set_default("niche.time_format", "%H:%M")?
            .set_default("niche.date_time_format", "%d %b %Y, %H:%M")?
            .set_default("database.url", "sqlite://club.db")?
            .set_default("database.max_connections", 5)?
            .set_default("server.bind_address", "127.0.0.1:8080")?
            .set_default("session.expiry_days", 30)?
            .set_default("session.cleanup_interval_secs", 3600)?
            .set_default("seed.name", "Demo User")?
            .set_default("seed.email", "demo@example.com")
    }

    ///Reads `config.toml` (if there is one), then `CLUB__SECTION__KEY` environment variables on top.
    pub async fn new() -> Result<Self, ClubError> {
        let builder = Self::builder()?;

        Ok(spawn_blocking(move || {
            builder
                .add_source(File::from(PathBuf::from("config.toml")).required(false))
                .add_source(
                    Environment::with_prefix("CLUB")
                        .prefix_separator("__")
                        .separator("__"),
                )
                .build()
                .and_then(Config::try_deserialize)
        })
        .await
        .context(JoinSnafu {
            title: ThreadReason::ReadingSettings,
        })??)
    }

    #[cfg(test)]
    pub fn defaults() -> Self {
        Self::builder()
            .and_then(|b| b.build())
            .and_then(Config::try_deserialize)
            .expect("defaults must deserialise")
    }
}

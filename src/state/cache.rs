use crate::error::{ClubError, FileIdentifier, IOAction, IOSnafu};
use async_walkdir::WalkDir;
use futures::StreamExt;
use moka::future::{Cache, CacheBuilder};
use snafu::ResultExt;
use std::{
    io::{Error as IOError, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::fs::read_to_string;

pub const TEMPLATES_DIR: &str = "www/";

#[derive(Clone, Debug)]
pub struct ClubCache {
    templates_cache: Cache<PathBuf, Arc<str>>,
}

impl ClubCache {
    pub fn new() -> Self {
        let templates_cache = CacheBuilder::default().name("templates_cache").build();

        Self { templates_cache }
    }

    pub async fn get(&self, path: impl AsRef<Path>) -> Result<Arc<str>, ClubError> {
        let path = path.as_ref().to_path_buf();

        if let Some(found) = self.templates_cache.get(&path).await {
            return Ok(found);
        }

        if !path.exists() {
            return Err(ClubError::IO {
                source: IOError::from(ErrorKind::NotFound),
                action: IOAction::ReadingFile(FileIdentifier::PB(path)),
            });
        }

        let read_in = read_to_string(&path).await.with_context(|_e| IOSnafu {
            action: IOAction::ReadingFile(FileIdentifier::PB(path.clone())),
        })?;
        let read_in: Arc<str> = read_in.into();
        self.templates_cache.insert(path, read_in.clone()).await;

        Ok(read_in)
    }

    ///Every template and partial under `dir`, keyed by path.
    pub async fn walk(&self, dir: impl AsRef<Path>) -> Vec<(PathBuf, Arc<str>)> {
        let des: Vec<_> = WalkDir::new(dir.as_ref()).collect().await;
        let mut found = vec![];

        for path in des.into_iter().filter_map(Result::ok).map(|x| x.path()) {
            if !path.is_file() {
                continue;
            }

            match self.get(&path).await {
                Ok(contents) => found.push((path, contents)),
                Err(e) => {
                    warn!(?e, ?path, "Error reading file for pre-population");
                }
            }
        }

        found
    }

    pub async fn pre_populate(&self) {
        let n = self.walk(TEMPLATES_DIR).await.len();
        info!(?n, "Pre-populated template cache");
    }
}

impl Default for ClubCache {
    fn default() -> Self {
        Self::new()
    }
}

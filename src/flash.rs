//! One-shot messages shown on the next rendered page, kept in the session between the redirect and the render.

use crate::error::ClubError;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

const FLASH_KEY: &str = "flash";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    pub async fn push(self, session: &Session) -> Result<(), ClubError> {
        session.insert(FLASH_KEY, self).await?;
        Ok(())
    }

    pub async fn take(session: &Session) -> Result<Option<Self>, ClubError> {
        Ok(session.remove(FLASH_KEY).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    #[tokio::test]
    async fn flashes_are_shown_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        Flash::error("nope").push(&session).await.expect("push");
        assert_eq!(
            Flash::take(&session).await.expect("take"),
            Some(Flash::error("nope"))
        );
        assert_eq!(Flash::take(&session).await.expect("take"), None);
    }
}

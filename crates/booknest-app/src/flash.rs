use serde::{Deserialize, Serialize};
use tower_sessions::Session;

const FLASH_KEY: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Error,
    Info,
}

impl FlashCategory {
    pub fn css_class(&self) -> &'static str {
        match self {
            FlashCategory::Success => "success",
            FlashCategory::Error => "error",
            FlashCategory::Info => "info",
        }
    }
}

/// One-shot status message carried through the session across a redirect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flash {
    pub message: String,
    pub category: FlashCategory,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Flash {
            message: message.into(),
            category: FlashCategory::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Flash {
            message: message.into(),
            category: FlashCategory::Error,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Flash {
            message: message.into(),
            category: FlashCategory::Info,
        }
    }
}

pub async fn set(session: &Session, flash: Flash) -> Result<(), tower_sessions::session::Error> {
    session.insert(FLASH_KEY, flash).await
}

/// Takes the pending flash, removing it so it renders exactly once.
pub async fn take(session: &Session) -> Result<Option<Flash>, tower_sessions::session::Error> {
    session.remove::<Flash>(FLASH_KEY).await
}

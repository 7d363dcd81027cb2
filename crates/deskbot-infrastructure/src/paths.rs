//! Path resolution for deskbot files.
//!
//! ```text
//! ~/.config/deskbot/          # config dir (platform equivalent elsewhere)
//! ├── config.toml             # RootConfig
//! └── rules.toml              # optional rule table override
//!
//! ~/.local/share/deskbot/     # data dir
//! └── sessions/               # file-backed session store
//!     └── <session-id>.toml
//! ```

use deskbot_core::error::{DeskbotError, Result};
use std::path::PathBuf;

const APP_DIR: &str = "deskbot";

pub struct DeskbotPaths;

impl DeskbotPaths {
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| DeskbotError::config("cannot determine the user config directory"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| DeskbotError::config("cannot determine the user data directory"))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Default location of a rule table override.
    pub fn rules_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("rules.toml"))
    }

    pub fn sessions_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("sessions"))
    }
}

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;

use crate::error::DashError;

/// Light/dark preference, the only state persisted between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    /// Missing or unreadable preference falls back to the default.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => Theme::parse(&s).unwrap_or_default(),
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::debug!(path = %path.display(), error = %e, "theme preference unreadable");
                }
                Theme::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), DashError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(path, self.as_str())?;
        Ok(())
    }
}

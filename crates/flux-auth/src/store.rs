// ABOUTME: Credential file at <home>/.flux/credentials.json.
// ABOUTME: Missing or unreadable files load as empty credentials; logout deletes the file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AuthError;

/// On-disk credential record. Every field is optional so partial files still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, alias = "phone", skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    #[serde(default, alias = "authenticatedAt", skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
}

/// A verified login.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub token: String,
    pub phone: String,
    pub issued_at: DateTime<Utc>,
}

impl From<&Identity> for Credentials {
    fn from(identity: &Identity) -> Self {
        Self {
            token: Some(identity.token.clone()),
            phone_number: Some(identity.phone.clone()),
            issued_at: Some(identity.issued_at),
        }
    }
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.phone_number.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store rooted at `home`, i.e. `<home>/.flux/credentials.json`.
    pub fn new(home: &Path) -> Self {
        Self {
            path: home.join(".flux").join("credentials.json"),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Credentials {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "Could not read credentials");
                }
                return Credentials::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring malformed credentials");
                Credentials::default()
            }
        }
    }

    pub fn save(&self, credentials: &Credentials) -> Result<(), AuthError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| AuthError::Store(format!("create {}: {e}", dir.display())))?;
        }
        let content = serde_json::to_string_pretty(credentials)
            .map_err(|e| AuthError::Store(format!("serialize credentials: {e}")))?;
        fs::write(&self.path, content)
            .map_err(|e| AuthError::Store(format!("write {}: {e}", self.path.display())))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                AuthError::Store(format!("restrict {}: {e}", self.path.display()))
            })?;
        }

        debug!(path = %self.path.display(), "Credentials saved");
        Ok(())
    }

    /// Delete the file. Succeeds when there is nothing to delete.
    pub fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Credentials removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Store(format!(
                "remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// Authenticated identity handed to the controller at construction. The
/// role is display metadata restored from the persisted session; it is not
/// proof of privilege, the server decides what each request may do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub username: String,
    pub token: String,
    #[serde(default)]
    pub role: Role,
}

impl SessionContext {
    pub fn new(username: impl Into<String>, token: impl Into<String>, role: Role) -> Self {
        SessionContext {
            username: username.into(),
            token: token.into(),
            role,
        }
    }

    /// Restores the persisted session, or `None` to start unauthenticated.
    /// A missing file is the normal logged-out state; a corrupt one is
    /// treated the same way rather than failing startup.
    pub async fn restore(path: impl AsRef<Path>) -> Option<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::warn!(path = %path.as_ref().display(), error = %err, "discarding unreadable session file");
                None
            }
        }
    }

    pub async fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path.as_ref(), bytes).await?;
        Ok(())
    }

    /// Logout teardown: removes the persisted session.
    pub async fn clear(path: impl AsRef<Path>) -> Result<()> {
        match tokio::fs::remove_file(path.as_ref()).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

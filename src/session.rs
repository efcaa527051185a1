use tracing::{info, warn};

use crate::directory::Directory;
use crate::error::{LexflowError, Result};
use crate::models::{Identity, Role};
use crate::storage::{slots, Storage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    Authenticated(Identity),
}

impl Session {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated(identity) => Some(identity),
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.identity().map(|i| i.role)
    }
}

/// Owns the active session and mirrors it to the active-session slot so it
/// survives restarts.
pub struct SessionManager {
    storage: Storage,
    current: Session,
}

impl SessionManager {
    /// Resume whatever session the slot holds; a malformed snapshot means
    /// anonymous.
    pub fn restore(storage: Storage) -> Self {
        let current = match storage.load_value::<Identity>(slots::ACTIVE_SESSION) {
            Some(identity) => Session::Authenticated(identity),
            None => Session::Anonymous,
        };
        Self { storage, current }
    }

    pub fn current(&self) -> &Session {
        &self.current
    }

    pub fn login(&mut self, directory: &Directory, username: &str, password: &str) -> Result<Identity> {
        let identity = directory.verify_credentials(username, password)?;
        self.begin(identity.clone())?;
        info!(username, role = %identity.role, "signed in");
        Ok(identity)
    }

    /// Switch to `identity` without checking credentials (right after a
    /// successful registration).
    pub(crate) fn begin(&mut self, identity: Identity) -> Result<()> {
        self.current = Session::Authenticated(identity.clone());
        self.storage.save_value(slots::ACTIVE_SESSION, &identity)
    }

    pub fn logout(&mut self) -> Result<()> {
        if let Session::Authenticated(identity) = &self.current {
            info!(username = %identity.username, "signed out");
        }
        self.current = Session::Anonymous;
        self.storage.clear(slots::ACTIVE_SESSION).inspect_err(|e| {
            warn!(error = %e, "session slot could not be cleared");
        })
    }

    /// The signed-in identity, or `NotAuthenticated` naming `action`.
    pub fn require(&self, action: &'static str) -> Result<&Identity> {
        self.current
            .identity()
            .ok_or(LexflowError::NotAuthenticated { action })
    }
}

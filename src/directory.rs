//! Identity & role directory: the static credential set plus the users
//! registered at runtime (registered-directory slot).

use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, CredentialSet};
use crate::error::{LexflowError, Result};
use crate::models::{DirectoryEntry, Identity, Role};
use crate::storage::{slots, Storage};

#[derive(Clone)]
pub struct Directory {
    storage: Storage,
    credentials: CredentialSet,
    bcrypt_cost: u32,
}

impl Directory {
    pub fn new(storage: Storage, credentials: CredentialSet, bcrypt_cost: u32) -> Self {
        Self {
            storage,
            credentials,
            bcrypt_cost,
        }
    }

    /// Static set first, then the directory; the first match decides.
    pub fn verify_credentials(&self, username: &str, password: &str) -> Result<Identity> {
        let entries = self.entries();
        if let Some(outcome) = self.credentials.check(username, password) {
            if entries.iter().any(|e| e.username == username) {
                warn!(username, "username present in both static set and directory; static entry wins");
            }
            return outcome;
        }
        let entry = entries
            .iter()
            .find(|e| e.username == username)
            .ok_or_else(|| LexflowError::not_found("user", username))?;
        if !verify_password(password, &entry.password_hash) {
            return Err(LexflowError::WrongPassword {
                username: username.to_string(),
            });
        }
        Ok(entry.identity())
    }

    /// Self-service registration; the role is always `Client`.
    pub fn register_self(&self, username: &str, password: &str, display_name: &str) -> Result<Identity> {
        self.insert(username, password, display_name, Role::Client)
    }

    /// Admin-initiated creation. Callers enforce that the actor is an admin.
    pub fn create_user(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
        role: Role,
    ) -> Result<Identity> {
        self.insert(username, password, display_name, role)
    }

    /// Directory entries only, in insertion order.
    pub fn list_users(&self) -> Vec<Identity> {
        self.entries().iter().map(DirectoryEntry::identity).collect()
    }

    pub fn exists(&self, username: &str) -> bool {
        self.credentials.contains(username) || self.entries().iter().any(|e| e.username == username)
    }

    fn entries(&self) -> Vec<DirectoryEntry> {
        self.storage.load(slots::REGISTERED_DIRECTORY)
    }

    fn insert(&self, username: &str, password: &str, display_name: &str, role: Role) -> Result<Identity> {
        if username.is_empty() {
            return Err(LexflowError::invalid("username", "must not be empty"));
        }
        if display_name.trim().is_empty() {
            return Err(LexflowError::invalid("displayName", "must not be empty"));
        }
        let mut entries = self.entries();
        if self.credentials.contains(username) || entries.iter().any(|e| e.username == username) {
            return Err(LexflowError::AlreadyExists {
                username: username.to_string(),
            });
        }
        let entry = DirectoryEntry {
            username: username.to_string(),
            password_hash: hash_password(password, self.bcrypt_cost)?,
            role,
            display_name: display_name.trim().to_string(),
        };
        let identity = entry.identity();
        entries.push(entry);
        self.storage.save(slots::REGISTERED_DIRECTORY, &entries)?;
        info!(username, role = %role, "user added to directory");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_BCRYPT_COST;

    fn directory() -> Directory {
        Directory::new(Storage::in_memory(), CredentialSet::demo(), MIN_BCRYPT_COST)
    }

    #[test]
    fn test_static_entries_with_empty_directory() {
        let dir = directory();
        let juez = dir.verify_credentials("juez", "juez1").unwrap();
        assert_eq!(juez.role, Role::Legal);
        assert_eq!(juez.display_name, "Juez");
        assert_eq!(
            dir.verify_credentials("juez", "wrong"),
            Err(LexflowError::WrongPassword { username: "juez".to_string() })
        );
        assert_eq!(
            dir.verify_credentials("ghost", "x"),
            Err(LexflowError::not_found("user", "ghost"))
        );
    }

    #[test]
    fn test_register_then_verify_is_client() {
        let dir = directory();
        dir.register_self("12345678", "secreto", "Ana Torres").unwrap();
        let ana = dir.verify_credentials("12345678", "secreto").unwrap();
        assert_eq!(ana.role, Role::Client);
        assert_eq!(ana.display_name, "Ana Torres");
        assert!(matches!(
            dir.verify_credentials("12345678", "secret0"),
            Err(LexflowError::WrongPassword { .. })
        ));
    }

    #[test]
    fn test_duplicates_rejected_without_changing_directory() {
        let dir = directory();
        dir.create_user("lucia", "pass123", "Lucía", Role::Legal).unwrap();

        let static_clash = dir.create_user("admin", "pass123", "Otro", Role::Client);
        assert_eq!(
            static_clash,
            Err(LexflowError::AlreadyExists { username: "admin".to_string() })
        );
        let dir_clash = dir.register_self("lucia", "pass456", "Impostora");
        assert!(matches!(dir_clash, Err(LexflowError::AlreadyExists { .. })));

        let users = dir.list_users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::Legal);
        // Match is case-sensitive.
        assert!(dir.create_user("Lucia", "pass123", "Lucía B", Role::Client).is_ok());
    }

    #[test]
    fn test_list_users_in_insertion_order_without_static_set() {
        let dir = directory();
        dir.create_user("zeta", "pass123", "Zeta", Role::Client).unwrap();
        dir.create_user("alfa", "pass123", "Alfa", Role::Admin).unwrap();
        let names: Vec<_> = dir.list_users().into_iter().map(|u| u.username).collect();
        assert_eq!(names, vec!["zeta", "alfa"]);
    }

    #[test]
    fn test_static_entry_wins_over_directory_collision() {
        let storage = Storage::in_memory();
        // Written by a process whose static set lacked `juez`.
        let planted = DirectoryEntry {
            username: "juez".to_string(),
            password_hash: hash_password("other", MIN_BCRYPT_COST).unwrap(),
            role: Role::Client,
            display_name: "Impostor".to_string(),
        };
        storage.save(slots::REGISTERED_DIRECTORY, &[planted]).unwrap();
        let dir = Directory::new(storage, CredentialSet::demo(), MIN_BCRYPT_COST);

        assert_eq!(dir.verify_credentials("juez", "juez1").unwrap().role, Role::Legal);
        assert!(matches!(
            dir.verify_credentials("juez", "other"),
            Err(LexflowError::WrongPassword { .. })
        ));
    }

    #[test]
    fn test_passwords_are_not_stored_in_clear() {
        let storage = Storage::in_memory();
        let dir = Directory::new(storage.clone(), CredentialSet::new(), MIN_BCRYPT_COST);
        dir.register_self("87654321", "plaintext", "Beto").unwrap();
        let entries: Vec<DirectoryEntry> = storage.load(slots::REGISTERED_DIRECTORY);
        assert_ne!(entries[0].password_hash, "plaintext");
    }
}

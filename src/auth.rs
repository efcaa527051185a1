use bcrypt::{hash, verify};
use std::collections::HashMap;

use crate::error::{LexflowError, Result};
use crate::models::{Identity, Role};

pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    hash(password, cost).map_err(|e| LexflowError::invalid("password", e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    // A corrupt stored hash counts as a mismatch, not a crash.
    verify(password, hash).unwrap_or(false)
}

#[derive(Debug, Clone)]
struct StaticCredential {
    password: String,
    role: Role,
    display_name: String,
}

/// Read-only credential table supplied at process start.
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    entries: HashMap<String, StaticCredential>,
}

impl CredentialSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in demo accounts: `admin`, `juez` (legal) and `prueba` (client).
    pub fn demo() -> Self {
        Self::new()
            .with("admin", "admin1", Role::Admin, "Admin")
            .with("juez", "juez1", Role::Legal, "Juez")
            .with("prueba", "prueba", Role::Client, "Cliente")
    }

    pub fn with(mut self, username: &str, password: &str, role: Role, display_name: &str) -> Self {
        self.entries.insert(
            username.to_string(),
            StaticCredential {
                password: password.to_string(),
                role,
                display_name: display_name.to_string(),
            },
        );
        self
    }

    pub fn contains(&self, username: &str) -> bool {
        self.entries.contains_key(username)
    }

    /// `None` when the username is not in the table.
    pub(crate) fn check(&self, username: &str, password: &str) -> Option<Result<Identity>> {
        let entry = self.entries.get(username)?;
        if entry.password != password {
            return Some(Err(LexflowError::WrongPassword {
                username: username.to_string(),
            }));
        }
        Some(Ok(Identity {
            username: username.to_string(),
            display_name: entry.display_name.clone(),
            role: entry.role,
        }))
    }
}

/// National identity documents accepted as self-registration usernames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Personal identity number: 8 digits.
    Dni,
    /// Taxpayer number: 11 digits with a check digit.
    Ruc,
}

const RUC_PREFIXES: [&str; 4] = ["10", "15", "17", "20"];
const RUC_WEIGHTS: [u32; 10] = [5, 4, 3, 2, 7, 6, 5, 4, 3, 2];

pub fn validate_document(kind: DocumentKind, value: &str) -> Result<()> {
    match kind {
        DocumentKind::Dni => {
            if is_digits(value, 8) {
                Ok(())
            } else {
                Err(LexflowError::invalid("document", "DNI must be exactly 8 digits"))
            }
        }
        DocumentKind::Ruc => {
            if !is_digits(value, 11) {
                return Err(LexflowError::invalid("document", "RUC must be exactly 11 digits"));
            }
            if !RUC_PREFIXES.contains(&&value[..2]) {
                return Err(LexflowError::invalid(
                    "document",
                    "RUC must start with 10, 15, 17 or 20",
                ));
            }
            let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
            if ruc_check_digit(&digits[..10]) != digits[10] {
                return Err(LexflowError::invalid("document", "RUC check digit does not match"));
            }
            Ok(())
        }
    }
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

fn ruc_check_digit(first_ten: &[u32]) -> u32 {
    let sum: u32 = first_ten.iter().zip(RUC_WEIGHTS).map(|(d, w)| d * w).sum();
    match 11 - sum % 11 {
        10 => 0,
        11 => 1,
        r => r,
    }
}

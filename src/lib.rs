//! lexflow: case-intake store for a legal-services front end
//!
//! Persisted collections (Sled, JSON slots) underneath three role-scoped
//! components:
//! - Directory: static demo credentials plus registered users (bcrypt)
//! - Forms: intake form definitions authored by legal staff
//! - Mailbox: client submissions and legal responses, filtered per role
//!
//! `Workspace` is the role-gated facade a UI or the CLI drives.

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod forms;
pub mod mailbox;
pub mod models;
pub mod ports;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod workspace;

pub use error::{LexflowError, Result};
pub use workspace::{NewUser, Registration, Workspace};

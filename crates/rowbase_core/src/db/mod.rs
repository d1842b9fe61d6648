//! SQLite connection bootstrap for generic entity repositories.
//!
//! # Responsibility
//! - Open and configure SQLite connections for rowbase repositories.
//! - Keep connection-level pragmas consistent across callers.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and a busy timeout applied.
//! - This crate never creates or migrates application tables; callers own
//!   their schema and repositories validate it at construction time.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Transport-level database error.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

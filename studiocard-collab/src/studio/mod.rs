mod inquiries;
mod lessons;
mod recitals;
mod schedule;
mod students;
mod teachers;
mod tracks;

pub use inquiries::*;
pub use lessons::*;
pub use recitals::*;
pub use schedule::*;
pub use students::*;
pub use teachers::*;
pub use tracks::*;

use chrono::Utc;
use thiserror::Error;

use crate::{unique_object_name, AuthError, DatabaseError, GateError, StorageError};

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("This page is private")]
    Locked,
    #[error("{0}")]
    Invalid(&'static str),
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

impl From<AuthError> for StudioError {
    fn from(value: AuthError) -> Self {
        Self::Gate(value.into())
    }
}

/// Used to name stored objects
fn object_name() -> String {
    unique_object_name(Utc::now().timestamp_millis())
}

//! Level and attempt references.
//!
//! Both entities live elsewhere; accounts only know their identity.

use serde::{Deserialize, Serialize};

use crate::account::AccountId;

/// Identifier of a progression level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LevelId(pub i64);

/// Identifier of a problem attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AttemptId(pub i64);

/// Progression level reached by an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub id: LevelId,
}

impl From<LevelId> for Level {
    fn from(id: LevelId) -> Self {
        Self { id }
    }
}

/// Attempt at a problem, pointing back to the account that made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: AttemptId,
    pub account: AccountId,
}

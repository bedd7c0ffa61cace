//! Persistence seams used by the matching pipeline
//!
//! The pipeline only talks to these traits. `PostgresClient` implements them
//! for production and `InMemoryStore` for tests.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{AnswerRecord, Match, MatchId, MatchStatus, UserId};

/// Errors that can occur when reading or writing persistent state
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Match already exists between users {0} and {1}")]
    DuplicatePair(UserId, UserId),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to users' questionnaire answers
#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// All answers of `user_id`, ordered by question id
    async fn list_answers(&self, user_id: UserId) -> Result<Vec<AnswerRecord>, StoreError>;
}

/// Persistence of matches and their lifecycle
#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// Whether any match row covers the pair, in either order
    async fn exists_pair(&self, a: UserId, b: UserId) -> Result<bool, StoreError>;

    /// Every user paired with `user_id` on either side
    async fn paired_user_ids(&self, user_id: UserId) -> Result<Vec<UserId>, StoreError>;

    /// Insert a pending match; fails with `DuplicatePair` if the pair exists
    async fn create(&self, user1: UserId, user2: UserId, score: f64) -> Result<Match, StoreError>;

    /// Pending match `match_id` whose user2 is `as_user2`
    async fn get_pending_for_update(
        &self,
        match_id: MatchId,
        as_user2: UserId,
    ) -> Result<Match, StoreError>;

    /// Move a pending match to `status`; `NotFound` if it is no longer pending
    async fn set_status(&self, m: &Match, status: MatchStatus) -> Result<Match, StoreError>;

    /// Matches involving `user_id`, newest first
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Match>, StoreError>;
}

/// Lookup of users eligible for matching
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Verified users other than `requester_id` and `excluded`, ordered by id
    async fn list_verified_excluding(
        &self,
        excluded: &[UserId],
        requester_id: UserId,
    ) -> Result<Vec<UserId>, StoreError>;
}

pub type SharedAnswerStore = Arc<dyn AnswerStore>;
pub type SharedMatchRepository = Arc<dyn MatchRepository>;
pub type SharedUserDirectory = Arc<dyn UserDirectory>;

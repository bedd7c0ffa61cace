//! In-memory store
//!
//! Implements the matching seams over plain collections. Used by tests and
//! by anything that wants to run the pipeline without PostgreSQL.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::models::{AnswerRecord, Match, MatchId, MatchStatus, UserId};
use crate::services::store::{AnswerStore, MatchRepository, StoreError, UserDirectory};

#[derive(Debug, Default)]
struct State {
    verified: BTreeMap<UserId, bool>,
    answers: BTreeMap<UserId, Vec<AnswerRecord>>,
    matches: Vec<Match>,
    next_match_id: MatchId,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    /// Register a user with the given verification state
    pub fn add_user(&self, user_id: UserId, email_verified: bool) -> Result<(), StoreError> {
        self.lock()?.verified.insert(user_id, email_verified);
        Ok(())
    }

    /// Replace a user's answers; they are kept sorted by question id
    pub fn set_answers(
        &self,
        user_id: UserId,
        mut answers: Vec<AnswerRecord>,
    ) -> Result<(), StoreError> {
        answers.sort_by_key(|a| a.question_id);
        self.lock()?.answers.insert(user_id, answers);
        Ok(())
    }

    /// Snapshot of every stored match
    pub fn matches(&self) -> Result<Vec<Match>, StoreError> {
        Ok(self.lock()?.matches.clone())
    }
}

#[async_trait]
impl AnswerStore for InMemoryStore {
    async fn list_answers(&self, user_id: UserId) -> Result<Vec<AnswerRecord>, StoreError> {
        Ok(self.lock()?.answers.get(&user_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl MatchRepository for InMemoryStore {
    async fn exists_pair(&self, a: UserId, b: UserId) -> Result<bool, StoreError> {
        let state = self.lock()?;
        Ok(state.matches.iter().any(|m| m.involves(a) && m.involves(b)))
    }

    async fn paired_user_ids(&self, user_id: UserId) -> Result<Vec<UserId>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .matches
            .iter()
            .filter(|m| m.involves(user_id))
            .map(|m| m.counterpart(user_id))
            .collect())
    }

    async fn create(&self, user1: UserId, user2: UserId, score: f64) -> Result<Match, StoreError> {
        if user1 == user2 {
            return Err(StoreError::InvalidInput("cannot match a user with itself".into()));
        }

        // Check and insert under one lock so the pair stays unique
        let mut state = self.lock()?;
        if state.matches.iter().any(|m| m.involves(user1) && m.involves(user2)) {
            return Err(StoreError::DuplicatePair(user1, user2));
        }

        state.next_match_id += 1;
        let now = Utc::now();
        let m = Match {
            id: state.next_match_id,
            user1_id: user1,
            user2_id: user2,
            compatibility_score: score,
            status: MatchStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        state.matches.push(m.clone());
        Ok(m)
    }

    async fn get_pending_for_update(
        &self,
        match_id: MatchId,
        as_user2: UserId,
    ) -> Result<Match, StoreError> {
        let state = self.lock()?;
        state
            .matches
            .iter()
            .find(|m| m.id == match_id && m.user2_id == as_user2 && m.status == MatchStatus::Pending)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("pending match {}", match_id)))
    }

    async fn set_status(&self, m: &Match, status: MatchStatus) -> Result<Match, StoreError> {
        let mut state = self.lock()?;
        let stored = state
            .matches
            .iter_mut()
            .find(|stored| stored.id == m.id && stored.status == MatchStatus::Pending)
            .ok_or_else(|| StoreError::NotFound(format!("pending match {}", m.id)))?;

        stored.status = status;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Match>, StoreError> {
        let state = self.lock()?;
        let mut matches: Vec<Match> = state
            .matches
            .iter()
            .filter(|m| m.involves(user_id))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matches)
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn list_verified_excluding(
        &self,
        excluded: &[UserId],
        requester_id: UserId,
    ) -> Result<Vec<UserId>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .verified
            .iter()
            .filter(|(id, verified)| **verified && **id != requester_id && !excluded.contains(id))
            .map(|(id, _)| *id)
            .collect())
    }
}

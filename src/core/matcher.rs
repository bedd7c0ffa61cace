use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::{
    similarity::{cosine_similarity, is_match_worthy},
    vectorizer::build_feature_vector,
};
use crate::models::{FeatureVector, Match, MatchId, MatchStatus, UserId};
use crate::services::store::{
    SharedAnswerStore, SharedMatchRepository, SharedUserDirectory, StoreError,
};

/// Errors surfaced by the matching pipeline
#[derive(Debug, Error)]
pub enum MatchingError {
    /// Wrong actor, a match that is no longer pending, or a target status
    /// other than accepted/rejected. Callers see a single not-found error.
    #[error("match not found")]
    TransitionNotAllowed,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of one matching run
#[derive(Debug, Default)]
pub struct MatchResult {
    /// Newly created matches in creation order
    pub matches: Vec<Match>,
    pub total_candidates: usize,
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Vectorize the requester (no vector → nothing to do)
/// 2. Exclude everyone already paired with the requester
/// 3. Walk verified candidates in id order, vectorize and score each
/// 4. Persist a pending match for every score above the threshold
#[derive(Clone)]
pub struct Matcher {
    answers: SharedAnswerStore,
    matches: SharedMatchRepository,
    users: SharedUserDirectory,
}

impl Matcher {
    pub fn new(
        answers: SharedAnswerStore,
        matches: SharedMatchRepository,
        users: SharedUserDirectory,
    ) -> Self {
        Self {
            answers,
            matches,
            users,
        }
    }

    /// Feature vector of a user, `None` if the user cannot be matched
    pub async fn feature_vector(&self, user_id: UserId) -> Result<Option<FeatureVector>, StoreError> {
        let answers = self.answers.list_answers(user_id).await?;
        Ok(build_feature_vector(&answers))
    }

    /// Score every eligible candidate against `requester` and create matches
    ///
    /// Not idempotent: each run creates matches for candidates that were not
    /// yet paired with the requester. Failures for a single candidate are
    /// logged and skipped; matches created earlier in the run are kept.
    pub async fn compute_matches(&self, requester: UserId) -> Result<MatchResult, MatchingError> {
        let Some(requester_vector) = self.feature_vector(requester).await? else {
            debug!("User {} has no feature vector, skipping matching", requester);
            return Ok(MatchResult::default());
        };

        let mut excluded = self.matches.paired_user_ids(requester).await?;
        excluded.push(requester);
        excluded.sort_unstable();
        excluded.dedup();

        let candidates = self
            .users
            .list_verified_excluding(&excluded, requester)
            .await?;
        let total_candidates = candidates.len();

        debug!(
            "Scoring {} candidates for user {} ({} excluded)",
            total_candidates,
            requester,
            excluded.len()
        );

        let mut created = Vec::new();
        for candidate in candidates {
            let Some(candidate_vector) = self.feature_vector(candidate).await? else {
                debug!("Candidate {} has no feature vector", candidate);
                continue;
            };

            let score = match cosine_similarity(&requester_vector, &candidate_vector) {
                Ok(score) => score,
                Err(e) => {
                    debug!("Cannot compare users {} and {}: {}", requester, candidate, e);
                    continue;
                }
            };

            if !is_match_worthy(score) {
                continue;
            }

            if self.matches.exists_pair(requester, candidate).await? {
                debug!("Users {} and {} already paired", requester, candidate);
                continue;
            }

            match self.matches.create(requester, candidate, score).await {
                Ok(m) => {
                    debug!("Matched {} -> {} (score {:.3})", requester, candidate, score);
                    created.push(m);
                }
                Err(StoreError::DuplicatePair(a, b)) => {
                    debug!("Match between {} and {} created concurrently", a, b);
                }
                Err(e) => {
                    warn!(
                        "Failed to create match {} -> {}, skipping candidate: {}",
                        requester, candidate, e
                    );
                }
            }
        }

        Ok(MatchResult {
            matches: created,
            total_candidates,
        })
    }

    /// Accept or reject a pending match on behalf of its receiving user
    pub async fn respond_to_match(
        &self,
        match_id: MatchId,
        actor: UserId,
        status: MatchStatus,
    ) -> Result<Match, MatchingError> {
        if !status.is_response() {
            return Err(MatchingError::TransitionNotAllowed);
        }

        let pending = self
            .matches
            .get_pending_for_update(match_id, actor)
            .await
            .map_err(not_found_as_forbidden)?;

        let updated = self
            .matches
            .set_status(&pending, status)
            .await
            .map_err(not_found_as_forbidden)?;

        info!("User {} set match {} to {:?}", actor, match_id, status);
        Ok(updated)
    }

    /// Every match involving `user_id`
    pub async fn matches_for(&self, user_id: UserId) -> Result<Vec<Match>, MatchingError> {
        Ok(self.matches.list_for_user(user_id).await?)
    }
}

fn not_found_as_forbidden(err: StoreError) -> MatchingError {
    match err {
        StoreError::NotFound(_) => MatchingError::TransitionNotAllowed,
        other => MatchingError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerPayload, AnswerRecord};
    use crate::services::memory::InMemoryStore;
    use crate::services::store::MatchRepository;
    use async_trait::async_trait;
    use std::sync::Arc;

    fn matcher_over(store: Arc<InMemoryStore>) -> Matcher {
        Matcher::new(store.clone(), store.clone(), store)
    }

    fn single(question_id: i64, value: i32) -> AnswerRecord {
        AnswerRecord::new(question_id, AnswerPayload::SingleChoice(Some(value)))
    }

    fn multi(question_id: i64, values: &[i32]) -> AnswerRecord {
        AnswerRecord::new(question_id, AnswerPayload::MultipleChoice(values.to_vec()))
    }

    #[tokio::test]
    async fn test_identical_answers_create_pending_match() {
        let store = Arc::new(InMemoryStore::new());
        store.add_user(1, true).unwrap();
        store.add_user(2, true).unwrap();
        store.set_answers(1, vec![single(1, 3), multi(2, &[1, 2])]).unwrap();
        store.set_answers(2, vec![single(1, 3), multi(2, &[1, 2])]).unwrap();

        let result = matcher_over(store).compute_matches(1).await.unwrap();

        assert_eq!(result.matches.len(), 1);
        let m = &result.matches[0];
        assert_eq!((m.user1_id, m.user2_id), (1, 2));
        assert!((m.compatibility_score - 1.0).abs() < 1e-12);
        assert_eq!(m.status, MatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_orthogonal_answers_do_not_match() {
        let store = Arc::new(InMemoryStore::new());
        store.add_user(1, true).unwrap();
        store.add_user(2, true).unwrap();
        store.set_answers(1, vec![single(1, 1), single(2, 0), single(3, 0)]).unwrap();
        store.set_answers(2, vec![single(1, 0), single(2, 1), single(3, 0)]).unwrap();

        let result = matcher_over(store.clone()).compute_matches(1).await.unwrap();

        assert!(result.matches.is_empty());
        assert_eq!(result.total_candidates, 1);
        assert!(store.matches().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_requester_without_answers_attempts_nothing() {
        let store = Arc::new(InMemoryStore::new());
        store.add_user(1, true).unwrap();
        store.add_user(2, true).unwrap();
        store.set_answers(2, vec![single(1, 3)]).unwrap();

        let result = matcher_over(store).compute_matches(1).await.unwrap();

        assert!(result.matches.is_empty());
        assert_eq!(result.total_candidates, 0);
    }

    #[tokio::test]
    async fn test_length_mismatch_skips_candidate_only() {
        let store = Arc::new(InMemoryStore::new());
        for id in 1..=3 {
            store.add_user(id, true).unwrap();
        }
        store.set_answers(1, vec![single(1, 3), multi(2, &[1, 2])]).unwrap();
        store.set_answers(2, vec![single(1, 3), multi(2, &[1])]).unwrap();
        store.set_answers(3, vec![single(1, 3), multi(2, &[2, 1])]).unwrap();

        let result = matcher_over(store).compute_matches(1).await.unwrap();

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].user2_id, 3);
    }

    #[tokio::test]
    async fn test_matches_are_created_in_candidate_id_order() {
        let store = Arc::new(InMemoryStore::new());
        for id in [5, 1, 9, 3] {
            store.add_user(id, true).unwrap();
            store.set_answers(id, vec![single(1, 2), single(2, 4)]).unwrap();
        }

        let result = matcher_over(store).compute_matches(1).await.unwrap();

        let order: Vec<UserId> = result.matches.iter().map(|m| m.user2_id).collect();
        assert_eq!(order, vec![3, 5, 9]);
    }

    #[tokio::test]
    async fn test_unverified_users_are_not_candidates() {
        let store = Arc::new(InMemoryStore::new());
        store.add_user(1, true).unwrap();
        store.add_user(2, false).unwrap();
        store.set_answers(1, vec![single(1, 3)]).unwrap();
        store.set_answers(2, vec![single(1, 3)]).unwrap();

        let result = matcher_over(store).compute_matches(1).await.unwrap();
        assert!(result.matches.is_empty());
    }

    /// Repository that refuses to insert matches for one candidate
    struct FlakyInserts {
        inner: Arc<InMemoryStore>,
        failing: UserId,
    }

    #[async_trait]
    impl MatchRepository for FlakyInserts {
        async fn exists_pair(&self, a: UserId, b: UserId) -> Result<bool, StoreError> {
            self.inner.exists_pair(a, b).await
        }

        async fn paired_user_ids(&self, user_id: UserId) -> Result<Vec<UserId>, StoreError> {
            self.inner.paired_user_ids(user_id).await
        }

        async fn create(&self, user1: UserId, user2: UserId, score: f64) -> Result<Match, StoreError> {
            if user2 == self.failing {
                return Err(StoreError::Unavailable("insert timed out".into()));
            }
            self.inner.create(user1, user2, score).await
        }

        async fn get_pending_for_update(
            &self,
            match_id: MatchId,
            as_user2: UserId,
        ) -> Result<Match, StoreError> {
            self.inner.get_pending_for_update(match_id, as_user2).await
        }

        async fn set_status(&self, m: &Match, status: MatchStatus) -> Result<Match, StoreError> {
            self.inner.set_status(m, status).await
        }

        async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Match>, StoreError> {
            self.inner.list_for_user(user_id).await
        }
    }

    #[tokio::test]
    async fn test_failed_insert_skips_only_that_candidate() {
        let store = Arc::new(InMemoryStore::new());
        for id in 1..=4 {
            store.add_user(id, true).unwrap();
            store.set_answers(id, vec![single(1, 1), single(2, 1)]).unwrap();
        }
        let repo = Arc::new(FlakyInserts {
            inner: store.clone(),
            failing: 3,
        });
        let matcher = Matcher::new(store.clone(), repo, store.clone());

        let result = matcher.compute_matches(1).await.unwrap();

        let partners: Vec<UserId> = result.matches.iter().map(|m| m.user2_id).collect();
        assert_eq!(partners, vec![2, 4]);
        assert_eq!(store.matches().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_respond_rejects_pending_target() {
        let store = Arc::new(InMemoryStore::new());
        let m = store.create(1, 2, 0.9).await.unwrap();

        let err = matcher_over(store)
            .respond_to_match(m.id, 2, MatchStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, MatchingError::TransitionNotAllowed));
    }
}

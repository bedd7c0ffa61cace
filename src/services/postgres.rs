use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::time::Duration;
use uuid::Uuid;

use crate::core::{matching_score, ValidatedAnswer};
use crate::models::{
    Answer, AnswerPayload, AnswerRecord, Match, MatchId, MatchStatus, Profile, ProfileUpdate,
    Question, QuestionCategory, QuestionChoice, QuestionId, QuestionType, UpdateProfileRequest,
    User, UserId,
};
use crate::services::store::{AnswerStore, MatchRepository, StoreError, UserDirectory};

const USER_SELECT: &str = r#"
    SELECT u.id, u.email, u.password_hash, u.first_name, u.last_name, u.email_verified,
           u.is_active, u.email_verification_token, u.matching_score, u.last_score_update,
           u.created_at,
           p.phone_number, p.bio, p.location, p.avatar, p.birth_date, p.gender,
           p.looking_for, p.min_age_preference, p.max_age_preference
    FROM users u
    LEFT JOIN profiles p ON p.user_id = u.id
"#;

const MATCH_COLUMNS: &str =
    "id, user1_id, user2_id, compatibility_score, status, created_at, updated_at";

/// Fields of a user about to be inserted
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_verified: bool,
    pub verification_token: String,
}

/// PostgreSQL client for accounts, questionnaire answers and matches
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }

    // ---- users & profiles ----

    /// Insert a user together with its profile
    ///
    /// Fails with `Conflict` when the email is already registered.
    pub async fn create_user(
        &self,
        new_user: &NewUser,
        profile: Option<&ProfileUpdate>,
    ) -> Result<(User, Profile), StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name,
                               email_verified, email_verification_token)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.email_verified)
        .bind(&new_user.verification_token)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            StoreError::Conflict(format!("A user with email {} already exists", new_user.email))
        })?;
        let user_id: UserId = row.get("id");

        sqlx::query("INSERT INTO profiles (user_id) VALUES ($1)")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if let Some(update) = profile {
            apply_profile_update(&mut tx, user_id, update).await?;
        }

        tx.commit().await?;

        tracing::info!("Created user {} ({})", user_id, new_user.email);
        self.get_user(user_id).await
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<(User, Profile), StoreError> {
        let query = format!("{} WHERE u.id = $1", USER_SELECT);
        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;

        Ok(user_from_row(&row))
    }

    pub async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(User, Profile)>, StoreError> {
        let query = format!("{} WHERE u.email = $1", USER_SELECT);
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn list_users(&self) -> Result<Vec<(User, Profile)>, StoreError> {
        let query = format!("{} ORDER BY u.id", USER_SELECT);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Store a fresh email verification code
    pub async fn set_verification_token(
        &self,
        user_id: UserId,
        token: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET email_verification_token = $2 WHERE id = $1")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Mark the email verified and clear the verification code
    pub async fn mark_email_verified(&self, user_id: UserId) -> Result<(User, Profile), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verified = TRUE, email_verification_token = ''
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }

        self.get_user(user_id).await
    }

    /// Apply a partial update to a user and its profile
    pub async fn update_user(
        &self,
        user_id: UserId,
        update: &UpdateProfileRequest,
    ) -> Result<(User, Profile), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name)
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .execute(&mut *tx)
        .await?;

        if let Some(profile) = &update.profile {
            apply_profile_update(&mut tx, user_id, profile).await?;
        }

        tx.commit().await?;
        self.get_user(user_id).await
    }

    /// Recompute a user's matching score from their scale answers
    pub async fn refresh_matching_score(&self, user_id: UserId) -> Result<f64, StoreError> {
        let rows = sqlx::query("SELECT scale_value FROM user_answers WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let values: Vec<Option<i32>> = rows.iter().map(|row| row.get("scale_value")).collect();
        let score = matching_score(&values);

        sqlx::query(
            "UPDATE users SET matching_score = $2, last_score_update = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(score)
        .execute(&self.pool)
        .await?;

        tracing::debug!("User {} matching score is now {:.2}", user_id, score);
        Ok(score)
    }

    // ---- refresh token revocation ----

    pub async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn is_token_revoked(&self, jti: Uuid) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM revoked_tokens WHERE jti = $1")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    // ---- questionnaire ----

    /// All categories with their questions and choices
    pub async fn list_categories(&self) -> Result<Vec<QuestionCategory>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, weight, sort_order
            FROM question_categories
            ORDER BY sort_order, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut categories: Vec<QuestionCategory> = rows.iter().map(category_from_row).collect();
        let ids: Vec<i64> = categories.iter().map(|c| c.id).collect();
        let mut questions = self.questions_for_categories(&ids).await?;

        for category in &mut categories {
            let (own, rest): (Vec<Question>, Vec<Question>) =
                questions.into_iter().partition(|q| q.category_id == category.id);
            category.questions = own;
            questions = rest;
        }

        Ok(categories)
    }

    pub async fn get_category(&self, category_id: i64) -> Result<QuestionCategory, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, weight, sort_order
            FROM question_categories
            WHERE id = $1
            "#,
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("category {}", category_id)))?;

        let mut category = category_from_row(&row);
        category.questions = self.questions_for_categories(&[category_id]).await?;
        Ok(category)
    }

    pub async fn get_question(&self, question_id: QuestionId) -> Result<Question, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, category_id, text, question_type, required, sort_order,
                   min_value, max_value, created_at, updated_at
            FROM questions
            WHERE id = $1
            "#,
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("question {}", question_id)))?;

        let mut question = question_from_row(&row);
        question.choices = self
            .choices_for_questions(&[question_id])
            .await?
            .into_iter()
            .map(|(_, choice)| choice)
            .collect();
        Ok(question)
    }

    async fn questions_for_categories(&self, category_ids: &[i64]) -> Result<Vec<Question>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, category_id, text, question_type, required, sort_order,
                   min_value, max_value, created_at, updated_at
            FROM questions
            WHERE category_id = ANY($1)
            ORDER BY category_id, sort_order, created_at
            "#,
        )
        .bind(category_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut questions: Vec<Question> = rows.iter().map(question_from_row).collect();
        let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();

        for (question_id, choice) in self.choices_for_questions(&ids).await? {
            if let Some(q) = questions.iter_mut().find(|q| q.id == question_id) {
                q.choices.push(choice);
            }
        }

        Ok(questions)
    }

    async fn choices_for_questions(
        &self,
        question_ids: &[i64],
    ) -> Result<Vec<(QuestionId, QuestionChoice)>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, question_id, text, value, sort_order
            FROM question_choices
            WHERE question_id = ANY($1)
            ORDER BY question_id, sort_order, id
            "#,
        )
        .bind(question_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                (
                    row.get("question_id"),
                    QuestionChoice {
                        id: row.get("id"),
                        text: row.get("text"),
                        value: row.get("value"),
                        order: row.get("sort_order"),
                    },
                )
            })
            .collect())
    }

    /// Create or replace the user's answers, all in one transaction
    pub async fn upsert_answers(
        &self,
        user_id: UserId,
        answers: &[ValidatedAnswer],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for answer in answers {
            let row = sqlx::query(
                r#"
                INSERT INTO user_answers (user_id, question_id, text_answer, scale_value, boolean_value)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (user_id, question_id)
                DO UPDATE SET
                    text_answer = EXCLUDED.text_answer,
                    scale_value = EXCLUDED.scale_value,
                    boolean_value = EXCLUDED.boolean_value,
                    updated_at = NOW()
                RETURNING id
                "#,
            )
            .bind(user_id)
            .bind(answer.question_id)
            .bind(&answer.text_answer)
            .bind(answer.scale_value)
            .bind(answer.boolean_value)
            .fetch_one(&mut *tx)
            .await?;
            let answer_id: i64 = row.get("id");

            sqlx::query("DELETE FROM user_answer_choices WHERE answer_id = $1")
                .bind(answer_id)
                .execute(&mut *tx)
                .await?;

            if !answer.choice_ids.is_empty() {
                sqlx::query(
                    r#"
                    INSERT INTO user_answer_choices (answer_id, choice_id)
                    SELECT $1, UNNEST($2::BIGINT[])
                    "#,
                )
                .bind(answer_id)
                .bind(&answer.choice_ids)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        tracing::debug!("Stored {} answers for user {}", answers.len(), user_id);
        Ok(())
    }

    /// Answers of a user, optionally restricted to a category or a question
    pub async fn list_user_answers(
        &self,
        user_id: UserId,
        category_id: Option<i64>,
        question_id: Option<QuestionId>,
    ) -> Result<Vec<Answer>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.question_id, a.text_answer, a.scale_value, a.boolean_value,
                   a.created_at, a.updated_at,
                   c.id AS choice_id, c.text AS choice_text, c.value AS choice_value,
                   c.sort_order AS choice_order
            FROM user_answers a
            JOIN questions q ON q.id = a.question_id
            LEFT JOIN user_answer_choices ac ON ac.answer_id = a.id
            LEFT JOIN question_choices c ON c.id = ac.choice_id
            WHERE a.user_id = $1
              AND ($2::BIGINT IS NULL OR q.category_id = $2)
              AND ($3::BIGINT IS NULL OR a.question_id = $3)
            ORDER BY a.question_id, c.sort_order, c.id
            "#,
        )
        .bind(user_id)
        .bind(category_id)
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;

        let mut answers: Vec<Answer> = Vec::new();
        for row in &rows {
            let id: i64 = row.get("id");
            if answers.last().map(|a| a.id) != Some(id) {
                answers.push(Answer {
                    id,
                    question_id: row.get("question_id"),
                    selected_choices: Vec::new(),
                    text_answer: row.get("text_answer"),
                    scale_value: row.get("scale_value"),
                    boolean_value: row.get("boolean_value"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                });
            }

            let choice_id: Option<i64> = row.get("choice_id");
            if let (Some(choice_id), Some(answer)) = (choice_id, answers.last_mut()) {
                answer.selected_choices.push(QuestionChoice {
                    id: choice_id,
                    text: row.get("choice_text"),
                    value: row.get("choice_value"),
                    order: row.get("choice_order"),
                });
            }
        }

        Ok(answers)
    }
}

async fn apply_profile_update(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
    update: &ProfileUpdate,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        UPDATE profiles
        SET phone_number = COALESCE($2, phone_number),
            bio = COALESCE($3, bio),
            location = COALESCE($4, location),
            avatar = COALESCE($5, avatar),
            birth_date = COALESCE($6, birth_date),
            gender = COALESCE($7, gender),
            looking_for = COALESCE($8, looking_for),
            min_age_preference = COALESCE($9, min_age_preference),
            max_age_preference = COALESCE($10, max_age_preference)
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(&update.phone_number)
    .bind(&update.bio)
    .bind(&update.location)
    .bind(&update.avatar)
    .bind(update.birth_date)
    .bind(update.gender.map(|g| g.as_str()))
    .bind(update.looking_for.map(|l| l.as_str()))
    .bind(update.min_age_preference)
    .bind(update.max_age_preference)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn user_from_row(row: &PgRow) -> (User, Profile) {
    let user = User {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email_verified: row.get("email_verified"),
        is_active: row.get("is_active"),
        password_hash: row.get("password_hash"),
        email_verification_token: row.get("email_verification_token"),
        matching_score: row.get("matching_score"),
        last_score_update: row.get("last_score_update"),
        created_at: row.get("created_at"),
    };

    let gender: Option<String> = row.get("gender");
    let looking_for: Option<String> = row.get("looking_for");
    let profile = Profile {
        phone_number: row.get::<Option<String>, _>("phone_number").unwrap_or_default(),
        bio: row.get::<Option<String>, _>("bio").unwrap_or_default(),
        location: row.get::<Option<String>, _>("location").unwrap_or_default(),
        avatar: row.get("avatar"),
        birth_date: row.get("birth_date"),
        gender: gender.and_then(|g| g.parse().ok()),
        looking_for: looking_for.and_then(|l| l.parse().ok()),
        min_age_preference: row.get("min_age_preference"),
        max_age_preference: row.get("max_age_preference"),
    };

    (user, profile)
}

fn category_from_row(row: &PgRow) -> QuestionCategory {
    QuestionCategory {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        weight: row.get("weight"),
        order: row.get("sort_order"),
        questions: Vec::new(),
    }
}

fn question_from_row(row: &PgRow) -> Question {
    Question {
        id: row.get("id"),
        category_id: row.get("category_id"),
        text: row.get("text"),
        question_type: row.get("question_type"),
        required: row.get("required"),
        order: row.get("sort_order"),
        min_value: row.get("min_value"),
        max_value: row.get("max_value"),
        choices: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn match_from_row(row: &PgRow) -> Match {
    Match {
        id: row.get("id"),
        user1_id: row.get("user1_id"),
        user2_id: row.get("user2_id"),
        compatibility_score: row.get("compatibility_score"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// One row of the answer/choice join used for vectorizing
#[derive(Debug, Clone)]
pub(crate) struct AnswerRow {
    pub question_id: QuestionId,
    pub question_type: QuestionType,
    pub text_answer: String,
    pub scale_value: Option<i32>,
    pub boolean_value: Option<bool>,
    pub choice_value: Option<i32>,
}

/// Collapse joined rows (one per selected choice) into one record per answer
///
/// Rows must be grouped by question id. A single-choice answer keeps the
/// first selected value; a multiple-choice answer keeps all of them.
pub(crate) fn fold_answer_rows(rows: Vec<AnswerRow>) -> Vec<AnswerRecord> {
    let mut records: Vec<AnswerRecord> = Vec::new();

    for row in rows {
        if let Some(last) = records.last_mut() {
            if last.question_id == row.question_id {
                if let (AnswerPayload::MultipleChoice(values), Some(value)) =
                    (&mut last.payload, row.choice_value)
                {
                    values.push(value);
                }
                continue;
            }
        }

        let payload = match row.question_type {
            QuestionType::SingleChoice => AnswerPayload::SingleChoice(row.choice_value),
            QuestionType::MultipleChoice => {
                AnswerPayload::MultipleChoice(row.choice_value.into_iter().collect())
            }
            QuestionType::ShortAnswer => AnswerPayload::ShortAnswer(row.text_answer),
            QuestionType::Scale => AnswerPayload::Scale(row.scale_value),
            QuestionType::Boolean => AnswerPayload::Boolean(row.boolean_value),
        };
        records.push(AnswerRecord::new(row.question_id, payload));
    }

    records
}

#[async_trait]
impl AnswerStore for PostgresClient {
    async fn list_answers(&self, user_id: UserId) -> Result<Vec<AnswerRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT a.question_id, q.question_type, a.text_answer, a.scale_value,
                   a.boolean_value, c.value AS choice_value
            FROM user_answers a
            JOIN questions q ON q.id = a.question_id
            LEFT JOIN user_answer_choices ac ON ac.answer_id = a.id
            LEFT JOIN question_choices c ON c.id = ac.choice_id
            WHERE a.user_id = $1
            ORDER BY a.question_id, c.sort_order, c.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let rows = rows
            .iter()
            .map(|row| AnswerRow {
                question_id: row.get("question_id"),
                question_type: row.get("question_type"),
                text_answer: row.get("text_answer"),
                scale_value: row.get("scale_value"),
                boolean_value: row.get("boolean_value"),
                choice_value: row.get("choice_value"),
            })
            .collect();

        Ok(fold_answer_rows(rows))
    }
}

#[async_trait]
impl MatchRepository for PostgresClient {
    async fn exists_pair(&self, a: UserId, b: UserId) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT 1 FROM user_matches
            WHERE LEAST(user1_id, user2_id) = LEAST($1::BIGINT, $2::BIGINT)
              AND GREATEST(user1_id, user2_id) = GREATEST($1::BIGINT, $2::BIGINT)
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn paired_user_ids(&self, user_id: UserId) -> Result<Vec<UserId>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT CASE WHEN user1_id = $1 THEN user2_id ELSE user1_id END AS other_id
            FROM user_matches
            WHERE user1_id = $1 OR user2_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("other_id")).collect())
    }

    async fn create(&self, user1: UserId, user2: UserId, score: f64) -> Result<Match, StoreError> {
        // The unique pair index turns a concurrent duplicate into "no row"
        let query = format!(
            r#"
            INSERT INTO user_matches (user1_id, user2_id, compatibility_score)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            RETURNING {}
            "#,
            MATCH_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(user1)
            .bind(user2)
            .bind(score)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::DuplicatePair(user1, user2))?;

        Ok(match_from_row(&row))
    }

    async fn get_pending_for_update(
        &self,
        match_id: MatchId,
        as_user2: UserId,
    ) -> Result<Match, StoreError> {
        let query = format!(
            "SELECT {} FROM user_matches WHERE id = $1 AND user2_id = $2 AND status = $3",
            MATCH_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(match_id)
            .bind(as_user2)
            .bind(MatchStatus::Pending)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("pending match {}", match_id)))?;

        Ok(match_from_row(&row))
    }

    async fn set_status(&self, m: &Match, status: MatchStatus) -> Result<Match, StoreError> {
        // Conditional on pending so only one response can ever win
        let query = format!(
            r#"
            UPDATE user_matches
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING {}
            "#,
            MATCH_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(m.id)
            .bind(status)
            .bind(MatchStatus::Pending)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("pending match {}", m.id)))?;

        Ok(match_from_row(&row))
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Match>, StoreError> {
        let query = format!(
            r#"
            SELECT {} FROM user_matches
            WHERE user1_id = $1 OR user2_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
            MATCH_COLUMNS
        );

        let rows = sqlx::query(&query).bind(user_id).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(match_from_row).collect())
    }
}

#[async_trait]
impl UserDirectory for PostgresClient {
    async fn list_verified_excluding(
        &self,
        excluded: &[UserId],
        requester_id: UserId,
    ) -> Result<Vec<UserId>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM users
            WHERE email_verified
              AND id <> $1
              AND NOT (id = ANY($2))
            ORDER BY id
            "#,
        )
        .bind(requester_id)
        .bind(excluded)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }
}

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::core::{completion_percentage, validate_answer, ValidatedAnswer};
use crate::models::{
    BulkAnswerRequest, CategoryDetailResponse, QuestionCategory, QuestionId, SubmitAnswerRequest,
    UserId,
};
use crate::routes::{authenticate, ApiError, AppState};
use crate::services::StoreError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/question-categories", web::get().to(list_categories))
        .route("/question-categories/{id}", web::get().to(get_category))
        .route("/answers", web::get().to(list_answers))
        .route("/answers", web::post().to(submit_answer))
        .route("/answers/bulk", web::post().to(submit_bulk_answers));
}

/// Filters accepted by GET /answers
#[derive(Debug, Deserialize)]
pub struct AnswerFilter {
    pub category_id: Option<i64>,
    pub question_id: Option<QuestionId>,
}

/// GET /api/v1/question-categories
async fn list_categories(
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    authenticate(&http_req, &state)?;

    let categories = state.postgres.list_categories().await?;
    Ok(HttpResponse::Ok().json(categories))
}

/// GET /api/v1/question-categories/{id}
async fn get_category(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let user_id = authenticate(&http_req, &state)?;

    let category = state.postgres.get_category(path.into_inner()).await?;
    let detail = category_detail(&state, user_id, category).await?;
    Ok(HttpResponse::Ok().json(detail))
}

async fn category_detail(
    state: &AppState,
    user_id: UserId,
    category: QuestionCategory,
) -> Result<CategoryDetailResponse, ApiError> {
    let user_answers = state
        .postgres
        .list_user_answers(user_id, Some(category.id), None)
        .await?;
    let completion = completion_percentage(category.questions.len(), user_answers.len());

    Ok(CategoryDetailResponse {
        category,
        completion_percentage: completion,
        user_answers,
    })
}

/// GET /api/v1/answers
async fn list_answers(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    filter: web::Query<AnswerFilter>,
) -> Result<HttpResponse, ApiError> {
    let user_id = authenticate(&http_req, &state)?;

    let answers = state
        .postgres
        .list_user_answers(user_id, filter.category_id, filter.question_id)
        .await?;
    Ok(HttpResponse::Ok().json(answers))
}

/// Create or replace the caller's answer to one question
///
/// POST /api/v1/answers
async fn submit_answer(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    req: web::Json<SubmitAnswerRequest>,
) -> Result<HttpResponse, ApiError> {
    let user_id = authenticate(&http_req, &state)?;
    req.validate()?;

    let question = match state.postgres.get_question(req.question_id).await {
        Ok(question) => question,
        Err(StoreError::NotFound(_)) => {
            return Err(ApiError::bad_request(format!(
                "Question {} does not exist",
                req.question_id
            )))
        }
        Err(e) => return Err(e.into()),
    };

    let answer = validate_answer(&question, &req)?;
    state.postgres.upsert_answers(user_id, &[answer]).await?;
    state.postgres.refresh_matching_score(user_id).await?;

    let stored = state
        .postgres
        .list_user_answers(user_id, None, Some(question.id))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::internal("Answer was not stored"))?;

    tracing::info!("User {} answered question {}", user_id, question.id);
    Ok(HttpResponse::Created().json(stored))
}

/// Answer several questions of one category in a single transaction
///
/// POST /api/v1/answers/bulk
async fn submit_bulk_answers(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    req: web::Json<BulkAnswerRequest>,
) -> Result<HttpResponse, ApiError> {
    let user_id = authenticate(&http_req, &state)?;
    req.validate()?;

    let category = state.postgres.get_category(req.category_id).await?;
    let answers = validate_bulk(&category, &req)?;

    state.postgres.upsert_answers(user_id, &answers).await?;
    state.postgres.refresh_matching_score(user_id).await?;

    tracing::info!(
        "User {} answered {} questions in category {}",
        user_id,
        answers.len(),
        category.id
    );

    let detail = category_detail(&state, user_id, category).await?;
    Ok(HttpResponse::Created().json(detail))
}

/// Validate every response against its question; all must belong to `category`
fn validate_bulk(
    category: &QuestionCategory,
    req: &BulkAnswerRequest,
) -> Result<Vec<ValidatedAnswer>, ApiError> {
    req.responses
        .iter()
        .map(|response| {
            let question = category
                .questions
                .iter()
                .find(|q| q.id == response.question_id)
                .ok_or_else(|| {
                    ApiError::bad_request("All questions must belong to the specified category")
                })?;
            Ok(validate_answer(question, response)?)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Question, QuestionType};
    use actix_web::http::StatusCode;
    use chrono::Utc;

    fn scale_question(id: QuestionId, category_id: i64) -> Question {
        Question {
            id,
            category_id,
            text: "How social are you?".to_string(),
            question_type: QuestionType::Scale,
            required: true,
            order: 0,
            min_value: Some(1),
            max_value: Some(5),
            choices: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn category() -> QuestionCategory {
        QuestionCategory {
            id: 7,
            name: "Lifestyle".to_string(),
            description: String::new(),
            weight: 1.0,
            order: 0,
            questions: vec![scale_question(1, 7), scale_question(2, 7)],
        }
    }

    fn scale_answer(question_id: QuestionId, value: i32) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            question_id,
            scale_value: Some(value),
            ..SubmitAnswerRequest::default()
        }
    }

    #[test]
    fn test_bulk_accepts_questions_of_category() {
        let req = BulkAnswerRequest {
            category_id: 7,
            responses: vec![scale_answer(1, 3), scale_answer(2, 5)],
        };

        let answers = validate_bulk(&category(), &req).unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[1].scale_value, Some(5));
    }

    #[test]
    fn test_bulk_rejects_foreign_question() {
        let req = BulkAnswerRequest {
            category_id: 7,
            responses: vec![scale_answer(1, 3), scale_answer(99, 3)],
        };

        let err = validate_bulk(&category(), &req).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "All questions must belong to the specified category");
    }

    #[test]
    fn test_bulk_reports_invalid_answer() {
        let req = BulkAnswerRequest {
            category_id: 7,
            responses: vec![scale_answer(2, 9)],
        };

        let err = validate_bulk(&category(), &req).unwrap_err();
        assert_eq!(err.message, "Response must be a number between 1 and 5");
    }
}

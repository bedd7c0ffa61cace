use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

use crate::models::{UpdateProfileRequest, UserView};
use crate::routes::{authenticate, ApiError, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/profile", web::get().to(get_profile))
        .route("/profile", web::patch().to(update_profile))
        .route("/users", web::get().to(list_users));
}

/// GET /api/v1/profile
async fn get_profile(
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let user_id = authenticate(&http_req, &state)?;
    let (user, profile) = state.postgres.get_user(user_id).await?;

    Ok(HttpResponse::Ok().json(UserView::new(user, profile)))
}

/// PATCH /api/v1/profile
///
/// Only the fields present in the body are changed.
async fn update_profile(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    let user_id = authenticate(&http_req, &state)?;
    req.validate()?;

    let (user, profile) = state.postgres.update_user(user_id, &req).await?;
    tracing::info!("User {} updated their profile", user_id);

    Ok(HttpResponse::Ok().json(UserView::new(user, profile)))
}

/// GET /api/v1/users
async fn list_users(
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    authenticate(&http_req, &state)?;

    let users: Vec<UserView> = state
        .postgres
        .list_users()
        .await?
        .into_iter()
        .map(|(user, profile)| UserView::new(user, profile))
        .collect();

    Ok(HttpResponse::Ok().json(users))
}

use actix_web::{web, HttpResponse};
use serde_json::{json, Value};
use tracing::info;
use crate::auth::AuthenticatedUser;
use crate::db::SaveOutcome;
use crate::error::AppError;
use crate::validation::validate_resume;
use crate::AppState;

pub async fn get_resume(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let document = state
        .resumes
        .get_resume(user.user_id)
        .await
        .map_err(|e| AppError::from(e).context("Server error while fetching resume"))?
        .ok_or(AppError::NotFound("Resume"))?;

    Ok(HttpResponse::Ok().json(document))
}

/// Creates or replaces the caller's resume. Two concurrent saves from the
/// same user race at the store and the last write wins.
pub async fn save_resume(
    user: AuthenticatedUser,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let document = body.into_inner();
    validate_resume(&document)?;

    let outcome = state
        .resumes
        .upsert_resume(user.user_id, &document)
        .await
        .map_err(|e| AppError::from(e).context("Server error while saving resume"))?;

    info!(user_id = %user.user_id, ?outcome, "Resume saved");
    Ok(match outcome {
        SaveOutcome::Created => HttpResponse::Created().json(json!({ "message": "Resume created." })),
        SaveOutcome::Updated => HttpResponse::Ok().json(json!({ "message": "Resume updated." })),
    })
}

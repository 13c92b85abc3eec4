use actix_web::{web, HttpResponse};
use serde_json::{Map, Value};
use tracing::{error, info};
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::generation::prompts::{COVER_LETTER_SYSTEM_PROMPT, RESUME_SYSTEM_PROMPT};
use crate::validation::{require_non_empty_object, validate_cover_request};
use crate::AppState;

const MARKDOWN: &str = "text/markdown; charset=utf-8";

pub async fn build_resume(
    user: AuthenticatedUser,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let document = body.into_inner();
    require_non_empty_object(&document, "Missing resume JSON in request body")?;

    info!(user_id = %user.user_id, "Generating resume");
    let markdown = state
        .generator
        .generate(RESUME_SYSTEM_PROMPT, &document.to_string())
        .await
        .map_err(|e| {
            error!(user_id = %user.user_id, "Resume generation failed: {}", e);
            AppError::from(e).context("Failed to generate resume")
        })?;

    Ok(HttpResponse::Ok().content_type(MARKDOWN).body(markdown))
}

pub async fn build_cover_letter(
    user: AuthenticatedUser,
    body: web::Json<Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    validate_cover_request(&request)?;

    let resume = state
        .resumes
        .get_resume(user.user_id)
        .await
        .map_err(|e| AppError::from(e).context("Server error while fetching resume"))?
        .ok_or(AppError::NotFound("Resume"))?;

    info!(user_id = %user.user_id, "Generating cover letter");
    let context = cover_letter_context(resume, request);
    let markdown = state
        .generator
        .generate(COVER_LETTER_SYSTEM_PROMPT, &context.to_string())
        .await
        .map_err(|e| {
            error!(user_id = %user.user_id, "Cover letter generation failed: {}", e);
            AppError::from(e).context("Failed to generate cover letter")
        })?;

    Ok(HttpResponse::Ok().content_type(MARKDOWN).body(markdown))
}

/// The stored resume's top-level fields overlaid with the job request;
/// request fields win on collision.
pub fn cover_letter_context(resume: Value, request: Value) -> Value {
    let mut merged = match resume {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("resume".to_string(), other);
            map
        }
    };
    if let Value::Object(fields) = request {
        merged.extend(fields);
    }
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cover_letter_context_merges_job_over_resume() {
        let resume = json!({ "personal": { "fullName": "Alice" }, "skills": ["Rust"], "theme": "old" });
        let request = json!({ "job_title": "Engineer", "job_description": "Build", "theme": "friendly" });

        let merged = cover_letter_context(resume, request);
        assert_eq!(merged["personal"]["fullName"], "Alice");
        assert_eq!(merged["job_title"], "Engineer");
        assert_eq!(merged["theme"], "friendly");
        assert_eq!(merged["skills"], json!(["Rust"]));
    }

    #[test]
    fn test_cover_letter_context_wraps_non_object_resume() {
        let merged = cover_letter_context(json!("plain text"), json!({ "job_title": "Engineer" }));
        assert_eq!(merged["resume"], "plain text");
        assert_eq!(merged["job_title"], "Engineer");
    }
}

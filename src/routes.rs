//! Route table: group → rate limiter → auth gate → extractor/validator → handler.
//!
//! The app-wide layers live here too so that `main` and the integration
//! tests build the same stack.

use actix_cors::Cors;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, ErrorHandlerResponse, ErrorHandlers};
use actix_web::{error, web, HttpResponse};
use crate::auth::handlers::{login, logout, register};
use crate::auth::{RateLimit, RequireAuth, RouteGroup};
use crate::config::CorsConfig;
use crate::error::{AppError, INTERNAL_ERROR_MESSAGE};
use crate::generation::handlers::{build_cover_letter, build_resume};
use crate::resume::handlers::{get_resume, save_resume};
use crate::{health_check, AppState};

/// Mounts every route onto an `App`. `state` is registered as app data.
pub fn configure(cfg: &mut web::ServiceConfig, state: web::Data<AppState>) {
    let hops = state.config.proxy.trusted_hops;
    let limit = |group| RateLimit::new(state.rate_limiter.clone(), group, hops);
    let require_auth = || RequireAuth::new(state.auth_service.clone());

    cfg.app_data(state.clone())
        .app_data(json_config())
        .route("/health", web::get().to(health_check))
        .service(
            web::scope("/api/auth")
                .wrap(limit(RouteGroup::Auth))
                .route("/register", web::post().to(register))
                .route("/login", web::post().to(login))
                .service(
                    web::resource("/logout")
                        .wrap(require_auth())
                        .route(web::post().to(logout)),
                ),
        )
        .service(
            web::resource("/api/resume")
                .wrap(require_auth())
                .wrap(limit(RouteGroup::Resume))
                .route(web::get().to(get_resume))
                .route(web::post().to(save_resume)),
        )
        .service(
            web::resource("/api/build")
                .wrap(require_auth())
                .wrap(limit(RouteGroup::Generation))
                .route(web::post().to(build_resume)),
        )
        .service(
            web::resource("/api/cover")
                .wrap(require_auth())
                .wrap(limit(RouteGroup::Generation))
                .route(web::post().to(build_cover_letter)),
        )
        .default_service(web::route().to(not_found));
}

/// Malformed JSON and wrong content types surface as a `body` field error.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = match &err {
            error::JsonPayloadError::ContentType => "Content type must be application/json".to_string(),
            other => format!("Invalid JSON body: {}", other),
        };
        AppError::invalid("body", message).into()
    })
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "error": "Not Found" }))
}

/// CORS policy from config; `*` allows any origin.
pub fn cors(config: &CorsConfig) -> Cors {
    let cors = if config.allows_any_origin() {
        Cors::default().allow_any_origin()
    } else {
        config
            .origins()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST"])
        .allow_any_header()
        .max_age(config.max_age as usize)
}

pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "SAMEORIGIN"))
        .add(("Referrer-Policy", "no-referrer"))
        .add(("Cross-Origin-Resource-Policy", "same-origin"))
}

/// Gives framework-generated error responses the same JSON shape as
/// `AppError`.
pub fn error_handlers<B: 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new().default_handler(json_error_body)
}

fn json_error_body<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let status = res.status();
    let content_type = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    // 5xx bodies are only trusted when `AppError` rendered them. 4xx bodies
    // with a content type (field errors, the 429 text) pass through.
    let keep = if status.is_server_error() {
        content_type.starts_with("application/json")
    } else {
        !content_type.is_empty()
    };
    if keep {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    let message = if status.is_server_error() {
        INTERNAL_ERROR_MESSAGE
    } else {
        status.canonical_reason().unwrap_or("Request failed")
    };
    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), "Unhandled server error");
    }

    let (req, original) = res.into_parts();
    let mut response = HttpResponse::build(status).json(serde_json::json!({ "error": message }));
    for (name, value) in original.headers() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            response.headers_mut().insert(name.clone(), value.clone());
        }
    }

    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, response).map_into_right_body(),
    ))
}

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use crate::auth::AuthenticatedUser;
use crate::db::PublicUser;
use crate::error::AppError;
use crate::validation::{validate_login, validate_registration};
use crate::AppState;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: PublicUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email_or_username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    validate_registration(&req.username, &req.email, &req.password)?;
    info!("Received registration request for username: {}", req.username);

    let user = state
        .auth_service
        .register(&req.username, &req.email, &req.password)
        .await
        .map_err(|e| {
            warn!("Registration failed for username: {}: {}", req.username, e);
            e.context("Server error during registration")
        })?;

    Ok(HttpResponse::Created().json(RegisterResponse { user }))
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    validate_login(&req.email_or_username, &req.password)?;

    let token = state
        .auth_service
        .login(&req.email_or_username, &req.password)
        .await
        .map_err(|e| {
            warn!("Login failed: {}", e);
            e.context("Server error during login")
        })?;

    Ok(HttpResponse::Ok().json(AuthResponse { token }))
}

pub async fn logout(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state.auth_service.invalidate_token(&user.token()).await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Successfully logged out"
    })))
}

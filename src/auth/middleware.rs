//! Request interception for rate limiting and bearer authentication.
//!
//! Register `RequireAuth` before `RateLimit` on a scope. actix runs the last
//! registered middleware first, so the limiter caps floods before any token
//! is verified.

use std::rc::Rc;
use std::sync::Arc;
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest, ResponseError};
use futures::future::{ready, LocalBoxFuture, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::auth::rate_limit::{client_key, RateDecision, RateLimiter, RouteGroup};
use crate::auth::service::AuthService;
use crate::auth::token::VerifiedToken;
use crate::error::{AppError, AuthError};

/// Identity attached by `RequireAuth`. Handlers take it as an extractor and
/// never look at request fields to decide who the caller is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub token_id: Uuid,
    pub expires_at: i64,
}

impl From<VerifiedToken> for AuthenticatedUser {
    fn from(token: VerifiedToken) -> Self {
        Self {
            user_id: token.user_id,
            token_id: token.token_id,
            expires_at: token.expires_at,
        }
    }
}

impl AuthenticatedUser {
    pub fn token(&self) -> VerifiedToken {
        VerifiedToken {
            user_id: self.user_id,
            token_id: self.token_id,
            expires_at: self.expires_at,
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedUser>()
                .copied()
                .ok_or(AppError::AuthError(AuthError::MissingToken)),
        )
    }
}

/// Extracts `<token>` from `Authorization: Bearer <token>`.
pub fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn reject<B>(req: ServiceRequest, err: AppError) -> ServiceResponse<EitherBody<B>> {
    let response = err.error_response();
    req.into_response(response).map_into_right_body()
}

/// Counts each request against a route group's fixed-window quota.
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
    group: RouteGroup,
    trusted_hops: usize,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>, group: RouteGroup, trusted_hops: usize) -> Self {
        Self {
            limiter,
            group,
            trusted_hops,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            group: self.group,
            trusted_hops: self.trusted_hops,
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    limiter: Arc<RateLimiter>,
    group: RouteGroup,
    trusted_hops: usize,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let limiter = self.limiter.clone();
        let group = self.group;
        let forwarded_for = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok());
        let key = client_key(req.peer_addr(), forwarded_for, self.trusted_hops);

        Box::pin(async move {
            match limiter.check_rate_limit(&key, group).await {
                RateDecision::Allowed { .. } => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                RateDecision::Limited { retry_after } => {
                    warn!(client = %key, group = %group, "Rate limit exceeded");
                    let err = AppError::RateLimited {
                        message: limiter.policy(group).message.clone(),
                        // Round up so clients never retry inside the window.
                        retry_after_secs: retry_after.as_millis().div_ceil(1000) as u64,
                    };
                    Ok(reject(req, err))
                }
            }
        })
    }
}

/// Rejects requests without a valid, unrevoked bearer token and attaches
/// `AuthenticatedUser` to the ones that pass.
#[derive(Clone)]
pub struct RequireAuth {
    auth: Arc<AuthService>,
}

impl RequireAuth {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RequireAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireAuthMiddleware {
            service: Rc::new(service),
            auth: self.auth.clone(),
        }))
    }
}

pub struct RequireAuthMiddleware<S> {
    service: Rc<S>,
    auth: Arc<AuthService>,
}

impl<S, B> Service<ServiceRequest> for RequireAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let auth = self.auth.clone();

        Box::pin(async move {
            let token = match bearer_token(&req).map(str::to_owned) {
                Some(token) => token,
                None => return Ok(reject(req, AuthError::MissingToken.into())),
            };

            match auth.validate_token(&token).await {
                Ok(verified) => {
                    req.extensions_mut().insert(AuthenticatedUser::from(verified));
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(e) => Ok(reject(req, e.into())),
            }
        })
    }
}

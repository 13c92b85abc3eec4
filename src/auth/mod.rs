//! Authentication module
//!
//! Token signing and verification, credential checks, the bearer-token gate
//! and per-route-group rate limiting.

pub mod handlers;
pub mod middleware;
pub mod password;
pub mod rate_limit;
pub mod revocation;
pub mod service;
pub mod token;

pub use middleware::{AuthenticatedUser, RateLimit, RequireAuth};
pub use rate_limit::{client_key, RateDecision, RateLimitConfig, RateLimiter, RouteGroup};
pub use revocation::RevocationList;
pub use service::AuthService;
pub use token::{Claims, TokenCodec, VerifiedToken};

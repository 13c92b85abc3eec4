//! Per-user resume storage endpoints.

pub mod handlers;

//! DocuShare site access.
//!
//! This module provides:
//! - Cookie-carrying HTTP transport and resource URLs
//! - Challenge-response login and session recovery
//! - Bounded retry of transient network failures

pub mod client;
pub mod retry;
pub mod session;

pub use client::{ContentBody, ContentResponse, HttpSettings, Page, Resource, Transport};
pub use retry::RetryPolicy;
pub use session::{SessionManager, SessionSettings, SessionState, DEFAULT_LOGIN_ATTEMPTS, SESSION_COOKIE};

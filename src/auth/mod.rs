//! Authentication collaborators.
//!
//! This module provides:
//! - Challenge script composition and evaluation
//! - Credential sources (literal, environment, prompt, keyring)

pub mod challenge;
pub mod credentials;

pub use challenge::{compose_challenge_script, NodeEvaluator, ScriptEvaluator, DEFAULT_JS_INTERPRETER};
pub use credentials::{
    CredentialSource, Credentials, EnvCredentials, KeyringCredentials, PromptCredentials,
    StaticCredentials,
};

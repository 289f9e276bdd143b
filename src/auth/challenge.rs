//! Challenge-response computation.
//!
//! The login page references a `challenge.js` script defining
//! `obscure_string(password, login_token)`. The client appends a call to it
//! and hands the script to a [`ScriptEvaluator`], which returns the token to
//! post back in place of the clear-text password.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Default JavaScript interpreter.
pub const DEFAULT_JS_INTERPRETER: &str = "/usr/bin/node";

/// Executes server-supplied challenge logic.
pub trait ScriptEvaluator: Send + Sync {
    /// Run `script` and return the computed response token.
    fn evaluate(&self, script: &str, nonce: &str) -> Result<String>;
}

impl<F> ScriptEvaluator for F
where
    F: Fn(&str, &str) -> Result<String> + Send + Sync,
{
    fn evaluate(&self, script: &str, nonce: &str) -> Result<String> {
        self(script, nonce)
    }
}

/// Append the `obscure_string` invocation to the downloaded challenge script.
///
/// Arguments are embedded as JSON string literals, which are valid JavaScript.
pub fn compose_challenge_script(challenge_js: &str, password: &str, nonce: &str) -> Result<String> {
    let password = serde_json::to_string(password)?;
    let nonce = serde_json::to_string(nonce)?;
    Ok(format!(
        "{}\nconsole.log(obscure_string({}, {}));\n",
        challenge_js, password, nonce
    ))
}

/// Evaluates scripts by piping them into a JavaScript interpreter (Node.js).
#[derive(Debug, Clone)]
pub struct NodeEvaluator {
    interpreter: PathBuf,
}

impl Default for NodeEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_JS_INTERPRETER)
    }
}

impl NodeEvaluator {
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

impl ScriptEvaluator for NodeEvaluator {
    fn evaluate(&self, script: &str, _nonce: &str) -> Result<String> {
        let mut child = Command::new(&self.interpreter)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::Authentication(format!(
                    "Cannot run JavaScript interpreter {}: {}",
                    self.interpreter.display(),
                    e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(script.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(Error::Authentication(format!(
                "Challenge script failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(Error::Authentication(
                "Challenge script produced no response token".to_string(),
            ));
        }

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_escapes_arguments() {
        let script =
            compose_challenge_script("function obscure_string(p, t) { return p + t; }", "pa\"ss\n", "tok")
                .unwrap();
        assert!(script.starts_with("function obscure_string"));
        assert!(script.contains(r#"console.log(obscure_string("pa\"ss\n", "tok"));"#));
    }

    #[test]
    fn test_closure_evaluator() {
        let evaluator = |script: &str, nonce: &str| -> Result<String> {
            Ok(format!("{}:{}", script.len(), nonce))
        };
        assert_eq!(evaluator.evaluate("abc", "n1").unwrap(), "3:n1");
    }

    #[test]
    fn test_missing_interpreter_is_authentication_error() {
        let evaluator = NodeEvaluator::new("/nonexistent/interpreter-for-tests");
        assert!(matches!(
            evaluator.evaluate("console.log(1)", "n"),
            Err(Error::Authentication(_))
        ));
    }
}

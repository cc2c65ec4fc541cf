//! Subprocess backend: runs the real `bws` executable and returns its
//! output. Every call blocks until the child process exits; no timeout or
//! cancellation is layered on top.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use bws_cache_core::{Backend, BackendError};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable consulted when no token is passed explicitly.
pub const TOKEN_ENV_VAR: &str = "BWS_ACCESS_TOKEN";

/// Default executable name, resolved through `PATH`.
pub const DEFAULT_PROGRAM: &str = "bws";

/// No access token was passed and the environment variable is unset.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no access token provided and {TOKEN_ENV_VAR} is not set")]
pub struct MissingToken;

/// Backend that shells out to the `bws` CLI.
///
/// The access token is appended to every invocation as `-t <token>` (with
/// `-c no` to suppress color codes in output) and is kept out of logs and
/// error messages.
pub struct BwsProcess {
    program: PathBuf,
    token: String,
}

impl BwsProcess {
    pub fn new(program: impl Into<PathBuf>, token: impl Into<String>) -> Self {
        let process = Self {
            program: program.into(),
            token: token.into(),
        };
        info!(program = %process.program.display(), "using bws executable");
        process
    }

    /// Construct with the token taken from `BWS_ACCESS_TOKEN`.
    pub fn from_env(program: impl Into<PathBuf>) -> Result<Self, MissingToken> {
        match env::var(TOKEN_ENV_VAR) {
            Ok(token) if !token.is_empty() => {
                info!("using access token from {TOKEN_ENV_VAR}");
                Ok(Self::new(program, token))
            }
            _ => Err(MissingToken),
        }
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

// Manual Debug so the token can never leak through `{:?}` formatting.
impl fmt::Debug for BwsProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BwsProcess")
            .field("program", &self.program)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Backend for BwsProcess {
    fn name(&self) -> &'static str {
        "bws"
    }

    fn invoke(&self, args: &[String]) -> Result<String, BackendError> {
        // Only the caller-supplied args are logged; the token is appended
        // after this point.
        debug!(program = %self.program.display(), ?args, "invoking bws");

        let output = Command::new(&self.program)
            .args(args)
            .args(["-c", "no", "-t"])
            .arg(&self.token)
            .output()
            .map_err(|err| BackendError::Launch {
                program: self.program.display().to_string(),
                reason: err.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stderr = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            return Err(BackendError::CommandFailed {
                status: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        String::from_utf8(output.stdout).map_err(|_| BackendError::InvalidOutput {
            reason: format!("{} produced non-UTF-8 output", self.name()),
        })
    }
}

use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::model::{Project, Secret};

/// Errors produced by backend invocations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The backend executable could not be started at all.
    #[error("failed to launch `{program}`: {reason}")]
    Launch { program: String, reason: String },
    /// The backend ran but exited with a non-success status. Carries the
    /// backend's own error text verbatim.
    #[error("backend exited with status {status}: {stderr}")]
    CommandFailed { status: i32, stderr: String },
    /// The backend exited successfully but its output could not be used.
    #[error("invalid backend output: {reason}")]
    InvalidOutput { reason: String },
}

/// Contract for anything that can answer `bws`-shaped command invocations.
///
/// All traffic (bulk list, get, create, edit, delete, and raw escape-hatch
/// calls) funnels through the single `invoke` primitive. Implementations are
/// synchronous and block until the command completes; no retries, timeouts,
/// or cancellation are provided at this seam.
pub trait Backend {
    /// Short name used for logging and error messages.
    fn name(&self) -> &'static str;

    /// Run one command and return its stdout on success.
    fn invoke(&self, args: &[String]) -> Result<String, BackendError>;

    /// Run one command and parse its stdout as JSON.
    fn invoke_json(&self, args: &[String]) -> Result<Value, BackendError> {
        let text = self.invoke(args)?;
        serde_json::from_str(&text).map_err(|err| BackendError::InvalidOutput {
            reason: format!("{} returned malformed JSON: {err}", self.name()),
        })
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    projects: Vec<Project>,
    secrets: Vec<Secret>,
}

/// In-memory emulation of the `bws` argument surface, for tests and offline
/// smoke runs. Clones share state, so a test can hold a second handle and
/// mutate "remotely" behind a cache's back.
///
/// Like the real backend, it happily stores two secrets with the same key
/// name; uniqueness is a client-side concern.
#[derive(Debug, Default, Clone)]
pub struct MemoryBws {
    org_id: Uuid,
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryBws {
    pub fn new() -> Self {
        Self {
            org_id: Uuid::new_v4(),
            inner: Arc::default(),
        }
    }

    /// Register a project and return its record.
    pub fn add_project(&self, name: &str) -> Project {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            organization_id: self.org_id,
            name: name.to_string(),
            creation_date: now,
            revision_date: now,
        };
        self.state().projects.push(project.clone());
        project
    }

    /// Insert a secret directly, bypassing any duplicate-key policing.
    pub fn seed_secret(&self, project_id: Uuid, key: &str, value: &str) -> Secret {
        let secret = self.build_secret(project_id, key, value);
        self.state().secrets.push(secret.clone());
        secret
    }

    fn build_secret(&self, project_id: Uuid, key: &str, value: &str) -> Secret {
        let now = Utc::now();
        Secret {
            id: Uuid::new_v4(),
            organization_id: self.org_id,
            project_id,
            key: key.to_string(),
            value: value.to_string(),
            note: String::new(),
            creation_date: now,
            revision_date: now,
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-mutation; the data
        // itself is still usable.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn command_failed(stderr: impl Into<String>) -> BackendError {
        BackendError::CommandFailed {
            status: 1,
            stderr: stderr.into(),
        }
    }

    fn to_json<T: serde::Serialize>(value: &T) -> Result<String, BackendError> {
        serde_json::to_string(value).map_err(|err| BackendError::InvalidOutput {
            reason: err.to_string(),
        })
    }

    fn parse_id(raw: &str) -> Result<Uuid, BackendError> {
        Uuid::parse_str(raw)
            .map_err(|_| Self::command_failed(format!("error: invalid UUID `{raw}`")))
    }
}

impl Backend for MemoryBws {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn invoke(&self, args: &[String]) -> Result<String, BackendError> {
        debug!(?args, "memory backend invocation");
        let words: Vec<&str> = args.iter().map(String::as_str).collect();
        match words.as_slice() {
            ["project", "list"] => Self::to_json(&self.state().projects),
            ["secret", "list", project_id] => {
                let project_id = Self::parse_id(project_id)?;
                let state = self.state();
                if !state.projects.iter().any(|p| p.id == project_id) {
                    return Err(Self::command_failed("404 Not Found: project not found"));
                }
                let secrets: Vec<&Secret> = state
                    .secrets
                    .iter()
                    .filter(|s| s.project_id == project_id)
                    .collect();
                Self::to_json(&secrets)
            }
            ["secret", "get", id] => {
                let id = Self::parse_id(id)?;
                let state = self.state();
                let secret = state
                    .secrets
                    .iter()
                    .find(|s| s.id == id)
                    .ok_or_else(|| Self::command_failed("404 Not Found: secret not found"))?;
                Self::to_json(secret)
            }
            ["secret", "create", key, value, project_id] => {
                let project_id = Self::parse_id(project_id)?;
                let mut state = self.state();
                if !state.projects.iter().any(|p| p.id == project_id) {
                    return Err(Self::command_failed("404 Not Found: project not found"));
                }
                let secret = self.build_secret(project_id, key, value);
                state.secrets.push(secret.clone());
                Self::to_json(&secret)
            }
            ["secret", "edit", id, "--value", value] => {
                let id = Self::parse_id(id)?;
                let mut state = self.state();
                let secret = state
                    .secrets
                    .iter_mut()
                    .find(|s| s.id == id)
                    .ok_or_else(|| Self::command_failed("404 Not Found: secret not found"))?;
                secret.value = value.to_string();
                secret.revision_date = Utc::now();
                let updated = secret.clone();
                Self::to_json(&updated)
            }
            ["secret", "delete", id] => {
                let id = Self::parse_id(id)?;
                let mut state = self.state();
                let before = state.secrets.len();
                state.secrets.retain(|s| s.id != id);
                if state.secrets.len() == before {
                    return Err(Self::command_failed("404 Not Found: secret not found"));
                }
                Ok(format!("{id}: deleted\n"))
            }
            ["-V"] => Ok("bws 0.0.0 (memory)\n".to_string()),
            ["-h"] => Ok("Usage: bws [OPTIONS] <COMMAND>\n".to_string()),
            _ => Err(BackendError::CommandFailed {
                status: 2,
                stderr: format!("error: unrecognized arguments: {}", words.join(" ")),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn project_list_returns_registered_projects() {
        let backend = MemoryBws::new();
        backend.add_project("homelab");
        backend.add_project("work");

        let value = backend
            .invoke_json(&args(&["project", "list"]))
            .expect("project list");
        let projects: Vec<Project> = serde_json::from_value(value).expect("parse");
        let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["homelab", "work"]);
    }

    #[test]
    fn secret_lifecycle_create_edit_delete() {
        let backend = MemoryBws::new();
        let project = backend.add_project("homelab");

        let created = backend
            .invoke_json(&args(&[
                "secret",
                "create",
                "DB_PASSWORD",
                "hunter2",
                &project.id.to_string(),
            ]))
            .expect("create");
        let created: Secret = serde_json::from_value(created).expect("parse created");
        assert_eq!(created.value, "hunter2");

        let edited = backend
            .invoke_json(&args(&[
                "secret",
                "edit",
                &created.id.to_string(),
                "--value",
                "hunter3",
            ]))
            .expect("edit");
        let edited: Secret = serde_json::from_value(edited).expect("parse edited");
        assert_eq!(edited.id, created.id);
        assert_eq!(edited.value, "hunter3");

        backend
            .invoke(&args(&["secret", "delete", &created.id.to_string()]))
            .expect("delete");
        let err = backend
            .invoke(&args(&["secret", "get", &created.id.to_string()]))
            .expect_err("get after delete");
        assert!(matches!(err, BackendError::CommandFailed { .. }));
    }

    #[test]
    fn secret_list_scopes_to_project() {
        let backend = MemoryBws::new();
        let a = backend.add_project("a");
        let b = backend.add_project("b");
        backend.seed_secret(a.id, "ONLY_IN_A", "1");
        backend.seed_secret(b.id, "ONLY_IN_B", "2");

        let value = backend
            .invoke_json(&args(&["secret", "list", &a.id.to_string()]))
            .expect("list");
        let secrets: Vec<Secret> = serde_json::from_value(value).expect("parse");
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].key, "ONLY_IN_A");
    }

    #[test]
    fn clones_share_state() {
        let backend = MemoryBws::new();
        let other = backend.clone();
        let project = other.add_project("shared");
        other.seed_secret(project.id, "K", "v");

        let value = backend
            .invoke_json(&args(&["secret", "list", &project.id.to_string()]))
            .expect("list through original handle");
        let secrets: Vec<Secret> = serde_json::from_value(value).expect("parse");
        assert_eq!(secrets.len(), 1);
    }

    #[test]
    fn unknown_command_fails_with_usage_error() {
        let backend = MemoryBws::new();
        let err = backend
            .invoke(&args(&["secret", "frobnicate"]))
            .expect_err("unknown command");
        assert_eq!(
            err,
            BackendError::CommandFailed {
                status: 2,
                stderr: "error: unrecognized arguments: secret frobnicate".to_string(),
            }
        );
    }

    #[test]
    fn invoke_json_rejects_plain_text_output() {
        let backend = MemoryBws::new();
        let project = backend.add_project("p");
        let secret = backend.seed_secret(project.id, "K", "v");

        // delete emits plain text, not JSON
        let err = backend
            .invoke_json(&args(&["secret", "delete", &secret.id.to_string()]))
            .expect_err("delete output is not JSON");
        assert!(matches!(err, BackendError::InvalidOutput { .. }));
    }
}

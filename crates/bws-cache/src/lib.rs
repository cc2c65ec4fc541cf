//! Cached facade over a `bws`-shaped backend.
//!
//! `SecretCache` owns an in-memory mirror of one project's secrets, keyed by
//! secret key name. The mirror is built once at connect time, patched in
//! place by add/update/delete, and rebuilt wholesale by `refresh`. Mutating
//! operations touch the cache only after the remote call has succeeded, so a
//! failed call never leaves partial state behind.
//!
//! One instance corresponds to one project/credential pair. Changes made by
//! other tools are invisible until an explicit `refresh`.

use std::collections::BTreeMap;

use bws_cache_core::{Backend, BackendError, Project, Secret};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

/// Errors surfaced by the cache facade.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("project \"{name}\" not found; available projects: {}", .available.join(", "))]
    ProjectNotFound { name: String, available: Vec<String> },
    #[error("project \"{name}\" contains no secrets")]
    EmptyProject { name: String },
    #[error("duplicate secret key \"{key}\"; each key name in the project must be unique")]
    DuplicateKey { key: String },
    #[error("secret not found: {key}")]
    SecretNotFound { key: String },
    #[error("secret key \"{key}\" already exists; use update or set instead")]
    KeyExists { key: String },
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Map-like, locally cached view of one project's secrets.
pub struct SecretCache<B: Backend> {
    backend: B,
    project: Project,
    secrets: BTreeMap<String, Secret>,
}

impl<B: Backend> std::fmt::Debug for SecretCache<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCache")
            .field("project", &self.project)
            .field("secrets", &self.secrets)
            .finish_non_exhaustive()
    }
}

fn cli_args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

impl<B: Backend> SecretCache<B> {
    /// Resolve the project by name and populate the cache with a full bulk
    /// list. Fails fast when the project is unknown, holds zero secrets, or
    /// contains two secrets with the same key name.
    #[instrument(skip_all, fields(project = project_name))]
    pub fn connect(project_name: &str, backend: B) -> Result<Self, CacheError> {
        let project = Self::resolve_project(&backend, project_name)?;
        let secrets = Self::fetch_all(&backend, &project)?;
        info!(count = secrets.len(), "secrets cache populated");
        Ok(Self {
            backend,
            project,
            secrets,
        })
    }

    fn resolve_project(backend: &B, name: &str) -> Result<Project, CacheError> {
        let listed = backend.invoke_json(&cli_args(&["project", "list"]))?;
        let projects: Vec<Project> = serde_json::from_value(listed)?;
        projects
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| CacheError::ProjectNotFound {
                name: name.to_string(),
                available: projects.into_iter().map(|p| p.name).collect(),
            })
    }

    fn fetch_all(backend: &B, project: &Project) -> Result<BTreeMap<String, Secret>, CacheError> {
        let listed =
            backend.invoke_json(&cli_args(&["secret", "list", &project.id.to_string()]))?;
        let listed: Vec<Secret> = serde_json::from_value(listed)?;
        if listed.is_empty() {
            return Err(CacheError::EmptyProject {
                name: project.name.clone(),
            });
        }

        let mut secrets = BTreeMap::new();
        for secret in listed {
            let key = secret.key.clone();
            if secrets.insert(key.clone(), secret).is_some() {
                return Err(CacheError::DuplicateKey { key });
            }
        }
        Ok(secrets)
    }

    /// The project this cache is bound to.
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Cached secret for a key name; no remote call.
    pub fn get(&self, key: &str) -> Result<&Secret, CacheError> {
        self.secrets.get(key).ok_or_else(|| CacheError::SecretNotFound {
            key: key.to_string(),
        })
    }

    /// Cached value only.
    pub fn value(&self, key: &str) -> Result<&str, CacheError> {
        Ok(self.get(key)?.value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.secrets.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.secrets.keys().map(String::as_str)
    }

    /// Iterate over (key name, secret) pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Secret)> {
        self.secrets.iter().map(|(k, s)| (k.as_str(), s))
    }

    /// Borrow the whole cache.
    pub fn as_map(&self) -> &BTreeMap<String, Secret> {
        &self.secrets
    }

    /// Create a secret remotely and insert it into the cache. Rejects a key
    /// name that is already present locally.
    #[instrument(skip(self, value))]
    pub fn add(&mut self, key: &str, value: &str) -> Result<Secret, CacheError> {
        if self.contains(key) {
            return Err(CacheError::KeyExists {
                key: key.to_string(),
            });
        }

        let created = self.backend.invoke_json(&cli_args(&[
            "secret",
            "create",
            key,
            value,
            &self.project.id.to_string(),
        ]))?;
        let secret: Secret = serde_json::from_value(created)?;
        info!(key, project = %self.project.name, "added secret");
        self.secrets.insert(key.to_string(), secret.clone());
        Ok(secret)
    }

    /// Update the value of an existing secret and patch the single cache
    /// entry with the backend's response. The identifier never changes.
    #[instrument(skip(self, value))]
    pub fn update(&mut self, key: &str, value: &str) -> Result<Secret, CacheError> {
        let id = self.get(key)?.id;
        let edited = self.backend.invoke_json(&cli_args(&[
            "secret",
            "edit",
            &id.to_string(),
            "--value",
            value,
        ]))?;
        let secret: Secret = serde_json::from_value(edited)?;
        info!(key, project = %self.project.name, "updated secret value");
        self.secrets.insert(key.to_string(), secret.clone());
        Ok(secret)
    }

    /// Upsert: update when the key is cached, add otherwise.
    pub fn set(&mut self, key: &str, value: &str) -> Result<Secret, CacheError> {
        if self.contains(key) {
            self.update(key, value)
        } else {
            self.add(key, value)
        }
    }

    /// Delete a secret remotely, then drop it from the cache.
    #[instrument(skip(self))]
    pub fn delete(&mut self, key: &str) -> Result<(), CacheError> {
        let id = self.get(key)?.id;
        self.backend
            .invoke(&cli_args(&["secret", "delete", &id.to_string()]))?;
        self.secrets.remove(key);
        info!(key, project = %self.project.name, "deleted secret");
        Ok(())
    }

    /// Fetch a secret by identifier straight from the backend, bypassing the
    /// cache entirely.
    pub fn fetch(&self, id: Uuid) -> Result<Secret, CacheError> {
        let fetched = self
            .backend
            .invoke_json(&cli_args(&["secret", "get", &id.to_string()]))?;
        Ok(serde_json::from_value(fetched)?)
    }

    /// Discard the cache and rebuild it from a fresh bulk list. On failure
    /// the previous contents are kept as-is.
    #[instrument(skip(self))]
    pub fn refresh(&mut self) -> Result<(), CacheError> {
        let fresh = Self::fetch_all(&self.backend, &self.project)?;
        info!(count = fresh.len(), "secrets cache rebuilt");
        self.secrets = fresh;
        Ok(())
    }

    /// Escape hatch: run an arbitrary backend command under the configured
    /// credential and return raw stdout. Not scoped to the cached project;
    /// a call that mutates it should be followed by `refresh`.
    pub fn raw(&self, args: &[String]) -> Result<String, BackendError> {
        self.backend.invoke(args)
    }

    /// Escape hatch returning parsed JSON output.
    pub fn raw_json(&self, args: &[String]) -> Result<Value, BackendError> {
        self.backend.invoke_json(args)
    }

    /// The backend's `-V` output.
    pub fn version(&self) -> Result<String, BackendError> {
        self.backend.invoke(&cli_args(&["-V"]))
    }

    /// The backend's `-h` output.
    pub fn help(&self) -> Result<String, BackendError> {
        self.backend.invoke(&cli_args(&["-h"]))
    }
}

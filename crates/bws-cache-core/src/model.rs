use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A secret as reported by the `bws` CLI. Field names follow the CLI's
/// camelCase JSON output, so a `secret list`/`secret get` response
/// deserializes directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    /// Backend-assigned identifier, immutable for the life of the secret.
    pub id: Uuid,
    pub organization_id: Uuid,
    pub project_id: Uuid,
    /// Key name, unique within a project (enforced client-side; the remote
    /// backend itself tolerates duplicates keyed by id).
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub note: String,
    pub creation_date: DateTime<Utc>,
    pub revision_date: DateTime<Utc>,
}

/// A named grouping of secrets, as reported by `bws project list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub creation_date: DateTime<Utc>,
    pub revision_date: DateTime<Utc>,
}

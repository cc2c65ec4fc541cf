use bws_cache::{CacheError, SecretCache};
use bws_cache_core::{Backend, BackendError};

/// Render the cached key listing, optionally with values.
pub fn list<B: Backend>(cache: &SecretCache<B>, with_values: bool) -> String {
    let mut out = String::new();
    for (key, secret) in cache.iter() {
        if with_values {
            out.push_str(&format!("{key}={}\n", secret.value));
        } else {
            out.push_str(key);
            out.push('\n');
        }
    }
    out
}

/// Look up one secret's value in the cache.
pub fn get<B: Backend>(cache: &SecretCache<B>, key: &str) -> Result<String, CacheError> {
    Ok(cache.value(key)?.to_string())
}

/// Upsert a secret and report what happened.
pub fn set<B: Backend>(
    cache: &mut SecretCache<B>,
    key: &str,
    value: &str,
) -> Result<String, CacheError> {
    let existed = cache.contains(key);
    let secret = cache.set(key, value)?;
    let verb = if existed { "Updated" } else { "Created" };
    Ok(format!("{verb} {key} (id {})", secret.id))
}

/// Delete a secret by key name.
pub fn delete<B: Backend>(cache: &mut SecretCache<B>, key: &str) -> Result<String, CacheError> {
    cache.delete(key)?;
    Ok(format!("Deleted {key}"))
}

/// Probe the backend executable with `-V`.
pub fn health<B: Backend>(backend: &B) -> Result<String, BackendError> {
    let version = backend.invoke(&["-V".to_string()])?;
    Ok(format!("Backend: ok ({})", version.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bws_cache_core::MemoryBws;

    fn connected() -> SecretCache<MemoryBws> {
        let backend = MemoryBws::new();
        let project = backend.add_project("homelab");
        backend.seed_secret(project.id, "API_KEY", "abc123");
        backend.seed_secret(project.id, "DB_PASSWORD", "hunter2");
        SecretCache::connect("homelab", backend).expect("connect")
    }

    #[test]
    fn list_prints_keys_in_order() {
        let cache = connected();
        assert_eq!(list(&cache, false), "API_KEY\nDB_PASSWORD\n");
        assert_eq!(
            list(&cache, true),
            "API_KEY=abc123\nDB_PASSWORD=hunter2\n"
        );
    }

    #[test]
    fn get_returns_the_cached_value() {
        let cache = connected();
        assert_eq!(get(&cache, "API_KEY").expect("get"), "abc123");
        assert!(get(&cache, "MISSING").is_err());
    }

    #[test]
    fn set_reports_create_vs_update() {
        let mut cache = connected();
        let created = set(&mut cache, "NEW_KEY", "v").expect("create");
        assert!(created.starts_with("Created NEW_KEY"));

        let updated = set(&mut cache, "NEW_KEY", "v2").expect("update");
        assert!(updated.starts_with("Updated NEW_KEY"));
        assert_eq!(cache.value("NEW_KEY").expect("value"), "v2");
    }

    #[test]
    fn delete_removes_the_key() {
        let mut cache = connected();
        delete(&mut cache, "API_KEY").expect("delete");
        assert!(!cache.contains("API_KEY"));
    }

    #[test]
    fn health_reports_backend_version() {
        let backend = MemoryBws::new();
        let report = health(&backend).expect("health");
        assert!(report.starts_with("Backend: ok"));
    }
}

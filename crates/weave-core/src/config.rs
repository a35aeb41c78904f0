//! Configuration loader for database connections and query defaults.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nesting, e.g. `APP_DATABASES__DEFAULT`). Connection strings
//! and credentials may reference `${VAR}` or `${VAR:-default}`.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::DEFAULT_TOP_K;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        tracing::debug!(env = %env_name, "configuration sources merged");

        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Database section with `${VAR}` references already expanded.
    pub fn databases(&self) -> Result<DatabasesConfig> {
        let mut databases: DatabasesConfig = self.get("databases")?;
        for db in &mut databases.vector_databases {
            db.url = interpolate(&db.url);
            db.api_key = db.api_key.as_deref().map(interpolate).filter(|k| !k.is_empty());
            db.openai_api_key = db.openai_api_key.as_deref().map(interpolate).filter(|k| !k.is_empty());
        }
        Ok(databases)
    }

    pub fn query_settings(&self) -> QuerySettings {
        self.get("query").unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VectorDbKind {
    #[serde(rename = "weaviate-cloud")]
    WeaviateCloud,
    #[serde(rename = "weaviate-local")]
    WeaviateLocal,
    #[serde(rename = "mock")]
    Mock,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: VectorDbKind,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
}

fn default_timeout_secs() -> u64 { DEFAULT_TIMEOUT_SECS }

impl VectorDbConfig {
    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

    pub fn collection_names(&self) -> Vec<String> {
        self.collections.iter().map(|c| c.name.clone()).collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabasesConfig {
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub vector_databases: Vec<VectorDbConfig>,
}

impl DatabasesConfig {
    /// The named default database, or the first one when no default is set.
    pub fn default_database(&self) -> Result<&VectorDbConfig> {
        let found = match self.default.as_deref() {
            Some(name) => self.vector_databases.iter().find(|db| db.name == name),
            None => self.vector_databases.first(),
        };
        let db = found.ok_or_else(|| {
            Error::InvalidConfig(format!("default database {:?} is not configured", self.default.as_deref().unwrap_or("<first>")))
        })?;
        if db.kind != VectorDbKind::Mock && db.url.trim().is_empty() {
            return Err(Error::InvalidConfig(format!("database '{}' has no url", db.name)));
        }
        Ok(db)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuerySettings {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

fn default_top_k() -> usize { DEFAULT_TOP_K }

impl Default for QuerySettings {
    fn default() -> Self { Self { default_top_k: DEFAULT_TOP_K } }
}

/// Expand `${VAR}` and `${VAR:-default}`. An unset or empty variable takes its
/// default, or becomes empty when there is none.
pub fn interpolate(raw: &str) -> String {
    shellexpand::env_with_context_no_errors(&with_empty_defaults(raw), |name: &str| {
        env::var(name).ok().filter(|v| !v.is_empty())
    })
    .into_owned()
}

/// Rewrite every `${VAR}` without a default as `${VAR:-}`.
fn with_empty_defaults(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        let (head, tail) = rest.split_at(start);
        out.push_str(head);
        match tail.find('}') {
            Some(end) if !tail[..end].contains(":-") => {
                out.push_str(&tail[..end]);
                out.push_str(":-}");
                rest = &tail[end + 1..];
            }
            Some(end) => {
                out.push_str(&tail[..=end]);
                rest = &tail[end + 1..];
            }
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(toml: &str) -> Config {
        Config::from_figment(Figment::new().merge(Toml::string(toml)))
    }

    #[test]
    fn default_database_by_name() {
        let config = config_from(
            r#"
            [databases]
            default = "local"

            [[databases.vector_databases]]
            name = "mock"
            type = "mock"

            [[databases.vector_databases]]
            name = "local"
            type = "weaviate-local"
            url = "http://localhost:8080"
            "#,
        );
        let dbs = config.databases().expect("databases");
        let db = dbs.default_database().expect("default");
        assert_eq!(db.kind, VectorDbKind::WeaviateLocal);
        assert_eq!(db.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn first_database_when_default_unset() {
        let config = config_from(
            r#"
            [[databases.vector_databases]]
            name = "m"
            type = "mock"
            collections = [{ name = "WeaveDocs", type = "text" }]
            "#,
        );
        let dbs = config.databases().expect("databases");
        let db = dbs.default_database().expect("default");
        assert_eq!(db.kind, VectorDbKind::Mock);
        assert_eq!(db.collection_names(), vec!["WeaveDocs"]);
    }

    #[test]
    fn weaviate_without_url_is_invalid() {
        let config = config_from(
            r#"
            [[databases.vector_databases]]
            name = "cloud"
            type = "weaviate-cloud"
            "#,
        );
        let dbs = config.databases().expect("databases");
        assert!(matches!(dbs.default_database(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn query_settings_default_top_k() {
        assert_eq!(config_from("").query_settings().default_top_k, 5);
        assert_eq!(config_from("[query]\ndefault_top_k = 9").query_settings().default_top_k, 9);
    }

    #[test]
    fn interpolation_of_unset_variable() {
        assert_eq!(interpolate("key-${WEAVE_TEST_SURELY_UNSET_VAR}"), "key-");
        assert_eq!(interpolate("${WEAVE_TEST_SURELY_UNSET_VAR:-fallback}"), "fallback");
        assert_eq!(interpolate("plain"), "plain");
        assert_eq!(
            interpolate("http://${WEAVE_TEST_SURELY_UNSET_VAR}/${WEAVE_TEST_OTHER_UNSET_VAR:-x}"),
            "http:///x"
        );
        assert_eq!(interpolate("${WEAVE_TEST_OTHER_UNSET_VAR:-a}-${WEAVE_TEST_SURELY_UNSET_VAR}"), "a-");
    }
}

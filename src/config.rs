//! Extractor settings.
//!
//! Each extractor reads its own subtree of a harness configuration document,
//! addressed by the extractor's scope (for example
//! `extractor.dremiotablecolumn`). Unset keys fall back to the `Default`
//! impls below. Key names used by older deployments (`host_key`,
//! `tags_seperator`, ...) are accepted as aliases.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ExtractError, Result};

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    #[serde(alias = "user_key")]
    pub user: String,
    #[serde(alias = "password_key")]
    pub password: String,
    #[serde(alias = "host_key")]
    pub host: String,
    #[serde(alias = "port_key", deserialize_with = "string_or_number")]
    pub port: String,
    /// ODBC driver name or DSN fragment, e.g. `DSN=Dremio Connector`.
    #[serde(alias = "driver_key")]
    pub driver: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            user: "dremio_auth_user".to_string(),
            password: "dremio_auth_pw".to_string(),
            host: "localhost".to_string(),
            port: "31010".to_string(),
            driver: "DSN=Dremio Connector".to_string(),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("driver", &self.driver)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TableColumnConfig {
    #[serde(flatten)]
    pub connection: ConnectionConfig,
    #[serde(alias = "cluster_key")]
    pub cluster: String,
    pub exclude_system_tables: bool,
    /// Physical datasets, i.e. `TABLE_TYPE = 'TABLE'`.
    pub exclude_pds_tables: bool,
    #[serde(alias = "dremio_collaboration_metadata_table_key")]
    pub collaboration_metadata_table: String,
    #[serde(alias = "tags_seperator")]
    pub tags_separator: Option<String>,
}

impl Default for TableColumnConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            cluster: "Production".to_string(),
            exclude_system_tables: true,
            exclude_pds_tables: false,
            collaboration_metadata_table: "DREMIO_COLLABORATION_METADATA".to_string(),
            tags_separator: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GenericConfig {
    #[serde(flatten)]
    pub connection: ConnectionConfig,
    /// Name of a type registered in the [`ModelRegistry`](crate::registry::ModelRegistry).
    pub model_class: Option<String>,
    /// Required; executed verbatim.
    pub sql_statement: Option<String>,
}

/// Reads a JSON configuration document.
pub fn load(path: impl AsRef<Path>) -> Result<Value> {
    let text = fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&text)?)
}

/// Returns the subtree for `scope`.
///
/// The scope is looked up as a literal key first, then as a dotted path.
/// A missing subtree is an empty object, i.e. all defaults.
pub fn scoped(doc: &Value, scope: &str) -> Value {
    if let Some(found) = doc.get(scope) {
        return found.clone();
    }
    scope
        .split('.')
        .try_fold(doc, |node, segment| node.get(segment))
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()))
}

/// Deserializes the `scope` subtree of `doc` into a settings struct.
pub fn from_scope<T: DeserializeOwned>(doc: &Value, scope: &str) -> Result<T> {
    serde_json::from_value(scoped(doc, scope))
        .map_err(|e| ExtractError::Config(format!("{scope}: {e}")))
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or number, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn empty_document_gives_defaults() {
        let config: TableColumnConfig = from_scope(&json!({}), "extractor.dremiotablecolumn").unwrap();
        assert_eq!(config, TableColumnConfig::default());
        assert_eq!(config.cluster, "Production");
        assert!(config.exclude_system_tables);
        assert!(!config.exclude_pds_tables);
        assert_eq!(config.tags_separator, None);
        assert_eq!(config.connection.port, "31010");
    }

    #[test]
    fn nested_scope_and_legacy_keys_are_read() {
        let doc = json!({
            "extractor": {
                "dremiotablecolumn": {
                    "host_key": "dremio.internal",
                    "port_key": 31011,
                    "cluster_key": "Staging",
                    "tags_seperator": ",",
                    "exclude_pds_tables": true
                }
            }
        });
        let config: TableColumnConfig = from_scope(&doc, "extractor.dremiotablecolumn").unwrap();
        assert_eq!(config.connection.host, "dremio.internal");
        assert_eq!(config.connection.port, "31011");
        assert_eq!(config.connection.user, "dremio_auth_user");
        assert_eq!(config.cluster, "Staging");
        assert_eq!(config.tags_separator.as_deref(), Some(","));
        assert!(config.exclude_pds_tables);
        assert!(config.exclude_system_tables);
    }

    #[test]
    fn flat_scope_key_takes_precedence() {
        let doc = json!({
            "extractor.dremio": { "sql_statement": "SELECT 1" },
            "extractor": { "dremio": { "sql_statement": "SELECT 2" } }
        });
        let config: GenericConfig = from_scope(&doc, "extractor.dremio").unwrap();
        assert_eq!(config.sql_statement.as_deref(), Some("SELECT 1"));
        assert_eq!(config.model_class, None);
    }

    #[test]
    fn wrong_type_is_a_config_error() {
        let doc = json!({ "extractor.dremio": { "port": [1] } });
        let err = from_scope::<GenericConfig>(&doc, "extractor.dremio").unwrap_err();
        assert!(matches!(err, ExtractError::Config(ref m) if m.starts_with("extractor.dremio")));
    }

    #[test]
    fn debug_hides_password() {
        let rendered = format!("{:?}", ConnectionConfig::default());
        assert!(!rendered.contains("dremio_auth_pw"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn load_reads_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"extractor.dremio": {{"user": "svc"}}}}"#).unwrap();
        let doc = load(file.path()).unwrap();
        let config: GenericConfig = from_scope(&doc, "extractor.dremio").unwrap();
        assert_eq!(config.connection.user, "svc");
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(dir.path().join("absent.json")),
            Err(ExtractError::Io(_))
        ));
    }
}

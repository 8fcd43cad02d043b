//! Runs an arbitrary statement against Dremio and hands back its rows, either
//! as plain column/value maps or built into a registered record type.

use serde_json::Value;
use tracing::{debug, info};

use super::{Extractor, Phase, State};
use crate::config::GenericConfig;
use crate::error::{ExtractError, Result};
use crate::registry::{ModelFactory, ModelRecord, ModelRegistry};
use crate::row::Row;
use crate::source::{Connector, RowStream};

pub const SCOPE: &str = "extractor.dremio";

#[derive(Debug)]
pub enum Extracted {
    Row(Row),
    Model(Box<dyn ModelRecord>),
}

impl Extracted {
    pub fn to_json(&self) -> serde_json::Result<Value> {
        match self {
            Extracted::Row(row) => Ok(Value::Object(row.clone())),
            Extracted::Model(record) => record.to_json(),
        }
    }

    pub fn as_row(&self) -> Option<&Row> {
        match self {
            Extracted::Row(row) => Some(row),
            Extracted::Model(_) => None,
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Extracted::Model(record) => record.downcast_ref::<T>(),
            Extracted::Row(_) => None,
        }
    }
}

pub struct GenericMetadataExtractor<C> {
    connector: C,
    registry: ModelRegistry,
    sql: String,
    model: Option<ModelFactory>,
    phase: Phase<RowStream>,
}

impl<C: Connector> GenericMetadataExtractor<C> {
    /// Extractor resolving `model_class` against the built-in models.
    pub fn new(connector: C) -> Self {
        Self::with_registry(connector, ModelRegistry::with_builtin())
    }

    pub fn with_registry(connector: C, registry: ModelRegistry) -> Self {
        Self {
            connector,
            registry,
            sql: String::new(),
            model: None,
            phase: Phase::Uninitialized,
        }
    }

    pub fn state(&self) -> State {
        self.phase.state()
    }
}

impl<C: Connector> Extractor for GenericMetadataExtractor<C> {
    type Config = GenericConfig;
    type Record = Extracted;

    fn init(&mut self, config: GenericConfig) -> Result<()> {
        let sql = config
            .sql_statement
            .filter(|s| !s.trim().is_empty())
            .ok_or(ExtractError::MissingSetting("sql_statement"))?;
        let model = config
            .model_class
            .as_deref()
            .map(|name| self.registry.resolve(name))
            .transpose()?;

        let conn = self.connector.connect(&config.connection)?;
        self.sql = sql;
        self.model = model;
        self.phase = Phase::Connected(conn);
        Ok(())
    }

    fn extract(&mut self) -> Result<Option<Extracted>> {
        let sql = &self.sql;
        self.phase.start_with(|conn| {
            info!(sql = %sql, "SQL for Dremio metadata");
            conn.execute(sql)
        })?;

        let Some(row) = self.phase.advance::<Row>()? else {
            return Ok(None);
        };
        debug!(columns = row.len(), "extracted row");
        match &self.model {
            Some(factory) => factory(row).map(|record| Some(Extracted::Model(record))),
            None => Ok(Some(Extracted::Row(row))),
        }
    }

    fn scope(&self) -> &'static str {
        SCOPE
    }

    fn close(&mut self) {
        self.phase = Phase::Exhausted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TableOwner;
    use crate::row::row_from;
    use crate::source::StaticConnector;
    use serde_json::json;

    fn owner_rows() -> Vec<Row> {
        ["orders", "customers"]
            .into_iter()
            .map(|table| {
                row_from([
                    ("db_name", json!("DREMIO")),
                    ("schema", json!("sales")),
                    ("cluster", json!("Production")),
                    ("table_name", json!(table)),
                    ("owners", json!("data@x.io")),
                ])
            })
            .collect()
    }

    fn config(sql: &str, model: Option<&str>) -> GenericConfig {
        GenericConfig {
            sql_statement: Some(sql.to_string()),
            model_class: model.map(str::to_string),
            ..GenericConfig::default()
        }
    }

    #[test]
    fn rows_are_returned_as_maps_without_model() {
        let connector = StaticConnector::new(owner_rows());
        let mut extractor = GenericMetadataExtractor::new(connector.clone());
        extractor.init(config("SELECT * FROM owners", None)).unwrap();

        let first = extractor.extract().unwrap().unwrap();
        assert_eq!(first.as_row().unwrap()["table_name"], json!("orders"));
        assert!(extractor.extract().unwrap().is_some());
        assert!(extractor.extract().unwrap().is_none());
        assert!(extractor.extract().unwrap().is_none());
        assert_eq!(connector.log().statements, ["SELECT * FROM owners"]);
    }

    #[test]
    fn rows_are_built_into_registered_model() {
        let mut extractor = GenericMetadataExtractor::new(StaticConnector::new(owner_rows()));
        extractor
            .init(config("SELECT * FROM owners", Some("table_owner")))
            .unwrap();

        let record = extractor.extract().unwrap().unwrap();
        let owner = record.downcast_ref::<TableOwner>().unwrap();
        assert_eq!(owner.table_name, "orders");
        assert_eq!(record.to_json().unwrap()["owners"], json!("data@x.io"));
        assert!(record.as_row().is_none());
    }

    #[test]
    fn missing_statement_fails_init() {
        let mut extractor = GenericMetadataExtractor::new(StaticConnector::default());
        assert!(matches!(
            extractor.init(GenericConfig::default()),
            Err(ExtractError::MissingSetting("sql_statement"))
        ));
        assert!(matches!(
            extractor.init(config("   ", None)),
            Err(ExtractError::MissingSetting("sql_statement"))
        ));
        assert_eq!(extractor.state(), State::Uninitialized);
    }

    #[test]
    fn unknown_model_fails_init_before_connecting() {
        let connector = StaticConnector::default();
        let mut extractor = GenericMetadataExtractor::new(connector.clone());
        assert!(matches!(
            extractor.init(config("SELECT 1", Some("databuilder.models.Missing"))),
            Err(ExtractError::UnknownModel(_))
        ));
        assert!(connector.log().connection_strings.is_empty());
    }

    #[test]
    fn field_mismatch_fails_the_call() {
        let rows = vec![row_from([("db_name", json!("DREMIO"))])];
        let mut extractor = GenericMetadataExtractor::new(StaticConnector::new(rows));
        extractor
            .init(config("SELECT db_name", Some("table_owner")))
            .unwrap();
        assert!(matches!(
            extractor.extract(),
            Err(ExtractError::RowMapping { .. })
        ));
    }

    #[test]
    fn stream_errors_propagate() {
        let connector = StaticConnector::new(owner_rows()).failing_after(1);
        let mut extractor = GenericMetadataExtractor::new(connector);
        extractor.init(config("SELECT 1", None)).unwrap();
        assert!(extractor.extract().unwrap().is_some());
        assert!(extractor.extract().is_err());
    }

    #[test]
    fn scope_is_fixed() {
        let extractor = GenericMetadataExtractor::new(StaticConnector::default());
        assert_eq!(extractor.scope(), "extractor.dremio");
    }
}

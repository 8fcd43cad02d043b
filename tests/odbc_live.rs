//! Tests against a live Dremio instance.
//!
//! Ignored by default; they need the Dremio ODBC driver and a reachable
//! coordinator:
//!
//! ```bash
//! DREMIO_HOST=localhost DREMIO_USER=admin DREMIO_PASSWORD=... \
//!     cargo test --features odbc --test odbc_live -- --ignored
//! ```

#![cfg(feature = "odbc")]

use dremio_extractor::odbc::OdbcConnector;
use dremio_extractor::query::{render, FilterKind, Template};
use dremio_extractor::{
    ConnectionConfig, Extractor, GenericConfig, GenericMetadataExtractor, TableColumnConfig,
    TableColumnExtractor,
};

fn connection() -> ConnectionConfig {
    let mut config = ConnectionConfig::default();
    if let Ok(host) = std::env::var("DREMIO_HOST") {
        config.host = host;
    }
    if let Ok(user) = std::env::var("DREMIO_USER") {
        config.user = user;
    }
    if let Ok(password) = std::env::var("DREMIO_PASSWORD") {
        config.password = password;
    }
    if let Ok(driver) = std::env::var("DREMIO_DRIVER") {
        config.driver = driver;
    }
    config
}

#[test]
#[ignore = "Requires a Dremio instance and ODBC driver"]
fn live_table_columns() {
    let mut extractor = TableColumnExtractor::new(OdbcConnector::new());
    extractor
        .init(TableColumnConfig {
            connection: connection(),
            ..TableColumnConfig::default()
        })
        .expect("init");

    let mut tables = 0;
    while let Some(table) = extractor.extract().expect("extract") {
        assert!(!table.columns.is_empty());
        tables += 1;
    }
    assert!(tables > 0, "INFORMATION_SCHEMA should list at least one table");
}

#[test]
#[ignore = "Requires a Dremio instance and ODBC driver"]
fn live_table_owners() {
    let sql = render(
        Template::TableOwnerInit,
        Some(FilterKind::ExcludeSystemTables.into()),
        &[("cluster", "Production"), ("owners", "data@example.com")],
    )
    .expect("render");

    let mut extractor = GenericMetadataExtractor::new(OdbcConnector::new());
    extractor
        .init(GenericConfig {
            connection: connection(),
            sql_statement: Some(sql),
            model_class: Some("table_owner".to_string()),
        })
        .expect("init");

    let first = extractor.extract().expect("extract");
    assert!(first.is_some());
}

//! Database access seam used by the extractors.
//!
//! A [`Connector`] opens a [`Connection`] from connection settings; a
//! connection runs exactly one statement and turns into the [`RowStream`] of
//! its results. Dropping the stream releases the connection.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::config::ConnectionConfig;
use crate::error::{ExtractError, Result};
use crate::odbc::connection_string;
use crate::row::Row;

pub type RowStream = Box<dyn Iterator<Item = Result<Row>>>;

pub trait Connection {
    /// Executes `sql` and streams its rows in the order the driver returns them.
    fn execute(self: Box<Self>, sql: &str) -> Result<RowStream>;
}

pub trait Connector {
    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>>;
}

/// In-memory connector that replays a fixed result set for every statement.
///
/// Each connection string and statement it sees is recorded, which makes it
/// useful for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticConnector {
    rows: Vec<Row>,
    fail_connect: Option<String>,
    fail_after: Option<usize>,
    log: Arc<Mutex<ConnectorLog>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorLog {
    pub connection_strings: Vec<String>,
    pub statements: Vec<String>,
}

impl StaticConnector {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Every `connect` call fails with `message`.
    pub fn refusing(message: impl Into<String>) -> Self {
        Self {
            fail_connect: Some(message.into()),
            ..Self::default()
        }
    }

    /// The stream yields an error after `rows` rows instead of ending.
    pub fn failing_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }

    pub fn log(&self) -> ConnectorLog {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Connector for StaticConnector {
    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let conn_str = connection_string(config, cfg!(target_os = "linux"));
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .connection_strings
            .push(conn_str);

        if let Some(message) = &self.fail_connect {
            return Err(ExtractError::Connection(message.clone()));
        }

        Ok(Box::new(StaticConnection {
            rows: self.rows.clone(),
            fail_after: self.fail_after,
            log: Arc::clone(&self.log),
        }))
    }
}

struct StaticConnection {
    rows: Vec<Row>,
    fail_after: Option<usize>,
    log: Arc<Mutex<ConnectorLog>>,
}

impl Connection for StaticConnection {
    fn execute(self: Box<Self>, sql: &str) -> Result<RowStream> {
        let StaticConnection {
            rows,
            fail_after,
            log,
        } = *self;
        debug!(rows = rows.len(), "replaying static result set");
        log.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .statements
            .push(sql.to_string());

        let rows = rows.into_iter().map(Ok);
        match fail_after {
            Some(n) => {
                let failure = std::iter::once(Err(ExtractError::Connection(
                    "connection lost while fetching".to_string(),
                )));
                Ok(Box::new(rows.take(n).chain(failure)))
            }
            None => Ok(Box::new(rows)),
        }
    }
}

//! ODBC access to Dremio.
//!
//! Connection-string assembly is always available; the live connector needs
//! the `odbc` feature and a driver manager on the host.

use crate::config::ConnectionConfig;

/// unixODBC expects the driver as a `DRIVER=` attribute, other driver
/// managers take the configured value unchanged.
pub fn driver_string(driver: &str, linux: bool) -> String {
    if linux {
        format!("DRIVER={driver}")
    } else {
        driver.to_string()
    }
}

pub fn connection_string(config: &ConnectionConfig, linux: bool) -> String {
    format!(
        "{};uid={};pwd={};host={};port={}",
        driver_string(&config.driver, linux),
        config.user,
        config.password,
        config.host,
        config.port
    )
}

#[cfg(feature = "odbc")]
pub use live::OdbcConnector;

#[cfg(feature = "odbc")]
mod live {
    use std::collections::VecDeque;
    use std::sync::OnceLock;

    use odbc_api::buffers::TextRowSet;
    use odbc_api::{
        BlockCursor, ConnectionOptions, Cursor, CursorImpl, Environment, ResultSetMetadata,
        StatementConnection,
    };
    use serde_json::Value;
    use tracing::{debug, info};

    use super::connection_string;
    use crate::config::ConnectionConfig;
    use crate::error::{ExtractError, Result};
    use crate::row::Row;
    use crate::source::{Connection, Connector, RowStream};

    static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

    fn environment() -> Result<&'static Environment> {
        if let Some(env) = ENVIRONMENT.get() {
            return Ok(env);
        }
        let env = Environment::new()?;
        // another thread may have set it first
        let _ = ENVIRONMENT.set(env);
        ENVIRONMENT
            .get()
            .ok_or_else(|| ExtractError::Connection("ODBC environment unavailable".to_string()))
    }

    /// Opens connections through the process-wide ODBC environment.
    #[derive(Debug, Clone)]
    pub struct OdbcConnector {
        batch_size: usize,
        max_str_len: usize,
    }

    impl Default for OdbcConnector {
        fn default() -> Self {
            Self {
                batch_size: 1000,
                max_str_len: 4096,
            }
        }
    }

    impl OdbcConnector {
        pub fn new() -> Self {
            Self::default()
        }

        /// Rows fetched per driver round trip.
        pub fn with_batch_size(mut self, batch_size: usize) -> Self {
            self.batch_size = batch_size.max(1);
            self
        }

        /// Upper bound for text columns whose length the driver does not report.
        pub fn with_max_str_len(mut self, max_str_len: usize) -> Self {
            self.max_str_len = max_str_len;
            self
        }
    }

    impl Connector for OdbcConnector {
        fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
            let env = environment()?;
            let conn_str = connection_string(config, cfg!(target_os = "linux"));
            info!(host = %config.host, port = %config.port, "connecting to Dremio");
            let conn = env.connect_with_connection_string(&conn_str, ConnectionOptions::default())?;
            conn.set_autocommit(true)?;
            Ok(Box::new(OdbcConnection {
                conn,
                batch_size: self.batch_size,
                max_str_len: self.max_str_len,
            }))
        }
    }

    struct OdbcConnection {
        conn: odbc_api::Connection<'static>,
        batch_size: usize,
        max_str_len: usize,
    }

    impl Connection for OdbcConnection {
        fn execute(self: Box<Self>, sql: &str) -> Result<RowStream> {
            let OdbcConnection {
                conn,
                batch_size,
                max_str_len,
            } = *self;

            let cursor = conn.into_cursor(sql, ()).map_err(|failure| failure.error)?;
            let Some(mut cursor) = cursor else {
                debug!("statement produced no result set");
                return Ok(Box::new(std::iter::empty()));
            };

            let columns = cursor
                .column_names()?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            let buffer = TextRowSet::for_cursor(batch_size, &mut cursor, Some(max_str_len))?;
            let block = cursor.bind_buffer(buffer)?;

            Ok(Box::new(OdbcRows {
                columns,
                block: Some(block),
                pending: VecDeque::new(),
            }))
        }
    }

    type Block = BlockCursor<CursorImpl<StatementConnection<'static>>, TextRowSet>;

    /// Streams rows batch by batch; the statement and its connection are
    /// released once the last batch is read or the stream is dropped.
    struct OdbcRows {
        columns: Vec<String>,
        block: Option<Block>,
        pending: VecDeque<Row>,
    }

    impl OdbcRows {
        fn fill(&mut self) -> Result<()> {
            let Some(block) = self.block.as_mut() else {
                return Ok(());
            };
            match block.fetch()? {
                Some(batch) => {
                    for row_index in 0..batch.num_rows() {
                        let row: Row = self
                            .columns
                            .iter()
                            .enumerate()
                            .map(|(col_index, name)| {
                                let value = batch
                                    .at(col_index, row_index)
                                    .map(|bytes| Value::String(String::from_utf8_lossy(bytes).into_owned()))
                                    .unwrap_or(Value::Null);
                                (name.clone(), value)
                            })
                            .collect();
                        self.pending.push_back(row);
                    }
                }
                None => self.block = None,
            }
            Ok(())
        }
    }

    impl Iterator for OdbcRows {
        type Item = Result<Row>;

        fn next(&mut self) -> Option<Self::Item> {
            while self.pending.is_empty() && self.block.is_some() {
                if let Err(e) = self.fill() {
                    self.block = None;
                    return Some(Err(e));
                }
            }
            self.pending.pop_front().map(Ok)
        }
    }
}

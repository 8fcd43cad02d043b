//! Table and column metadata from Dremio's `INFORMATION_SCHEMA`, joined with
//! the collaboration (wiki/tag) metadata table.
//!
//! One result row per column; consecutive rows of the same table are folded
//! into a single [`TableMetadata`].

use tracing::{debug, info};

use super::{Extractor, Phase, State};
use crate::config::TableColumnConfig;
use crate::error::{ExtractError, Result};
use crate::model::{ColumnMetadata, TableKey, TableMetadata};
use crate::query::format_placeholders;
use crate::row::{self, Row};
use crate::source::{Connector, RowStream};

pub const SCOPE: &str = "extractor.dremiotablecolumn";

const SQL_STATEMENT: &str = r#"
    SELECT
      nested_1.COLUMN_NAME AS col_name,
      CAST(NULL AS VARCHAR) AS col_description,
      nested_1.DATA_TYPE AS col_type,
      nested_1.ORDINAL_POSITION AS col_sort_order,
      nested_1.TABLE_CATALOG AS database,
      '{cluster}' AS cluster,
      nested_1.TABLE_SCHEMA AS schema,
      nested_1.TABLE_NAME AS name,
      CASE WHEN nested_2.WIKI IS NULL THEN '' ELSE nested_2.WIKI END AS description,
      nested_0.TABLE_TYPE AS table_type,
      CASE WHEN nested_2.TAGS IS NULL THEN '' ELSE nested_2.TAGS END AS tags
    FROM (
      SELECT TABLE_CATALOG, TABLE_SCHEMA, TABLE_NAME, TABLE_TYPE
      FROM INFORMATION_SCHEMA."TABLES"
    ) nested_0
    RIGHT JOIN (
      SELECT TABLE_CATALOG, TABLE_SCHEMA, TABLE_NAME, COLUMN_NAME, DATA_TYPE, ORDINAL_POSITION
      FROM INFORMATION_SCHEMA."COLUMNS"
    ) nested_1 ON nested_0.TABLE_NAME = nested_1.TABLE_NAME
      AND nested_0.TABLE_SCHEMA = nested_1.TABLE_SCHEMA
      AND nested_0.TABLE_CATALOG = nested_1.TABLE_CATALOG
    LEFT JOIN (
      SELECT TABLE_CATALOG, TABLE_SCHEMA, TABLE_NAME, WIKI, TAGS
      FROM {collaboration_metadata_table}
    ) nested_2 ON nested_0.TABLE_NAME = nested_2.TABLE_NAME
      AND nested_0.TABLE_SCHEMA = nested_2.TABLE_SCHEMA
      AND nested_0.TABLE_CATALOG = nested_2.TABLE_CATALOG
    {where_stmt};
    "#;

const VIEW_TABLE_TYPE: &str = "VIEW";

/// WHERE clause for the two exclusion switches.
pub fn where_clause(exclude_system_tables: bool, exclude_pds_tables: bool) -> &'static str {
    match (exclude_system_tables, exclude_pds_tables) {
        (true, true) => {
            "WHERE nested_0.TABLE_TYPE != 'SYSTEM_TABLE' AND nested_0.TABLE_TYPE != 'TABLE'"
        }
        (true, false) => "WHERE nested_0.TABLE_TYPE != 'SYSTEM_TABLE'",
        (false, true) => "WHERE nested_0.TABLE_TYPE != 'TABLE'",
        (false, false) => "",
    }
}

pub fn build_statement(config: &TableColumnConfig) -> Result<String> {
    let sql = format_placeholders(
        SQL_STATEMENT,
        &[
            ("cluster", config.cluster.as_str()),
            (
                "collaboration_metadata_table",
                config.collaboration_metadata_table.as_str(),
            ),
            (
                "where_stmt",
                where_clause(config.exclude_system_tables, config.exclude_pds_tables),
            ),
        ],
    )?;
    Ok(sql)
}

fn table_key(row: &Row) -> Result<TableKey> {
    Ok(TableKey {
        schema: row::text(row, "schema")?,
        table_name: row::text(row, "name")?,
    })
}

fn column_from(row: &Row) -> Result<ColumnMetadata> {
    Ok(ColumnMetadata {
        name: row::text(row, "col_name")?,
        description: row::nullable_text(row, "col_description")?,
        col_type: row::text(row, "col_type")?,
        sort_order: row::integer(row, "col_sort_order")?,
    })
}

fn split_tags(tags: &str, separator: Option<&str>) -> Option<Vec<String>> {
    if tags.is_empty() {
        return None;
    }
    Some(match separator {
        Some(sep) => tags.split(sep).map(str::to_string).collect(),
        None => vec![tags.to_string()],
    })
}

fn table_from(
    row: &Row,
    columns: Vec<ColumnMetadata>,
    tags_separator: Option<&str>,
) -> Result<TableMetadata> {
    let table_type = row::nullable_text(row, "table_type")?;
    let tags = row::nullable_text(row, "tags")?.unwrap_or_default();

    Ok(TableMetadata {
        database: row::text(row, "database")?,
        cluster: row::text(row, "cluster")?,
        schema: row::text(row, "schema")?,
        name: row::text(row, "name")?,
        description: row::nullable_text(row, "description")?.unwrap_or_default(),
        columns,
        is_view: table_type.as_deref() == Some(VIEW_TABLE_TYPE),
        tags: split_tags(&tags, tags_separator),
    })
}

/// Folds runs of rows sharing `(schema, name)` into one table each.
///
/// Only adjacent rows are merged: a table whose rows are interleaved with
/// another table's comes out as several records. Scalar fields are taken from
/// the last row of each run, columns keep arrival order.
pub struct TableGroups<I> {
    rows: I,
    pending: Option<Row>,
    tags_separator: Option<String>,
}

impl<I> TableGroups<I>
where
    I: Iterator<Item = Result<Row>>,
{
    pub fn new(rows: I, tags_separator: Option<String>) -> Self {
        Self {
            rows,
            pending: None,
            tags_separator,
        }
    }

    fn group_from(&mut self, first: Row) -> Result<TableMetadata> {
        let key = table_key(&first)?;
        let mut columns = vec![column_from(&first)?];
        let mut last = first;

        for next in self.rows.by_ref() {
            let row = next?;
            if table_key(&row)? != key {
                self.pending = Some(row);
                break;
            }
            columns.push(column_from(&row)?);
            last = row;
        }

        table_from(&last, columns, self.tags_separator.as_deref())
    }
}

impl<I> Iterator for TableGroups<I>
where
    I: Iterator<Item = Result<Row>>,
{
    type Item = Result<TableMetadata>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = match self.pending.take() {
            Some(row) => row,
            None => match self.rows.next()? {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            },
        };
        Some(self.group_from(first))
    }
}

pub struct TableColumnExtractor<C> {
    connector: C,
    sql: String,
    tags_separator: Option<String>,
    phase: Phase<TableGroups<RowStream>>,
}

impl<C: Connector> TableColumnExtractor<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            sql: String::new(),
            tags_separator: None,
            phase: Phase::Uninitialized,
        }
    }

    pub fn state(&self) -> State {
        self.phase.state()
    }

    /// Statement built by `init`; empty before that.
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl<C: Connector> Extractor for TableColumnExtractor<C> {
    type Config = TableColumnConfig;
    type Record = TableMetadata;

    fn init(&mut self, config: TableColumnConfig) -> Result<()> {
        if config.tags_separator.as_deref() == Some("") {
            return Err(ExtractError::Config(
                "tags_separator must not be empty".to_string(),
            ));
        }

        let sql = build_statement(&config)?;
        info!(sql = %sql, "SQL for Dremio metadata");

        let conn = self.connector.connect(&config.connection)?;
        self.sql = sql;
        self.tags_separator = config.tags_separator;
        self.phase = Phase::Connected(conn);
        Ok(())
    }

    fn extract(&mut self) -> Result<Option<TableMetadata>> {
        let sql = &self.sql;
        let tags_separator = &self.tags_separator;
        self.phase.start_with(|conn| {
            debug!("executing table/column query");
            Ok(TableGroups::new(conn.execute(sql)?, tags_separator.clone()))
        })?;

        let table = self.phase.advance()?;
        if let Some(table) = &table {
            debug!(
                schema = %table.schema,
                table = %table.name,
                columns = table.columns.len(),
                "extracted table"
            );
        }
        Ok(table)
    }

    fn scope(&self) -> &'static str {
        SCOPE
    }

    fn close(&mut self) {
        if !matches!(self.phase, Phase::Exhausted) {
            debug!("closing Dremio connection");
        }
        self.phase = Phase::Exhausted;
    }
}

//! SQL statement builder for Dremio `INFORMATION_SCHEMA` queries.
//!
//! Statements are produced by plain placeholder substitution. Values are
//! inserted verbatim: nothing is quoted or escaped, so callers must only pass
//! trusted literals. All rendering goes through [`StatementRenderer`] so a
//! parameterizing implementation can replace [`FormatRenderer`] without
//! touching call sites.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown statement template `{0}`")]
    UnknownTemplate(String),

    #[error("unknown filter kind `{0}`")]
    UnknownFilter(String),

    #[error("no substitution given for placeholder `{{{0}}}`")]
    MissingSubstitution(String),

    #[error("unterminated placeholder at byte {0}")]
    UnterminatedPlaceholder(usize),
}

const TABLE_OWNER_INIT_STMT: &str = r#"
    SELECT
      TABLE_CATALOG AS db_name,
      TABLE_SCHEMA AS schema,
      '{cluster}' as cluster,
      TABLE_NAME AS table_name,
      '{owners}' AS owners
    FROM INFORMATION_SCHEMA."TABLES"
    {where_stmt};
    "#;

const APPLICATION_CONTEXT_INIT_STMT: &str = r#"
    SELECT
      '{task_id}' as task_id,
      '{dag_id}' as dag_id,
      '{exec_date}' as exec_date,
      '{application_url_template}' as application_url_template,
      TABLE_CATALOG AS db_name,
      '{cluster}' as cluster,
      TABLE_SCHEMA AS schema,
      TABLE_NAME AS table_name
    FROM INFORMATION_SCHEMA."TABLES"
    {where_stmt};
    "#;

const NOT_PDS_EXPR: &str = "{prefix}TABLE_TYPE != 'TABLE'";
const NOT_SYS_EXPR: &str = "{prefix}TABLE_TYPE != 'SYSTEM_TABLE'";

/// Statement templates known to the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Catalog, schema and table plus literal cluster and owners columns.
    TableOwnerInit,
    /// Table identity plus literal task/dag/execution fields for lineage tagging.
    ApplicationContextInit,
}

impl Template {
    pub fn id(self) -> &'static str {
        match self {
            Template::TableOwnerInit => "table-owner-init",
            Template::ApplicationContextInit => "application-context-init",
        }
    }

    fn text(self) -> &'static str {
        match self {
            Template::TableOwnerInit => TABLE_OWNER_INIT_STMT,
            Template::ApplicationContextInit => APPLICATION_CONTEXT_INIT_STMT,
        }
    }
}

impl FromStr for Template {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table-owner-init" => Ok(Template::TableOwnerInit),
            "application-context-init" => Ok(Template::ApplicationContextInit),
            other => Err(QueryError::UnknownTemplate(other.to_string())),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Row filter applied through the `TABLE_TYPE` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterKind {
    ExcludePhysicalTables,
    ExcludeSystemTables,
    ExcludePhysicalAndSystem,
    #[default]
    IncludeAll,
}

impl FilterKind {
    pub fn id(self) -> &'static str {
        match self {
            FilterKind::ExcludePhysicalTables => "exclude-physical-tables",
            FilterKind::ExcludeSystemTables => "exclude-system-tables",
            FilterKind::ExcludePhysicalAndSystem => "exclude-physical-and-system",
            FilterKind::IncludeAll => "include-all",
        }
    }

    /// WHERE clause with `{prefix}` still unresolved.
    fn clause_template(self) -> String {
        match self {
            FilterKind::ExcludePhysicalTables => format!("WHERE {NOT_PDS_EXPR}"),
            FilterKind::ExcludeSystemTables => format!("WHERE {NOT_SYS_EXPR}"),
            FilterKind::ExcludePhysicalAndSystem => {
                format!("WHERE {NOT_PDS_EXPR} and {NOT_SYS_EXPR}")
            }
            FilterKind::IncludeAll => String::new(),
        }
    }
}

impl FromStr for FilterKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exclude-physical-tables" => Ok(FilterKind::ExcludePhysicalTables),
            "exclude-system-tables" => Ok(FilterKind::ExcludeSystemTables),
            "exclude-physical-and-system" => Ok(FilterKind::ExcludePhysicalAndSystem),
            "include-all" => Ok(FilterKind::IncludeAll),
            other => Err(QueryError::UnknownFilter(other.to_string())),
        }
    }
}

/// A filter kind together with the table alias its column is qualified with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub prefix: String,
}

impl FilterSpec {
    pub fn new(kind: FilterKind, prefix: impl Into<String>) -> Self {
        Self {
            kind,
            prefix: prefix.into(),
        }
    }

    /// Rendered WHERE clause; empty for [`FilterKind::IncludeAll`].
    pub fn clause(&self) -> String {
        let prefix = if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}.", self.prefix)
        };
        self.kind.clause_template().replace("{prefix}", &prefix)
    }
}

impl From<FilterKind> for FilterSpec {
    fn from(kind: FilterKind) -> Self {
        FilterSpec::new(kind, "")
    }
}

impl<P: Into<String>> From<(FilterKind, P)> for FilterSpec {
    fn from((kind, prefix): (FilterKind, P)) -> Self {
        FilterSpec::new(kind, prefix)
    }
}

/// Turns a template plus values into executable SQL text.
pub trait StatementRenderer {
    fn render(
        &self,
        template: Template,
        filter: Option<FilterSpec>,
        substitutions: &[(&str, &str)],
    ) -> Result<String, QueryError>;
}

/// Renders by direct text substitution, with no quoting of values.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatRenderer;

impl StatementRenderer for FormatRenderer {
    fn render(
        &self,
        template: Template,
        filter: Option<FilterSpec>,
        substitutions: &[(&str, &str)],
    ) -> Result<String, QueryError> {
        let where_stmt = filter.unwrap_or_default().clause();
        let mut values: Vec<(&str, &str)> = substitutions.to_vec();
        values.push(("where_stmt", where_stmt.as_str()));
        format_placeholders(template.text(), &values)
    }
}

/// Convenience wrapper around [`FormatRenderer`].
pub fn render(
    template: Template,
    filter: Option<FilterSpec>,
    substitutions: &[(&str, &str)],
) -> Result<String, QueryError> {
    FormatRenderer.render(template, filter, substitutions)
}

/// Replaces every `{name}` in `text` with its value from `values`.
///
/// Braces that do not enclose an identifier are copied through untouched.
/// When a name appears more than once in `values` the last entry wins.
pub fn format_placeholders(text: &str, values: &[(&str, &str)]) -> Result<String, QueryError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut offset = 0;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or(QueryError::UnterminatedPlaceholder(offset + open))?;
        let name = &after[..close];

        if is_identifier(name) {
            let value = values
                .iter()
                .rev()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| QueryError::MissingSubstitution(name.to_string()))?;
            out.push_str(value);
        } else {
            out.push('{');
            out.push_str(name);
            out.push('}');
        }

        let consumed = open + 1 + close + 1;
        offset += consumed;
        rest = &rest[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

use serde::{Deserialize, Serialize};

/// Identity of a table within one extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableKey {
    pub schema: String,
    pub table_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub description: Option<String>,
    pub col_type: String,
    pub sort_order: i64,
}

/// A table or view with its columns, as handed to the catalog loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMetadata {
    pub database: String,
    pub cluster: String,
    pub schema: String,
    pub name: String,
    pub description: String,
    /// Never empty: every table is discovered through its columns.
    pub columns: Vec<ColumnMetadata>,
    pub is_view: bool,
    pub tags: Option<Vec<String>>,
}

impl TableMetadata {
    pub fn key(&self) -> TableKey {
        TableKey {
            schema: self.schema.clone(),
            table_name: self.name.clone(),
        }
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Row shape of the `table-owner-init` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableOwner {
    pub db_name: String,
    pub schema: String,
    pub cluster: String,
    pub table_name: String,
    pub owners: String,
}

impl TableOwner {
    /// Owners column split on commas, blanks dropped.
    pub fn owner_list(&self) -> Vec<&str> {
        self.owners
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .collect()
    }
}

/// Row shape of the `application-context-init` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Application {
    pub task_id: String,
    pub dag_id: String,
    pub exec_date: String,
    pub application_url_template: String,
    pub db_name: String,
    pub cluster: String,
    pub schema: String,
    pub table_name: String,
}

impl Application {
    /// Expands `{dag_id}`, `{task_id}` and `{exec_date}` in the URL template.
    pub fn application_url(&self) -> String {
        self.application_url_template
            .replace("{dag_id}", &self.dag_id)
            .replace("{task_id}", &self.task_id)
            .replace("{exec_date}", &self.exec_date)
    }
}

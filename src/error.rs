use thiserror::Error;

use crate::query::QueryError;

pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("missing required setting `{0}`")]
    MissingSetting(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("model class `{0}` is not registered")]
    UnknownModel(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("extractor used before init()")]
    NotInitialized,

    #[error("result row has no column `{0}`")]
    MissingColumn(String),

    #[error("column `{column}` has unexpected value {value}")]
    InvalidValue {
        column: String,
        value: serde_json::Value,
    },

    #[error("cannot build `{model}` from row: {source}")]
    RowMapping {
        model: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("connection failed: {0}")]
    Connection(String),

    #[cfg(feature = "odbc")]
    #[error("ODBC driver error: {0}")]
    Odbc(#[from] odbc_api::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

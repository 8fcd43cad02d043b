pub mod config;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod model;
pub mod odbc;
pub mod query;
pub mod registry;
pub mod row;
pub mod source;

pub use config::{ConnectionConfig, GenericConfig, TableColumnConfig};
pub use error::{ExtractError, Result};
pub use extractor::{
    drain, Extracted, ExtractionStats, Extractor, GenericMetadataExtractor, State,
    TableColumnExtractor,
};
pub use model::{ColumnMetadata, TableKey, TableMetadata};
pub use registry::ModelRegistry;
pub use source::{Connection, Connector, StaticConnector};

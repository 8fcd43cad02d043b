//! Named record types the generic extractor can build rows into.
//!
//! Callers register a type under a name once, then refer to it by that name
//! in configuration (`model_class`).

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ExtractError, Result};
use crate::model::{Application, TableOwner};
use crate::row::Row;

/// A typed record produced from a result row.
pub trait ModelRecord: fmt::Debug {
    fn to_json(&self) -> serde_json::Result<Value>;
    fn as_any(&self) -> &dyn Any;
}

impl<T> ModelRecord for T
where
    T: Serialize + fmt::Debug + Any,
{
    fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn ModelRecord {
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

pub type ModelFactory = Arc<dyn Fn(Row) -> Result<Box<dyn ModelRecord>> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ModelRegistry {
    factories: HashMap<String, ModelFactory>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with [`TableOwner`] as `table_owner` and [`Application`] as
    /// `application`.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register::<TableOwner>("table_owner");
        registry.register::<Application>("application");
        registry
    }

    /// Registers `T`, built by deserializing the row's columns as its fields.
    pub fn register<T>(&mut self, name: &str) -> &mut Self
    where
        T: DeserializeOwned + Serialize + fmt::Debug + Any,
    {
        let model = name.to_string();
        self.register_fn(name, move |row: Row| {
            serde_json::from_value::<T>(Value::Object(row))
                .map(|record| Box::new(record) as Box<dyn ModelRecord>)
                .map_err(|source| ExtractError::RowMapping {
                    model: model.clone(),
                    source,
                })
        })
    }

    pub fn register_fn<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(Row) -> Result<Box<dyn ModelRecord>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
        self
    }

    pub fn resolve(&self, name: &str) -> Result<ModelFactory> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| ExtractError::UnknownModel(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.names())
            .finish()
    }
}

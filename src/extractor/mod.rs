//! Pull-based extractors: `init` once, then `extract` until it yields `None`.

pub mod generic;
pub mod table_column;

use std::time::Instant;

use tracing::info;

use crate::error::{ExtractError, Result};
use crate::source::Connection;

pub use generic::{Extracted, GenericMetadataExtractor};
pub use table_column::{TableColumnExtractor, TableGroups};

pub trait Extractor {
    type Config;
    type Record;

    /// Resolves settings and opens the connection. Nothing is queried yet.
    fn init(&mut self, config: Self::Config) -> Result<()>;

    /// Next record, or `None` once the source is exhausted. Repeated calls
    /// after exhaustion keep returning `None`.
    fn extract(&mut self) -> Result<Option<Self::Record>>;

    /// Configuration namespace of this extractor.
    fn scope(&self) -> &'static str;

    /// Releases the connection and any open result set.
    fn close(&mut self);
}

/// Lifecycle of an extractor, as reported by its `state()` accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Connected,
    Streaming,
    Exhausted,
}

pub(crate) enum Phase<S> {
    Uninitialized,
    Connected(Box<dyn Connection>),
    Streaming(S),
    Exhausted,
}

impl<S> Phase<S> {
    pub(crate) fn state(&self) -> State {
        match self {
            Phase::Uninitialized => State::Uninitialized,
            Phase::Connected(_) => State::Connected,
            Phase::Streaming(_) => State::Streaming,
            Phase::Exhausted => State::Exhausted,
        }
    }

    /// Runs the query on the held connection the first time it is called.
    /// A failed query leaves the extractor exhausted.
    pub(crate) fn start_with<F>(&mut self, execute: F) -> Result<()>
    where
        F: FnOnce(Box<dyn Connection>) -> Result<S>,
    {
        match std::mem::replace(self, Phase::Exhausted) {
            Phase::Connected(conn) => {
                *self = Phase::Streaming(execute(conn)?);
                Ok(())
            }
            other => {
                *self = other;
                Ok(())
            }
        }
    }

    /// Next item of the running stream. A stream error is fatal: the stream
    /// is dropped and later calls return `None`.
    pub(crate) fn advance<T>(&mut self) -> Result<Option<T>>
    where
        S: Iterator<Item = Result<T>>,
    {
        match self {
            Phase::Uninitialized => Err(ExtractError::NotInitialized),
            Phase::Connected(_) | Phase::Exhausted => Ok(None),
            Phase::Streaming(stream) => match stream.next() {
                Some(Ok(item)) => Ok(Some(item)),
                Some(Err(e)) => {
                    *self = Phase::Exhausted;
                    Err(e)
                }
                None => {
                    *self = Phase::Exhausted;
                    Ok(None)
                }
            },
        }
    }
}

pub struct ExtractionStats {
    pub records_extracted: usize,
    pub duration_secs: f64,
}

/// Pulls every record out of an initialized extractor into `sink`, then
/// closes it.
pub fn drain<E, F>(extractor: &mut E, mut sink: F) -> Result<ExtractionStats>
where
    E: Extractor,
    F: FnMut(E::Record) -> Result<()>,
{
    let start = Instant::now();
    let mut records = 0usize;

    let outcome = loop {
        match extractor.extract() {
            Ok(Some(record)) => {
                if let Err(e) = sink(record) {
                    break Err(e);
                }
                records += 1;
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    extractor.close();
    outcome?;

    let duration_secs = start.elapsed().as_secs_f64();
    info!(
        scope = extractor.scope(),
        records = %format_number(records as i64),
        duration = %format_duration(duration_secs),
        "extraction complete"
    );
    Ok(ExtractionStats {
        records_extracted: records,
        duration_secs,
    })
}

pub fn format_number(n: i64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() / 3));
    let chars: Vec<char> = s.chars().collect();

    for (i, ch) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 && chars[i - 1] != '-' {
            result.push(',');
        }
        result.push(*ch);
    }

    result
}

pub fn format_duration(secs: f64) -> String {
    let total_secs = secs as u64;
    let mins = total_secs / 60;
    let remaining_secs = total_secs % 60;

    if mins > 0 {
        format!("{}m {}s", mins, remaining_secs)
    } else {
        format!("{:.1}s", secs)
    }
}

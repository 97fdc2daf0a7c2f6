use crate::application::signal::{Signal, SignalRecord};
use crate::error::{EngineError, Result};
use std::io::Read;

/// Reads a script of shopper signals from a CSV source.
///
/// Expects a `signal,value` header. Whitespace is trimmed and the `value`
/// column may be left out entirely.
pub struct SignalReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> SignalReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and parses signals, one result per row.
    pub fn signals(self) -> impl Iterator<Item = Result<Signal>> {
        self.reader
            .into_deserialize::<SignalRecord>()
            .map(|result| result.map_err(EngineError::from).and_then(Signal::try_from))
    }
}

//! Flat string-map surface a propagator reads and writes.
//!
//! Carriers decouple the wire format (which header names a propagator uses)
//! from the storage behind them (message headers, raw transport headers, a
//! plain map in tests). Writes are fallible so extract-only adapters can
//! reject them instead of silently desynchronizing from their backing store.

use std::collections::HashMap;
use thiserror::Error;

/// Error raised when a carrier cannot honor an operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CarrierError {
    /// The carrier is an extract-only view; writing through it would not
    /// reach the underlying transport headers.
    #[error("carrier is read-only: {0}")]
    ReadOnly(&'static str),
}

/// Key-value surface for trace-context inject and extract.
pub trait HeaderCarrier {
    fn get(&self, key: &str) -> Option<&str>;

    fn set(&mut self, key: &str, value: String) -> Result<(), CarrierError>;

    fn keys(&self) -> Vec<&str>;
}

impl HeaderCarrier for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        self.get(key).map(|s| s.as_str())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), CarrierError> {
        self.insert(key.to_string(), value);
        Ok(())
    }

    fn keys(&self) -> Vec<&str> {
        self.keys().map(|s| s.as_str()).collect()
    }
}

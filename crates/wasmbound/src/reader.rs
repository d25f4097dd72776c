use std::any::Any;
use std::panic;

use thiserror::Error;
use wasmbound_core::{DecodeError, Module};

/// Why [`read_binary`] produced no module.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The decoder panicked; the panic was contained here.
    #[error("decoder fault: {0}")]
    Fault(String),
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Decodes a binary module without semantic validation.
///
/// Malformed or truncated input returns `Err`; nothing unwinds out of this
/// function. A partially decoded module is dropped before returning.
pub fn read_binary(bytes: &[u8]) -> Result<Module, ReadError> {
    match panic::catch_unwind(|| Module::read(bytes, false)) {
        Ok(result) => Ok(result?),
        Err(payload) => Err(ReadError::Fault(panic_message(payload.as_ref()))),
    }
}

//! wasmbound-core: the module engine behind `wasmbound`.
//!
//! Provides an owned WebAssembly [`Module`] with a syntax-checking decoder and
//! an exact encoder, feature-set-aware validation, deterministic fuzz
//! synthesis, and a small set of named transformation passes.
//!
//! Decoding, validation, text printing and fuzz generation are delegated to
//! the `wasmparser`, `wasmprinter`, `wasm-encoder` and `wasm-smith` crates.

mod decode;
mod encode;
pub mod error;
pub mod features;
pub mod fuzz;
pub mod module;
pub mod passes;
pub mod validate;

pub use encode::WriteOutput;
pub use error::{DecodeError, ValidationError};
pub use features::{FeatureSet, UnknownFeature};
pub use fuzz::TranslateToFuzzReader;
pub use module::{Function, Instr, InstrKind, Module, Section};
pub use passes::{
    default_pipeline, global_pass_options, set_global_pass_options, OptimizationPass, PassOptions,
    PassRunner, UnknownPass,
};
pub use validate::{validate, validate_with_diagnostics};

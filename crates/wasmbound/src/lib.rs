//! wasmbound: a narrow boundary layer over the `wasmbound-core` module engine.
//!
//! Four operations are exposed, each turning engine failure modes into values
//! a caller on the other side of a language boundary can handle:
//!
//! - [`translate_to_fuzz`] synthesizes a valid module from arbitrary bytes,
//!   constrained to a feature set, and never fails.
//! - [`read_binary`] decodes a binary without validating it; every decoder
//!   fault, including a panic, becomes an `Err`.
//! - [`run_passes`] runs named passes (or the default pipeline) with
//!   call-scoped options, and [`validate_full`] validates against every known
//!   feature without disturbing the module's own feature set.
//! - [`allocate_and_write`] produces owned output buffers released by
//!   [`AllocateAndWriteResult::dispose`].
//!
//! The same operations are available to C callers through [`ffi`].

pub mod ffi;
mod reader;
mod runner;
mod translate;
mod write;

pub use reader::{read_binary, ReadError};
pub use runner::{run_passes, validate_full, FeatureOverride, PassSettings};
pub use translate::{translate_to_fuzz, translate_to_fuzz_mvp};
pub use write::{allocate_and_write, AllocateAndWriteResult};

pub use wasmbound_core::{FeatureSet, Module, OptimizationPass};

//! C ABI surface.
//!
//! Modules cross the boundary as opaque heap handles created by this module
//! and released with [`wasmbound_module_dispose`]. No panic unwinds into the
//! caller: functions with a natural failure value return it (null, `false`),
//! and `void` functions abort the process instead.
//!
//! Calls on distinct module handles may run concurrently. Calls on the same
//! handle must be serialized by the caller.

use std::cell::RefCell;
use std::ffi::{c_char, c_int, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::{process, ptr, slice};

use wasmbound_core::{FeatureSet, Module, OptimizationPass};

use crate::reader::panic_message;
pub use crate::write::RawAllocateAndWriteResult as WasmboundAllocateAndWriteResult;
use crate::write::AllocateAndWriteResult;
use crate::{allocate_and_write, read_binary, run_passes, translate_to_fuzz, validate_full, PassSettings};

pub type WasmboundModuleRef = *mut Module;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(message: String) {
    let message = CString::new(message.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// # Safety
/// `data` must be valid for `len` bytes, or `len` must be zero.
unsafe fn input<'a>(data: *const u8, len: usize) -> &'a [u8] {
    if data.is_null() || len == 0 {
        &[]
    } else {
        // SAFETY: guaranteed by the caller.
        unsafe { slice::from_raw_parts(data, len) }
    }
}

fn into_handle(module: Module) -> WasmboundModuleRef {
    Box::into_raw(Box::new(module))
}

fn level(value: c_int) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

/// Creates an empty module.
#[no_mangle]
pub extern "C" fn wasmbound_module_create() -> WasmboundModuleRef {
    into_handle(Module::new())
}

/// Releases a module handle. Null is ignored.
///
/// # Safety
/// `module` must be null or a live handle from this library, released once.
#[no_mangle]
pub unsafe extern "C" fn wasmbound_module_dispose(module: WasmboundModuleRef) {
    if !module.is_null() {
        // SAFETY: live handle created by `into_handle`.
        drop(unsafe { Box::from_raw(module) });
    }
}

/// Synthesizes a valid module from `len` bytes at `data`, using only the
/// features in `features` (a [`FeatureSet`] bit mask; unknown bits are
/// ignored).
///
/// Returns null only if the engine faults, which is a defect.
///
/// # Safety
/// `data` must be valid for `len` bytes, or `len` must be zero.
#[no_mangle]
pub unsafe extern "C" fn wasmbound_translate_to_fuzz(
    data: *const u8,
    len: usize,
    features: u32,
) -> WasmboundModuleRef {
    let bytes = unsafe { input(data, len) };
    let features = FeatureSet::from_bits_truncate(features);
    match panic::catch_unwind(|| translate_to_fuzz(bytes, features)) {
        Ok(module) => into_handle(module),
        Err(payload) => {
            set_last_error(panic_message(payload.as_ref()));
            ptr::null_mut()
        }
    }
}

/// Decodes a binary module without validating it.
///
/// Returns null on any decode failure; [`wasmbound_last_error`] then
/// describes it.
///
/// # Safety
/// `data` must be valid for `len` bytes, or `len` must be zero.
#[no_mangle]
pub unsafe extern "C" fn wasmbound_module_safe_read(data: *const u8, len: usize) -> WasmboundModuleRef {
    let bytes = unsafe { input(data, len) };
    match read_binary(bytes) {
        Ok(module) => {
            clear_last_error();
            into_handle(module)
        }
        Err(err) => {
            set_last_error(err.to_string());
            ptr::null_mut()
        }
    }
}

/// Message describing the last failure on this thread, or null.
///
/// The pointer stays valid until the next `wasmbound_module_safe_read` or
/// other failing call on the same thread.
#[no_mangle]
pub extern "C" fn wasmbound_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(ptr::null(), |message| message.as_ptr())
    })
}

/// Runs `num_passes` named passes in order, or the default optimization
/// pipeline when `pass_names` is null.
///
/// An unknown pass name is a caller error and aborts the process.
///
/// # Safety
/// `module` must be a live handle not used concurrently elsewhere.
/// `pass_names` must be null or point to `num_passes` NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn wasmbound_module_run_passes(
    module: WasmboundModuleRef,
    pass_names: *const *const c_char,
    num_passes: u32,
    shrink_level: c_int,
    optimize_level: c_int,
    debug_info: c_int,
) {
    // SAFETY: guaranteed by the caller.
    let module = unsafe { &mut *module };
    let passes = if pass_names.is_null() {
        None
    } else {
        // SAFETY: guaranteed by the caller.
        let names = unsafe { slice::from_raw_parts(pass_names, num_passes as usize) };
        let mut passes = Vec::with_capacity(names.len());
        for &name in names {
            // SAFETY: guaranteed by the caller.
            let name = unsafe { CStr::from_ptr(name) }.to_string_lossy();
            match name.parse::<OptimizationPass>() {
                Ok(pass) => passes.push(pass),
                Err(err) => {
                    log::error!("{err}");
                    process::abort();
                }
            }
        }
        Some(passes)
    };
    let settings = PassSettings {
        shrink_level: level(shrink_level),
        optimize_level: level(optimize_level),
        debug_info: debug_info != 0,
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        run_passes(module, passes.as_deref(), settings)
    }));
    if let Err(payload) = outcome {
        log::error!("pass execution panicked: {}", panic_message(payload.as_ref()));
        process::abort();
    }
}

/// Validates the module with every known feature enabled. The module's own
/// feature set is unchanged afterwards.
///
/// # Safety
/// `module` must be a live handle not used concurrently elsewhere.
#[no_mangle]
pub unsafe extern "C" fn wasmbound_module_validate_full(module: WasmboundModuleRef) -> bool {
    // SAFETY: guaranteed by the caller.
    let module = unsafe { &mut *module };
    panic::catch_unwind(AssertUnwindSafe(|| validate_full(module))).unwrap_or(false)
}

/// Encodes the module. When `source_map_url` is non-null a source map is
/// produced as well.
///
/// Release the result exactly once with
/// [`wasmbound_dispose_allocate_and_write_result`].
///
/// # Safety
/// `module` must be a live handle. `source_map_url` must be null or a
/// NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn wasmbound_module_allocate_and_write(
    module: WasmboundModuleRef,
    source_map_url: *const c_char,
) -> WasmboundAllocateAndWriteResult {
    // SAFETY: guaranteed by the caller.
    let module = unsafe { &*module };
    let url = (!source_map_url.is_null())
        // SAFETY: guaranteed by the caller.
        .then(|| unsafe { CStr::from_ptr(source_map_url) }.to_string_lossy().into_owned());

    match panic::catch_unwind(|| allocate_and_write(module, url.as_deref())) {
        Ok(result) => result.into_raw(),
        Err(payload) => {
            set_last_error(panic_message(payload.as_ref()));
            WasmboundAllocateAndWriteResult {
                binary: ptr::null_mut(),
                binary_bytes: 0,
                source_map: ptr::null_mut(),
            }
        }
    }
}

/// Releases the buffers of a write result. Null buffers are skipped.
///
/// # Safety
/// `result` must come from [`wasmbound_module_allocate_and_write`] and must
/// be released only once.
#[no_mangle]
pub unsafe extern "C" fn wasmbound_dispose_allocate_and_write_result(
    result: WasmboundAllocateAndWriteResult,
) {
    // SAFETY: guaranteed by the caller.
    unsafe { AllocateAndWriteResult::from_raw(result) }.dispose();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_read_sets_last_error() {
        let bad = [0u8];
        let handle = unsafe { wasmbound_module_safe_read(bad.as_ptr(), bad.len()) };
        assert!(handle.is_null());
        let message = unsafe { CStr::from_ptr(wasmbound_last_error()) };
        assert!(!message.to_bytes().is_empty());
    }

    #[test]
    fn successful_read_clears_last_error() {
        let bad = [0u8];
        unsafe { wasmbound_module_safe_read(bad.as_ptr(), bad.len()) };
        let good = Module::new().write();
        let handle = unsafe { wasmbound_module_safe_read(good.as_ptr(), good.len()) };
        assert!(!handle.is_null());
        assert!(wasmbound_last_error().is_null());
        unsafe { wasmbound_module_dispose(handle) };
    }

    #[test]
    fn null_input_is_empty_input() {
        let handle = unsafe { wasmbound_translate_to_fuzz(ptr::null(), 0, 0) };
        assert!(!handle.is_null());
        assert_eq!(unsafe { &*handle }.function_count(), 0);
        unsafe { wasmbound_module_dispose(handle) };
    }

    fn read_handle(src: &str) -> WasmboundModuleRef {
        let bytes = wat::parse_str(src).unwrap();
        let handle = unsafe { wasmbound_module_safe_read(bytes.as_ptr(), bytes.len()) };
        assert!(!handle.is_null());
        handle
    }

    fn read_module(src: &str) -> Module {
        crate::read_binary(&wat::parse_str(src).unwrap()).unwrap()
    }

    #[test]
    fn named_passes_run_through_the_c_entry_point() {
        let handle = read_handle(
            r#"(module (func (result i32)
                i32.const 1
                return
                nop
                i32.const 2))"#,
        );
        let names = [CString::new("dce").unwrap()];
        let ptrs: Vec<*const c_char> = names.iter().map(|n| n.as_ptr()).collect();
        unsafe { wasmbound_module_run_passes(handle, ptrs.as_ptr(), 1, 0, 0, 1) };

        let expected = read_module("(module (func (result i32) i32.const 1 return))");
        assert_eq!(unsafe { &*handle }, &expected);
        unsafe { wasmbound_module_dispose(handle) };
    }

    #[test]
    fn null_pass_list_runs_default_pipeline() {
        let src = r#"(module (func $f (result i32)
            nop
            i32.const 4
            i32.const 5
            i32.mul))"#;
        let handle = read_handle(src);
        unsafe { wasmbound_module_run_passes(handle, ptr::null(), 0, 0, 2, 0) };

        let mut expected = read_module(src);
        crate::run_passes(
            &mut expected,
            None,
            PassSettings {
                shrink_level: 0,
                optimize_level: 2,
                debug_info: false,
            },
        );
        let module = unsafe { &*handle };
        assert_eq!(module, &expected);
        assert_eq!(module, &read_module("(module (func (result i32) i32.const 20))"));
        unsafe { wasmbound_module_dispose(handle) };
    }

    #[test]
    fn full_validation_keeps_features() {
        let handle = read_handle(
            r#"(module
                (memory 1 1 shared)
                (func (result i32) i32.const 0 i32.atomic.load))"#,
        );
        assert!(unsafe { wasmbound_module_validate_full(handle) });
        assert_eq!(unsafe { &*handle }.features(), FeatureSet::MVP);
        unsafe { wasmbound_module_dispose(handle) };

        let empty = wasmbound_module_create();
        assert!(unsafe { wasmbound_module_validate_full(empty) });
        unsafe { wasmbound_module_dispose(empty) };
    }

    #[test]
    fn write_result_round_trips_through_c_entry_points() {
        let handle = read_handle("(module (func nop))");
        let url = CString::new("out.wasm.map").unwrap();
        let raw = unsafe { wasmbound_module_allocate_and_write(handle, url.as_ptr()) };
        assert!(!raw.binary.is_null());
        assert!(!raw.source_map.is_null());

        let binary = unsafe { slice::from_raw_parts(raw.binary, raw.binary_bytes) };
        let expected = unsafe { &*handle }.write_with_source_map(Some("out.wasm.map"));
        assert_eq!(binary, expected.binary.as_slice());
        let map = unsafe { CStr::from_ptr(raw.source_map) }.to_str().unwrap();
        assert_eq!(Some(map), expected.source_map.as_deref());
        unsafe { wasmbound_dispose_allocate_and_write_result(raw) };

        let raw = unsafe { wasmbound_module_allocate_and_write(handle, ptr::null()) };
        assert!(raw.source_map.is_null());
        let reread = unsafe { wasmbound_module_safe_read(raw.binary, raw.binary_bytes) };
        assert_eq!(unsafe { &*reread }, unsafe { &*handle });
        unsafe {
            wasmbound_dispose_allocate_and_write_result(raw);
            wasmbound_module_dispose(reread);
            wasmbound_module_dispose(handle);
        }
    }

    #[test]
    fn negative_levels_clamp_to_zero() {
        assert_eq!(level(-3), 0);
        assert_eq!(level(2), 2);
    }
}

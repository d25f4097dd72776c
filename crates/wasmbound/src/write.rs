use std::ffi::{c_char, CString};
use std::ptr;

use wasmbound_core::Module;

/// Independently owned binary and source map buffers.
///
/// Move-only: each buffer is released exactly once, by [`dispose`] or by
/// dropping the value.
///
/// [`dispose`]: AllocateAndWriteResult::dispose
#[derive(Debug)]
pub struct AllocateAndWriteResult {
    binary: Option<Box<[u8]>>,
    source_map: Option<CString>,
}

/// C layout of [`AllocateAndWriteResult`]. Either pointer may be null.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawAllocateAndWriteResult {
    pub binary: *mut u8,
    pub binary_bytes: usize,
    pub source_map: *mut c_char,
}

impl AllocateAndWriteResult {
    pub fn binary(&self) -> &[u8] {
        self.binary.as_deref().unwrap_or_default()
    }

    pub fn source_map(&self) -> Option<&str> {
        self.source_map.as_deref().and_then(|s| s.to_str().ok())
    }

    /// Releases both buffers.
    pub fn dispose(self) {
        drop(self);
    }

    /// Hands ownership of both buffers to the caller.
    pub(crate) fn into_raw(self) -> RawAllocateAndWriteResult {
        let (binary, binary_bytes) = match self.binary {
            Some(bytes) => {
                let len = bytes.len();
                (Box::into_raw(bytes) as *mut u8, len)
            }
            None => (ptr::null_mut(), 0),
        };
        let source_map = self
            .source_map
            .map_or(ptr::null_mut(), CString::into_raw);
        RawAllocateAndWriteResult {
            binary,
            binary_bytes,
            source_map,
        }
    }

    /// Takes back ownership of buffers produced by [`into_raw`].
    ///
    /// # Safety
    /// `raw` must come from `into_raw` and must not have been reclaimed
    /// before.
    ///
    /// [`into_raw`]: AllocateAndWriteResult::into_raw
    pub(crate) unsafe fn from_raw(raw: RawAllocateAndWriteResult) -> Self {
        let binary = (!raw.binary.is_null()).then(|| {
            // SAFETY: pointer and length describe a boxed slice from `into_raw`.
            unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(raw.binary, raw.binary_bytes)) }
        });
        let source_map = (!raw.source_map.is_null()).then(|| {
            // SAFETY: the pointer came from `CString::into_raw`.
            unsafe { CString::from_raw(raw.source_map) }
        });
        AllocateAndWriteResult { binary, source_map }
    }
}

/// Encodes `module`, plus a source map when `source_map_url` is set.
pub fn allocate_and_write(module: &Module, source_map_url: Option<&str>) -> AllocateAndWriteResult {
    let output = module.write_with_source_map(source_map_url);
    AllocateAndWriteResult {
        binary: Some(output.binary.into_boxed_slice()),
        // JSON text never contains NUL, so this only drops a map that could
        // not be represented as a C string.
        source_map: output.source_map.and_then(|map| CString::new(map).ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trip_keeps_buffers() {
        let result = allocate_and_write(&Module::new(), Some("m.map"));
        let expected = result.binary().to_vec();
        let raw = result.into_raw();
        assert!(!raw.binary.is_null());
        assert!(!raw.source_map.is_null());

        let result = unsafe { AllocateAndWriteResult::from_raw(raw) };
        assert_eq!(result.binary(), expected.as_slice());
        assert!(result.source_map().unwrap().contains("\"version\":3"));
        result.dispose();
    }

    #[test]
    fn null_source_map_without_url() {
        let raw = allocate_and_write(&Module::new(), None).into_raw();
        assert!(raw.source_map.is_null());
        unsafe { AllocateAndWriteResult::from_raw(raw) }.dispose();
    }
}

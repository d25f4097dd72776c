//! Optional WebAssembly capabilities a module is permitted to use.
//!
//! The names match the `target_features` custom section convention so a
//! feature set can round-trip through a binary.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use wasmparser::WasmFeatures;

bitflags! {
    /// Set of post-MVP proposals a module may use.
    ///
    /// Floats and mutable-global import/export belong to the MVP baseline and
    /// are always allowed, so they have no member here.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FeatureSet: u32 {
        const ATOMICS = 1 << 0;
        const BULK_MEMORY = 1 << 1;
        const NONTRAPPING_FPTOINT = 1 << 2;
        const SIGN_EXT = 1 << 3;
        const SIMD = 1 << 4;
        const REFERENCE_TYPES = 1 << 5;
        const MULTIVALUE = 1 << 6;
        const TAIL_CALL = 1 << 7;
    }
}

/// `target_features` name of every known feature, in bit order.
const NAMES: [(FeatureSet, &str); 8] = [
    (FeatureSet::ATOMICS, "atomics"),
    (FeatureSet::BULK_MEMORY, "bulk-memory"),
    (FeatureSet::NONTRAPPING_FPTOINT, "nontrapping-fptoint"),
    (FeatureSet::SIGN_EXT, "sign-ext"),
    (FeatureSet::SIMD, "simd128"),
    (FeatureSet::REFERENCE_TYPES, "reference-types"),
    (FeatureSet::MULTIVALUE, "multivalue"),
    (FeatureSet::TAIL_CALL, "tail-call"),
];

impl FeatureSet {
    /// The WebAssembly 1.0 baseline: no optional features.
    pub const MVP: FeatureSet = FeatureSet::empty();

    /// Looks up a single feature by its `target_features` name.
    pub fn from_target_name(name: &str) -> Option<FeatureSet> {
        NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(feature, _)| *feature)
    }

    /// Names of the features contained in this set, in bit order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        NAMES
            .iter()
            .filter(move |(feature, _)| self.contains(*feature))
            .map(|(_, name)| *name)
    }

    /// Validator configuration accepting exactly this feature set.
    pub fn to_wasm_features(self) -> WasmFeatures {
        let mut features =
            WasmFeatures::FLOATS | WasmFeatures::GC_TYPES | WasmFeatures::MUTABLE_GLOBAL;
        let mapping = [
            (FeatureSet::ATOMICS, WasmFeatures::THREADS),
            (FeatureSet::BULK_MEMORY, WasmFeatures::BULK_MEMORY),
            (
                FeatureSet::NONTRAPPING_FPTOINT,
                WasmFeatures::SATURATING_FLOAT_TO_INT,
            ),
            (FeatureSet::SIGN_EXT, WasmFeatures::SIGN_EXTENSION),
            (FeatureSet::SIMD, WasmFeatures::SIMD),
            (FeatureSet::REFERENCE_TYPES, WasmFeatures::REFERENCE_TYPES),
            (FeatureSet::MULTIVALUE, WasmFeatures::MULTI_VALUE),
            (FeatureSet::TAIL_CALL, WasmFeatures::TAIL_CALL),
        ];
        for (ours, theirs) in mapping {
            if self.contains(ours) {
                features |= theirs;
            }
        }
        features
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        FeatureSet::MVP
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("mvp");
        }
        let names: Vec<&str> = self.names().collect();
        f.write_str(&names.join(","))
    }
}

/// A feature name that is not part of [`FeatureSet`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown feature `{0}`")]
pub struct UnknownFeature(pub String);

impl FromStr for FeatureSet {
    type Err = UnknownFeature;

    /// Parses `mvp`, `all`, or a comma-separated list of feature names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = FeatureSet::MVP;
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            set |= match part {
                "mvp" => FeatureSet::MVP,
                "all" => FeatureSet::all(),
                name => FeatureSet::from_target_name(name)
                    .ok_or_else(|| UnknownFeature(name.to_string()))?,
            };
        }
        Ok(set)
    }
}

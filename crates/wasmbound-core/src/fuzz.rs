//! Deterministic synthesis of valid modules from arbitrary bytes.
//!
//! The input is treated as an entropy source for `wasm-smith`. The feature
//! set is applied to the generator configuration, so a module produced for
//! feature set `F` never uses a construct outside `F`.

use arbitrary::Unstructured;
use wasm_smith::Config;

use crate::features::FeatureSet;
use crate::module::Module;

/// Builds a module from fuzzer-provided bytes.
pub struct TranslateToFuzzReader<'a> {
    data: &'a [u8],
    features: FeatureSet,
}

impl<'a> TranslateToFuzzReader<'a> {
    pub fn new(data: &'a [u8], features: FeatureSet) -> Self {
        TranslateToFuzzReader { data, features }
    }

    /// Generator configuration restricted to `features`.
    pub fn config(features: FeatureSet) -> Config {
        let mut config = Config::default();
        config.threads_enabled = features.contains(FeatureSet::ATOMICS);
        config.bulk_memory_enabled = features.contains(FeatureSet::BULK_MEMORY);
        config.saturating_float_to_int_enabled =
            features.contains(FeatureSet::NONTRAPPING_FPTOINT);
        config.sign_extension_ops_enabled = features.contains(FeatureSet::SIGN_EXT);
        config.simd_enabled = features.contains(FeatureSet::SIMD);
        // The generator emits bulk-memory table ops whenever reference types
        // are on, so both must be allowed.
        config.reference_types_enabled = features
            .contains(FeatureSet::REFERENCE_TYPES | FeatureSet::BULK_MEMORY);
        config.multi_value_enabled = features.contains(FeatureSet::MULTIVALUE);
        config.tail_call_enabled = features.contains(FeatureSet::TAIL_CALL);

        config.relaxed_simd_enabled = false;
        config.exceptions_enabled = false;
        config.gc_enabled = false;
        config.memory64_enabled = false;
        config.extended_const_enabled = false;
        config.max_memories = 1;
        config.max_tables = if config.reference_types_enabled { 4 } else { 1 };
        config
    }

    /// Synthesizes the module. Never fails: a generator error yields an empty
    /// module with the requested features.
    pub fn build(self) -> Module {
        let mut module = if self.data.is_empty() {
            Module::new()
        } else {
            self.generate()
        };
        module.set_features(self.features);
        module
    }

    fn generate(&self) -> Module {
        let mut u = Unstructured::new(self.data);
        let generated = match wasm_smith::Module::new(Self::config(self.features), &mut u) {
            Ok(generated) => generated,
            Err(err) => {
                log::debug!("fuzz generator gave up: {err}");
                return Module::new();
            }
        };
        decode_generated(&generated.to_bytes())
    }
}

/// Decodes generator output, falling back to an empty module.
fn decode_generated(bytes: &[u8]) -> Module {
    match Module::read(bytes, false) {
        Ok(module) => module,
        Err(err) => {
            log::debug!("generated module failed to decode: {err}");
            Module::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    fn seeds(count: usize, len: usize) -> Vec<Vec<u8>> {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        (0..count)
            .map(|_| {
                let mut seed = vec![0; len];
                rng.fill_bytes(&mut seed);
                seed
            })
            .collect()
    }

    /// Records the highest level logged from this module.
    struct LevelRecorder;

    static HIGHEST: std::sync::Mutex<Option<log::Level>> = std::sync::Mutex::new(None);

    impl log::Log for LevelRecorder {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            if record.target() == module_path!() {
                let mut highest = HIGHEST.lock().unwrap();
                // `Level` orders Error lowest.
                if highest.map_or(true, |h| record.level() < h) {
                    *highest = Some(record.level());
                }
            }
        }

        fn flush(&self) {}
    }

    #[test]
    fn undecodable_output_falls_back_quietly() {
        let _ = log::set_logger(&LevelRecorder);
        log::set_max_level(log::LevelFilter::Trace);

        assert_eq!(decode_generated(&[0x00]), Module::new());
        assert_eq!(*HIGHEST.lock().unwrap(), Some(log::Level::Debug));
    }

    #[test]
    fn empty_input_gives_empty_module() {
        let module = TranslateToFuzzReader::new(&[], FeatureSet::ATOMICS).build();
        assert_eq!(module.function_count(), 0);
        assert_eq!(module.features(), FeatureSet::ATOMICS);
        assert!(module.is_valid());
    }

    #[test]
    fn same_input_same_module() {
        for seed in seeds(20, 512) {
            let a = TranslateToFuzzReader::new(&seed, FeatureSet::all()).build();
            let b = TranslateToFuzzReader::new(&seed, FeatureSet::all()).build();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn mvp_output_validates_as_mvp() {
        for seed in seeds(100, 1000) {
            let module = TranslateToFuzzReader::new(&seed, FeatureSet::MVP).build();
            assert!(validate(&module, FeatureSet::MVP));
        }
    }

    #[test]
    fn atomics_output_stays_within_atomics() {
        for seed in seeds(100, 1000) {
            let features = FeatureSet::ATOMICS;
            let module = TranslateToFuzzReader::new(&seed, features).build();
            assert!(validate(&module, features));
        }
    }

    #[test]
    fn reference_types_without_bulk_memory_is_not_passed_on() {
        let config = TranslateToFuzzReader::config(FeatureSet::REFERENCE_TYPES);
        assert!(!config.reference_types_enabled);
        assert!(!config.bulk_memory_enabled);
    }
}

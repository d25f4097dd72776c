use wasmbound_core::{FeatureSet, Module, TranslateToFuzzReader};

/// Converts an arbitrary byte sequence into a valid module using only
/// `features`.
///
/// Deterministic: equal inputs give equal modules. Empty input gives an empty
/// module. The returned module's feature set is `features`.
pub fn translate_to_fuzz(data: &[u8], features: FeatureSet) -> Module {
    TranslateToFuzzReader::new(data, features).build()
}

/// Converts an arbitrary byte sequence into a valid MVP-only module.
pub fn translate_to_fuzz_mvp(data: &[u8]) -> Module {
    translate_to_fuzz(data, FeatureSet::MVP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmbound_core::validate;

    #[test]
    fn mvp_helper_matches_explicit_features() {
        let seed: Vec<u8> = (0..=255u8).cycle().take(2048).collect();
        assert_eq!(translate_to_fuzz_mvp(&seed), translate_to_fuzz(&seed, FeatureSet::MVP));
        assert!(validate(&translate_to_fuzz_mvp(&seed), FeatureSet::MVP));
    }
}

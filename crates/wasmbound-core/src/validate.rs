//! Structural and semantic validation, delegated to `wasmparser`.

use wasmparser::Validator;

use crate::error::ValidationError;
use crate::features::FeatureSet;
use crate::module::Module;

/// Validates `module` against `features`, reporting the first error.
pub fn validate_with_diagnostics(
    module: &Module,
    features: FeatureSet,
) -> Result<(), ValidationError> {
    let bytes = module.write();
    let mut validator = Validator::new_with_features(features.to_wasm_features());
    validator.validate_all(&bytes)?;
    Ok(())
}

/// Whether `module` is valid when only `features` may be used.
pub fn validate(module: &Module, features: FeatureSet) -> bool {
    validate_with_diagnostics(module, features).is_ok()
}

impl Module {
    /// Validates against the module's own feature set.
    pub fn is_valid(&self) -> bool {
        validate(self, self.features)
    }
}

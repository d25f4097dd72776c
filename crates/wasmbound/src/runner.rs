use std::ops::Deref;

use wasmbound_core::{
    global_pass_options, FeatureSet, Module, OptimizationPass, PassOptions, PassRunner,
};

/// Per-call optimization knobs. They configure how passes run, not which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassSettings {
    pub shrink_level: u32,
    pub optimize_level: u32,
    pub debug_info: bool,
}

impl PassSettings {
    /// Layers these settings over a snapshot of the global defaults.
    fn to_options(self) -> PassOptions {
        PassOptions {
            optimize_level: self.optimize_level,
            shrink_level: self.shrink_level,
            debug_info: self.debug_info,
            ..global_pass_options()
        }
    }
}

/// Runs `passes` in order over `module`, or the default pipeline when
/// `passes` is `None`.
///
/// Every call builds its own [`PassOptions`], so concurrent calls on distinct
/// modules never share mutable configuration.
pub fn run_passes(module: &mut Module, passes: Option<&[OptimizationPass]>, settings: PassSettings) {
    let mut runner = PassRunner::new(module, settings.to_options());
    match passes {
        None => {
            runner.add_default_optimization_passes();
        }
        Some(passes) => {
            for pass in passes {
                runner.add(*pass);
            }
        }
    }
    runner.run();
}

/// Temporarily replaces a module's feature set, restoring it on drop.
pub struct FeatureOverride<'a> {
    module: &'a mut Module,
    saved: FeatureSet,
}

impl<'a> FeatureOverride<'a> {
    pub fn new(module: &'a mut Module, features: FeatureSet) -> Self {
        let saved = module.features();
        module.set_features(features);
        FeatureOverride { module, saved }
    }
}

impl Deref for FeatureOverride<'_> {
    type Target = Module;

    fn deref(&self) -> &Module {
        self.module
    }
}

impl Drop for FeatureOverride<'_> {
    fn drop(&mut self) {
        self.module.set_features(self.saved);
    }
}

/// Validates `module` with every known feature enabled.
///
/// The module's declared feature set is the same after the call as before,
/// whatever the outcome.
pub fn validate_full(module: &mut Module) -> bool {
    let all = FeatureOverride::new(module, FeatureSet::all());
    all.is_valid()
}

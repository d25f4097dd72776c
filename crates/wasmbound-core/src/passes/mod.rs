//! Named module transformation passes.
//!
//! Passes are looked up by name through [`OptimizationPass`] and executed by a
//! [`PassRunner`], which owns its [`PassOptions`]. The process-wide defaults
//! returned by [`global_pass_options`] are only ever copied from, never
//! handed to a runner by reference, so runners on different modules can
//! execute concurrently while the defaults are being changed.

use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;
use thiserror::Error;

use crate::module::Module;
use crate::validate::validate_with_diagnostics;

// ── Passes ───────────────────────────────────────────────────────────────────
mod dce;
mod precompute;
mod strip;
mod vacuum;

/// A registered pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptimizationPass {
    Dce,
    Vacuum,
    Precompute,
    StripDebug,
    StripProducers,
    StripTargetFeatures,
    EmitTargetFeatures,
}

impl OptimizationPass {
    /// Every registered pass, in registration order.
    pub const ALL: [OptimizationPass; 7] = [
        OptimizationPass::Dce,
        OptimizationPass::Vacuum,
        OptimizationPass::Precompute,
        OptimizationPass::StripDebug,
        OptimizationPass::StripProducers,
        OptimizationPass::StripTargetFeatures,
        OptimizationPass::EmitTargetFeatures,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OptimizationPass::Dce => "dce",
            OptimizationPass::Vacuum => "vacuum",
            OptimizationPass::Precompute => "precompute",
            OptimizationPass::StripDebug => "strip-debug",
            OptimizationPass::StripProducers => "strip-producers",
            OptimizationPass::StripTargetFeatures => "strip-target-features",
            OptimizationPass::EmitTargetFeatures => "emit-target-features",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            OptimizationPass::Dce => "removes unreachable code",
            OptimizationPass::Vacuum => "removes obviously unneeded code",
            OptimizationPass::Precompute => "computes compile-time evaluatable expressions",
            OptimizationPass::StripDebug => "strip debug info, including the names section",
            OptimizationPass::StripProducers => "strip the wasm producers section",
            OptimizationPass::StripTargetFeatures => "strip the wasm target features section",
            OptimizationPass::EmitTargetFeatures => "emit the target features section in the output",
        }
    }

    fn run(self, module: &mut Module) {
        match self {
            OptimizationPass::Dce => module.functions_mut().for_each(dce::eliminate),
            OptimizationPass::Vacuum => module.functions_mut().for_each(vacuum::sweep),
            OptimizationPass::Precompute => module.functions_mut().for_each(precompute::fold),
            OptimizationPass::StripDebug => strip::debug_info(module),
            OptimizationPass::StripProducers => strip::producers(module),
            OptimizationPass::StripTargetFeatures => module.set_has_features_section(false),
            OptimizationPass::EmitTargetFeatures => module.set_has_features_section(true),
        }
    }
}

impl fmt::Display for OptimizationPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pass name that is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pass `{0}`")]
pub struct UnknownPass(pub String);

impl FromStr for OptimizationPass {
    type Err = UnknownPass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OptimizationPass::ALL
            .into_iter()
            .find(|pass| pass.name() == s)
            .ok_or_else(|| UnknownPass(s.to_string()))
    }
}

// ── Options ──────────────────────────────────────────────────────────────────

/// How passes run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOptions {
    /// 0-4; higher values add more function-level passes.
    pub optimize_level: u32,
    /// 0-2; non-zero favors size.
    pub shrink_level: u32,
    /// Preserve debug information (names, source maps).
    pub debug_info: bool,
    /// Validate after every pass and warn about the pass that broke validity.
    pub validate_after_each: bool,
}

impl Default for PassOptions {
    fn default() -> Self {
        PassOptions {
            optimize_level: 0,
            shrink_level: 0,
            debug_info: true,
            validate_after_each: false,
        }
    }
}

static GLOBAL_PASS_OPTIONS: RwLock<PassOptions> = RwLock::new(PassOptions {
    optimize_level: 0,
    shrink_level: 0,
    debug_info: true,
    validate_after_each: false,
});

/// Snapshot of the process-wide default pass options.
pub fn global_pass_options() -> PassOptions {
    *GLOBAL_PASS_OPTIONS.read()
}

/// Replaces the process-wide default pass options.
pub fn set_global_pass_options(options: PassOptions) {
    *GLOBAL_PASS_OPTIONS.write() = options;
}

/// The passes [`PassRunner::add_default_optimization_passes`] schedules.
pub fn default_pipeline(options: &PassOptions) -> Vec<OptimizationPass> {
    let mut passes = Vec::new();
    if options.optimize_level >= 1 || options.shrink_level >= 1 {
        passes.push(OptimizationPass::Dce);
        passes.push(OptimizationPass::Vacuum);
    }
    if options.optimize_level >= 2 || options.shrink_level >= 1 {
        passes.push(OptimizationPass::Precompute);
        passes.push(OptimizationPass::Vacuum);
    }
    if !options.debug_info {
        passes.push(OptimizationPass::StripDebug);
    }
    if options.shrink_level >= 2 {
        passes.push(OptimizationPass::StripProducers);
    }
    passes
}

// ── Runner ───────────────────────────────────────────────────────────────────

/// Runs a scheduled list of passes over one module.
pub struct PassRunner<'m> {
    module: &'m mut Module,
    options: PassOptions,
    passes: Vec<OptimizationPass>,
}

impl<'m> PassRunner<'m> {
    pub fn new(module: &'m mut Module, options: PassOptions) -> Self {
        PassRunner {
            module,
            options,
            passes: Vec::new(),
        }
    }

    pub fn options(&self) -> &PassOptions {
        &self.options
    }

    pub fn add(&mut self, pass: OptimizationPass) -> &mut Self {
        self.passes.push(pass);
        self
    }

    pub fn add_default_optimization_passes(&mut self) -> &mut Self {
        self.passes.extend(default_pipeline(&self.options));
        self
    }

    /// Runs every scheduled pass in order.
    pub fn run(&mut self) {
        for pass in std::mem::take(&mut self.passes) {
            log::debug!("running pass {pass}");
            pass.run(self.module);
            if self.options.validate_after_each {
                if let Err(err) = validate_with_diagnostics(self.module, self.module.features())
                {
                    log::warn!("module invalid after pass {pass}: {err}");
                }
            }
        }
    }
}

impl Module {
    /// Runs the default pipeline under the current process-wide defaults.
    pub fn optimize(&mut self) {
        PassRunner::new(self, global_pass_options())
            .add_default_optimization_passes()
            .run();
    }
}

//! Custom-section stripping passes.

use crate::module::{Module, Section};

fn is_debug_section(name: &str) -> bool {
    name == "name"
        || name == "sourceMappingURL"
        || name == "external_debug_info"
        || name.starts_with(".debug_")
}

fn retain_custom(module: &mut Module, keep: impl Fn(&str) -> bool) {
    module.sections_mut().retain(|section| match section {
        Section::Custom { name, .. } => keep(name.as_str()),
        _ => true,
    });
}

pub fn debug_info(module: &mut Module) {
    retain_custom(module, |name| !is_debug_section(name));
}

pub fn producers(module: &mut Module) {
    retain_custom(module, |name| name != "producers");
}

//! `Module::optimize` follows the process-wide defaults. Kept in its own test
//! binary because it changes them.

use wasmbound_core::{global_pass_options, set_global_pass_options, Module, PassOptions};

fn read(src: &str) -> Module {
    Module::read(&wat::parse_str(src).unwrap(), false).unwrap()
}

#[test]
fn optimize_uses_global_defaults() {
    let src = r#"(module
        (func (result i32)
            i32.const 2
            i32.const 3
            i32.add
            nop)
        (func $named))"#;

    let mut untouched = read(src);
    untouched.optimize();
    assert_eq!(untouched, read(src));

    let saved = global_pass_options();
    set_global_pass_options(PassOptions {
        optimize_level: 2,
        debug_info: false,
        ..saved
    });
    let mut optimized = read(src);
    optimized.optimize();
    set_global_pass_options(saved);

    assert_eq!(optimized, read("(module (func (result i32) i32.const 5) (func))"));
    assert!(optimized.is_valid());
}

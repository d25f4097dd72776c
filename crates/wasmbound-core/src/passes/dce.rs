//! Dead code elimination.
//!
//! Everything between an instruction that never falls through (`br`,
//! `return`, `unreachable`, ...) and the `end`/`else` closing the enclosing
//! construct can never execute. The operand stack after such an instruction
//! is polymorphic, so dropping the dead tail keeps the body valid.

use crate::module::{Function, InstrKind};

/// Removes unreachable instructions from a function body in place.
pub fn eliminate(func: &mut Function) {
    let mut body = std::mem::take(&mut func.body).into_iter();
    let mut live = Vec::with_capacity(body.len());

    while let Some(instr) = body.next() {
        let barrier = instr.kind == InstrKind::Barrier;
        live.push(instr);
        if !barrier {
            continue;
        }
        // Skip to the clause or end that closes the current construct,
        // stepping over whole nested constructs.
        let mut depth = 0usize;
        for dead in body.by_ref() {
            match dead.kind {
                InstrKind::Open => depth += 1,
                InstrKind::End if depth > 0 => depth -= 1,
                InstrKind::End | InstrKind::Clause if depth == 0 => {
                    live.push(dead);
                    break;
                }
                _ => {}
            }
        }
    }

    func.body = live;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Module;

    fn first_function(src: &str) -> (Module, Function) {
        let module = Module::read(&wat::parse_str(src).unwrap(), true).unwrap();
        let func = module.functions().next().unwrap().clone();
        (module, func)
    }

    fn kinds(func: &Function) -> Vec<InstrKind> {
        func.body.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn code_after_return_is_removed() {
        let (_, mut func) = first_function(
            r#"(module (func (result i32)
                i32.const 1
                return
                i32.const 2
                drop
                i32.const 3))"#,
        );
        eliminate(&mut func);
        assert_eq!(
            kinds(&func),
            vec![InstrKind::I32Const(1), InstrKind::Barrier, InstrKind::End]
        );
    }

    #[test]
    fn nested_dead_constructs_are_skipped_whole() {
        let (_, mut func) = first_function(
            r#"(module (func
                block
                    unreachable
                    block
                        nop
                    end
                    loop
                        br 0
                    end
                end
                nop))"#,
        );
        eliminate(&mut func);
        assert_eq!(
            kinds(&func),
            vec![
                InstrKind::Open,
                InstrKind::Barrier,
                InstrKind::End,
                InstrKind::Nop,
                InstrKind::End,
            ]
        );
    }

    #[test]
    fn else_arm_survives_dead_then_arm() {
        let (_, mut func) = first_function(
            r#"(module (func (param i32)
                local.get 0
                if
                    br 0
                    nop
                else
                    nop
                end))"#,
        );
        eliminate(&mut func);
        assert_eq!(
            kinds(&func),
            vec![
                InstrKind::Pure,
                InstrKind::Open,
                InstrKind::Barrier,
                InstrKind::Clause,
                InstrKind::Nop,
                InstrKind::End,
                InstrKind::End,
            ]
        );
    }

    #[test]
    fn live_code_is_untouched() {
        let (_, mut func) = first_function(
            r#"(module (func (param i32) (result i32)
                i32.const 5
                local.get 0
                br_if 0))"#,
        );
        let before = func.clone();
        eliminate(&mut func);
        assert_eq!(func, before);
    }

    #[test]
    fn result_stays_valid() {
        let (mut module, _) = first_function(
            r#"(module (func (result i64)
                block (result i64)
                    i64.const 1
                    br 0
                    i32.const 2
                    i32.const 3
                    i32.add
                    drop
                end))"#,
        );
        module.functions_mut().for_each(eliminate);
        assert!(module.is_valid());
        assert_eq!(module.instruction_count(), 5);
    }
}

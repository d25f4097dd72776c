//! Removal of instructions with no observable effect.

use crate::module::{Function, Instr, InstrKind};

/// Removes `nop`s, pure-value/`drop` pairs and empty `block`/`loop`s.
///
/// Works as a single left-to-right sweep over an output stack, so chains
/// such as `local.get 0 local.get 1 drop drop` collapse completely.
pub fn sweep(func: &mut Function) {
    let body = std::mem::take(&mut func.body);
    let mut kept: Vec<Instr> = Vec::with_capacity(body.len());

    for instr in body {
        match instr.kind {
            InstrKind::Nop => {}
            InstrKind::Drop if kept.last().is_some_and(|prev| prev.kind.is_pure()) => {
                kept.pop();
            }
            InstrKind::End if kept.last().is_some_and(Instr::is_empty_block_start) => {
                kept.pop();
            }
            _ => kept.push(instr),
        }
    }

    func.body = kept;
}

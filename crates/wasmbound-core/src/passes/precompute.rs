//! Constant folding of integer binary operations.

use wasm_encoder::{Encode, Instruction};

use crate::module::{Function, Instr, InstrKind};

fn i32_const(value: i32) -> Instr {
    let mut bytes = Vec::new();
    Instruction::I32Const(value).encode(&mut bytes);
    Instr::new(InstrKind::I32Const(value), bytes)
}

fn i64_const(value: i64) -> Instr {
    let mut bytes = Vec::new();
    Instruction::I64Const(value).encode(&mut bytes);
    Instr::new(InstrKind::I64Const(value), bytes)
}

/// Folds the two most recently kept instructions into `op` when both are
/// constants of the operator's width.
fn try_fold(kept: &[Instr], op: InstrKind) -> Option<Instr> {
    let [.., lhs, rhs] = kept else {
        return None;
    };
    match (op, lhs.kind, rhs.kind) {
        (InstrKind::I32BinOp(op), InstrKind::I32Const(a), InstrKind::I32Const(b)) => {
            Some(i32_const(op.eval_i32(a, b)))
        }
        (InstrKind::I64BinOp(op), InstrKind::I64Const(a), InstrKind::I64Const(b)) => {
            Some(i64_const(op.eval_i64(a, b)))
        }
        _ => None,
    }
}

/// Replaces `const a; const b; binop` sequences with their result.
///
/// Folded results feed later folds, so `1 2 add 3 mul` becomes `9`.
pub fn fold(func: &mut Function) {
    let body = std::mem::take(&mut func.body);
    let mut kept: Vec<Instr> = Vec::with_capacity(body.len());

    for instr in body {
        match try_fold(&kept, instr.kind) {
            Some(folded) => {
                kept.truncate(kept.len() - 2);
                kept.push(folded);
            }
            None => kept.push(instr),
        }
    }

    func.body = kept;
}

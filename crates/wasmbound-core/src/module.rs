//! In-memory module representation.
//!
//! A [`Module`] keeps every non-code section as the exact payload bytes it was
//! decoded from and decodes only the code section, into instructions that
//! carry both a coarse classification (enough for the passes in
//! [`crate::passes`]) and their original encoding. Writing a module back out
//! is therefore a concatenation, and untouched instructions keep their exact
//! bytes.

use anyhow::{Context, Result};

use crate::features::FeatureSet;

/// Integer binary operators the constant folder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntBinOp {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Shl,
    ShrS,
    ShrU,
    Rotl,
    Rotr,
}

impl IntBinOp {
    /// Evaluates the operator on two i32 operands with Wasm semantics.
    pub fn eval_i32(self, lhs: i32, rhs: i32) -> i32 {
        let shift = (rhs as u32) % 32;
        match self {
            IntBinOp::Add => lhs.wrapping_add(rhs),
            IntBinOp::Sub => lhs.wrapping_sub(rhs),
            IntBinOp::Mul => lhs.wrapping_mul(rhs),
            IntBinOp::And => lhs & rhs,
            IntBinOp::Or => lhs | rhs,
            IntBinOp::Xor => lhs ^ rhs,
            IntBinOp::Shl => lhs.wrapping_shl(shift),
            IntBinOp::ShrS => lhs.wrapping_shr(shift),
            IntBinOp::ShrU => ((lhs as u32) >> shift) as i32,
            IntBinOp::Rotl => (lhs as u32).rotate_left(shift) as i32,
            IntBinOp::Rotr => (lhs as u32).rotate_right(shift) as i32,
        }
    }

    /// Evaluates the operator on two i64 operands with Wasm semantics.
    pub fn eval_i64(self, lhs: i64, rhs: i64) -> i64 {
        let shift = (rhs as u64 % 64) as u32;
        match self {
            IntBinOp::Add => lhs.wrapping_add(rhs),
            IntBinOp::Sub => lhs.wrapping_sub(rhs),
            IntBinOp::Mul => lhs.wrapping_mul(rhs),
            IntBinOp::And => lhs & rhs,
            IntBinOp::Or => lhs | rhs,
            IntBinOp::Xor => lhs ^ rhs,
            IntBinOp::Shl => lhs.wrapping_shl(shift),
            IntBinOp::ShrS => lhs.wrapping_shr(shift),
            IntBinOp::ShrU => ((lhs as u64) >> shift) as i64,
            IntBinOp::Rotl => (lhs as u64).rotate_left(shift) as i64,
            IntBinOp::Rotr => (lhs as u64).rotate_right(shift) as i64,
        }
    }
}

/// Coarse classification of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrKind {
    /// Opens a structured construct (`block`, `loop`, `if`, `try`, `try_table`).
    Open,
    /// Separates arms of the enclosing construct (`else`, `catch`, `catch_all`).
    Clause,
    /// Closes the enclosing construct (`end`, `delegate`).
    End,
    /// Never falls through to the next instruction (`unreachable`, `br`,
    /// `br_table`, `return`, tail calls, throws).
    Barrier,
    Nop,
    Drop,
    I32Const(i32),
    I64Const(i64),
    /// Pushes one value without side effects or traps.
    Pure,
    I32BinOp(IntBinOp),
    I64BinOp(IntBinOp),
    Other,
}

impl InstrKind {
    pub fn classify(op: &wasmparser::Operator<'_>) -> InstrKind {
        use wasmparser::Operator as O;
        match op {
            O::Block { .. } | O::Loop { .. } | O::If { .. } | O::Try { .. } | O::TryTable { .. } => {
                InstrKind::Open
            }
            O::Else | O::Catch { .. } | O::CatchAll => InstrKind::Clause,
            O::End | O::Delegate { .. } => InstrKind::End,
            O::Unreachable
            | O::Br { .. }
            | O::BrTable { .. }
            | O::Return
            | O::ReturnCall { .. }
            | O::ReturnCallIndirect { .. }
            | O::Throw { .. }
            | O::Rethrow { .. }
            | O::ThrowRef => InstrKind::Barrier,
            O::Nop => InstrKind::Nop,
            O::Drop => InstrKind::Drop,
            O::I32Const { value } => InstrKind::I32Const(*value),
            O::I64Const { value } => InstrKind::I64Const(*value),
            O::F32Const { .. }
            | O::F64Const { .. }
            | O::V128Const { .. }
            | O::LocalGet { .. }
            | O::GlobalGet { .. }
            | O::RefNull { .. }
            | O::RefFunc { .. } => InstrKind::Pure,
            O::I32Add => InstrKind::I32BinOp(IntBinOp::Add),
            O::I32Sub => InstrKind::I32BinOp(IntBinOp::Sub),
            O::I32Mul => InstrKind::I32BinOp(IntBinOp::Mul),
            O::I32And => InstrKind::I32BinOp(IntBinOp::And),
            O::I32Or => InstrKind::I32BinOp(IntBinOp::Or),
            O::I32Xor => InstrKind::I32BinOp(IntBinOp::Xor),
            O::I32Shl => InstrKind::I32BinOp(IntBinOp::Shl),
            O::I32ShrS => InstrKind::I32BinOp(IntBinOp::ShrS),
            O::I32ShrU => InstrKind::I32BinOp(IntBinOp::ShrU),
            O::I32Rotl => InstrKind::I32BinOp(IntBinOp::Rotl),
            O::I32Rotr => InstrKind::I32BinOp(IntBinOp::Rotr),
            O::I64Add => InstrKind::I64BinOp(IntBinOp::Add),
            O::I64Sub => InstrKind::I64BinOp(IntBinOp::Sub),
            O::I64Mul => InstrKind::I64BinOp(IntBinOp::Mul),
            O::I64And => InstrKind::I64BinOp(IntBinOp::And),
            O::I64Or => InstrKind::I64BinOp(IntBinOp::Or),
            O::I64Xor => InstrKind::I64BinOp(IntBinOp::Xor),
            O::I64Shl => InstrKind::I64BinOp(IntBinOp::Shl),
            O::I64ShrS => InstrKind::I64BinOp(IntBinOp::ShrS),
            O::I64ShrU => InstrKind::I64BinOp(IntBinOp::ShrU),
            O::I64Rotl => InstrKind::I64BinOp(IntBinOp::Rotl),
            O::I64Rotr => InstrKind::I64BinOp(IntBinOp::Rotr),
            _ => InstrKind::Other,
        }
    }

    /// True for instructions that only push a value.
    pub fn is_pure(self) -> bool {
        matches!(
            self,
            InstrKind::Pure | InstrKind::I32Const(_) | InstrKind::I64Const(_)
        )
    }
}

/// One instruction: its classification plus its exact encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instr {
    pub kind: InstrKind,
    pub bytes: Vec<u8>,
}

impl Instr {
    pub fn new(kind: InstrKind, bytes: Vec<u8>) -> Self {
        Instr { kind, bytes }
    }

    /// `block` or `loop` with the empty block type and nothing else.
    pub fn is_empty_block_start(&self) -> bool {
        self.kind == InstrKind::Open
            && matches!(self.bytes.as_slice(), [0x02, 0x40] | [0x03, 0x40])
    }
}

/// A function body from the code section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Encoded local declarations, including the leading group count.
    pub locals: Vec<u8>,
    /// Instructions, ending with the body's closing `end`.
    pub body: Vec<Instr>,
}

impl Function {
    /// Encodes the body the way the code section stores it (without the
    /// size prefix).
    pub fn encode(&self) -> Vec<u8> {
        let len = self.locals.len() + self.body.iter().map(|i| i.bytes.len()).sum::<usize>();
        let mut out = Vec::with_capacity(len);
        out.extend_from_slice(&self.locals);
        for instr in &self.body {
            out.extend_from_slice(&instr.bytes);
        }
        out
    }
}

/// A top-level section, in binary order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    /// A known non-code section, kept as its payload bytes.
    Raw { id: u8, data: Vec<u8> },
    Custom { name: String, data: Vec<u8> },
    Code(Vec<Function>),
}

/// Owned WebAssembly module.
///
/// Equality compares sections, features and the has-features-section flag,
/// which is the notion of "structurally equivalent" used throughout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Module {
    pub(crate) sections: Vec<Section>,
    pub(crate) features: FeatureSet,
    pub(crate) has_features_section: bool,
}

impl Module {
    /// An empty module using no optional features.
    pub fn new() -> Self {
        Module::default()
    }

    pub fn features(&self) -> FeatureSet {
        self.features
    }

    pub fn set_features(&mut self, features: FeatureSet) {
        self.features = features;
    }

    /// Whether writing this module emits a `target_features` section.
    pub fn has_features_section(&self) -> bool {
        self.has_features_section
    }

    pub fn set_has_features_section(&mut self, value: bool) {
        self.has_features_section = value;
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn sections_mut(&mut self) -> &mut Vec<Section> {
        &mut self.sections
    }

    /// All defined functions, across code sections.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.sections.iter().flat_map(|section| match section {
            Section::Code(funcs) => funcs.as_slice(),
            _ => &[],
        })
    }

    pub fn functions_mut(&mut self) -> impl Iterator<Item = &mut Function> {
        self.sections.iter_mut().flat_map(|section| match section {
            Section::Code(funcs) => funcs.as_mut_slice(),
            _ => Default::default(),
        })
    }

    pub fn function_count(&self) -> usize {
        self.functions().count()
    }

    /// Total instructions over all function bodies.
    pub fn instruction_count(&self) -> usize {
        self.functions().map(|f| f.body.len()).sum()
    }

    pub fn custom_section_names(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter_map(|section| match section {
                Section::Custom { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Renders the module in the WebAssembly text format.
    pub fn to_text(&self) -> Result<String> {
        wasmprinter::print_bytes(self.write()).context("failed to print module")
    }
}

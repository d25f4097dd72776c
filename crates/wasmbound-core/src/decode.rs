//! Binary decoder.
//!
//! Decoding walks the whole binary with `wasmparser` so every syntactic
//! fault surfaces here, but keeps non-code sections as raw payloads. Semantic
//! validation is a separate step (see [`crate::validate`]) that strict
//! decoding runs on top.

use std::ops::Range;

use wasmparser::{
    BinaryReader, BinaryReaderError, Encoding, FromReader, FunctionBody, Parser, Payload,
    SectionLimited,
};

use crate::error::DecodeError;
use crate::features::FeatureSet;
use crate::module::{Function, Instr, InstrKind, Module, Section};
use crate::validate::validate_with_diagnostics;

/// Name of the custom section that persists a module's feature set.
pub(crate) const TARGET_FEATURES: &str = "target_features";

/// Reads every entry of a section so malformed entries fail decoding.
fn check_entries<'a, T: FromReader<'a>>(
    reader: SectionLimited<'a, T>,
) -> Result<(), BinaryReaderError> {
    for entry in reader {
        entry?;
    }
    Ok(())
}

/// Parses the payload of a `target_features` section.
///
/// Each entry is a prefix byte (`+` used, `-` disallowed, `=` required)
/// followed by a feature name. Names this engine does not know are ignored.
fn parse_target_features(data: &[u8]) -> Result<FeatureSet, BinaryReaderError> {
    let mut reader = BinaryReader::new(data, 0);
    let mut features = FeatureSet::MVP;
    let count = reader.read_var_u32()?;
    for _ in 0..count {
        let prefix = reader.read_u8()?;
        let name = reader.read_string()?;
        if prefix == b'-' {
            continue;
        }
        if let Some(feature) = FeatureSet::from_target_name(name) {
            features |= feature;
        }
    }
    Ok(features)
}

/// Splits a function body into its local declarations and classified
/// instructions.
fn decode_function(body: FunctionBody<'_>) -> Result<Function, DecodeError> {
    for local in body.get_locals_reader()? {
        local?;
    }

    let mut full_reader = body.get_binary_reader();
    let full = full_reader.read_bytes(full_reader.bytes_remaining())?;

    let operators_reader = body.get_operators_reader()?;
    let mut code_reader = operators_reader.get_binary_reader();
    let code = code_reader.read_bytes(code_reader.bytes_remaining())?;
    let locals = full[..full.len() - code.len()].to_vec();

    let mut instrs = Vec::new();
    let mut reader = BinaryReader::new(code, 0);
    while !reader.eof() {
        let start = reader.original_position();
        let op = reader.read_operator()?;
        let end = reader.original_position();
        instrs.push(Instr::new(InstrKind::classify(&op), code[start..end].to_vec()));
    }

    match instrs.last() {
        Some(last) if last.kind == InstrKind::End => {}
        _ => {
            return Err(DecodeError::Structure(
                "function body does not end with `end`".to_string(),
            ))
        }
    }

    Ok(Function {
        locals,
        body: instrs,
    })
}

fn raw_section(bytes: &[u8], id: u8, range: Range<usize>) -> Section {
    Section::Raw {
        id,
        data: bytes[range].to_vec(),
    }
}

impl Module {
    /// Decodes a binary module.
    ///
    /// Non-strict decoding only requires the binary to be syntactically
    /// well-formed. Strict decoding also validates it against the feature set
    /// it declares (the `target_features` section, or MVP without one).
    pub fn read(bytes: &[u8], strict: bool) -> Result<Module, DecodeError> {
        let mut module = Module::new();
        let mut expected_bodies = 0u32;
        let mut seen_bodies = 0u32;

        for payload in Parser::new(0).parse_all(bytes) {
            match payload? {
                Payload::Version { encoding, .. } => {
                    if encoding != Encoding::Module {
                        return Err(DecodeError::Unsupported(
                            "component binaries are not modules".to_string(),
                        ));
                    }
                }
                Payload::TypeSection(reader) => {
                    let range = reader.range();
                    check_entries(reader)?;
                    module.sections.push(raw_section(bytes, 1, range));
                }
                Payload::ImportSection(reader) => {
                    let range = reader.range();
                    check_entries(reader)?;
                    module.sections.push(raw_section(bytes, 2, range));
                }
                Payload::FunctionSection(reader) => {
                    let range = reader.range();
                    expected_bodies = reader.count();
                    check_entries(reader)?;
                    module.sections.push(raw_section(bytes, 3, range));
                }
                Payload::TableSection(reader) => {
                    let range = reader.range();
                    check_entries(reader)?;
                    module.sections.push(raw_section(bytes, 4, range));
                }
                Payload::MemorySection(reader) => {
                    let range = reader.range();
                    check_entries(reader)?;
                    module.sections.push(raw_section(bytes, 5, range));
                }
                Payload::GlobalSection(reader) => {
                    let range = reader.range();
                    check_entries(reader)?;
                    module.sections.push(raw_section(bytes, 6, range));
                }
                Payload::ExportSection(reader) => {
                    let range = reader.range();
                    check_entries(reader)?;
                    module.sections.push(raw_section(bytes, 7, range));
                }
                Payload::ElementSection(reader) => {
                    let range = reader.range();
                    check_entries(reader)?;
                    module.sections.push(raw_section(bytes, 9, range));
                }
                Payload::DataSection(reader) => {
                    let range = reader.range();
                    check_entries(reader)?;
                    module.sections.push(raw_section(bytes, 11, range));
                }
                Payload::TagSection(reader) => {
                    let range = reader.range();
                    check_entries(reader)?;
                    module.sections.push(raw_section(bytes, 13, range));
                }
                Payload::CustomSection(reader) => {
                    if reader.name() == TARGET_FEATURES {
                        module.features = parse_target_features(reader.data())?;
                        module.has_features_section = true;
                    } else {
                        module.sections.push(Section::Custom {
                            name: reader.name().to_string(),
                            data: reader.data().to_vec(),
                        });
                    }
                }
                Payload::CodeSectionStart { count, .. } => {
                    if count != expected_bodies {
                        return Err(DecodeError::Structure(format!(
                            "function and code section counts differ ({expected_bodies} != {count})"
                        )));
                    }
                    module
                        .sections
                        .push(Section::Code(Vec::with_capacity(count as usize)));
                }
                Payload::CodeSectionEntry(body) => {
                    let function = decode_function(body)?;
                    seen_bodies += 1;
                    if let Some(Section::Code(funcs)) = module.sections.last_mut() {
                        funcs.push(function);
                    }
                }
                Payload::End(_) => {}
                other => match other.as_section() {
                    // start, data count
                    Some((id, range)) if id == 8 || id == 12 => {
                        module.sections.push(raw_section(bytes, id, range));
                    }
                    _ => {
                        return Err(DecodeError::Unsupported(format!(
                            "unexpected payload {other:?}"
                        )))
                    }
                },
            }
        }

        if seen_bodies != expected_bodies {
            return Err(DecodeError::Structure(format!(
                "{expected_bodies} functions declared but {seen_bodies} bodies present"
            )));
        }

        log::debug!(
            "decoded module: {} sections, {} functions, features {}",
            module.sections.len(),
            module.function_count(),
            module.features
        );

        if strict {
            validate_with_diagnostics(&module, module.features)?;
        }
        Ok(module)
    }
}

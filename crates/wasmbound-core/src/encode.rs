//! Binary encoder and source map output.

use std::borrow::Cow;

use serde::Serialize;
use wasm_encoder::{CodeSection, CustomSection, Encode, RawSection};

use crate::decode::TARGET_FEATURES;
use crate::module::{Module, Section};

const SOURCE_MAPPING_URL: &str = "sourceMappingURL";

/// Output of [`Module::write_with_source_map`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutput {
    pub binary: Vec<u8>,
    /// JSON source map, present when a source map URL was requested.
    pub source_map: Option<String>,
}

/// Version 3 source map. Instructions carry no debug locations, so the
/// mapping list is always empty.
#[derive(Serialize)]
struct SourceMap<'a> {
    version: u32,
    sources: &'a [String],
    names: &'a [String],
    mappings: &'a str,
}

impl Module {
    /// Encodes the module to its binary form.
    pub fn write(&self) -> Vec<u8> {
        self.encode(None)
    }

    /// Encodes the module and, when `source_map_url` is set, a source map
    /// referenced from a `sourceMappingURL` section.
    pub fn write_with_source_map(&self, source_map_url: Option<&str>) -> WriteOutput {
        let binary = self.encode(source_map_url);
        let source_map = source_map_url.map(|_| {
            let map = SourceMap {
                version: 3,
                sources: &[],
                names: &[],
                mappings: "",
            };
            // Serializing a struct of strings and integers cannot fail.
            serde_json::to_string(&map).unwrap_or_default()
        });
        WriteOutput { binary, source_map }
    }

    fn encode(&self, source_map_url: Option<&str>) -> Vec<u8> {
        let mut out = wasm_encoder::Module::new();
        for section in &self.sections {
            match section {
                Section::Raw { id, data } => {
                    out.section(&RawSection {
                        id: *id,
                        data: data.as_slice(),
                    });
                }
                Section::Custom { name, data } => {
                    if source_map_url.is_some() && name == SOURCE_MAPPING_URL {
                        continue;
                    }
                    out.section(&CustomSection {
                        name: Cow::Borrowed(name.as_str()),
                        data: Cow::Borrowed(data.as_slice()),
                    });
                }
                Section::Code(funcs) => {
                    let mut code = CodeSection::new();
                    for func in funcs {
                        code.raw(&func.encode());
                    }
                    out.section(&code);
                }
            }
        }

        if self.has_features_section {
            let mut data = Vec::new();
            let names: Vec<&str> = self.features.names().collect();
            (names.len() as u32).encode(&mut data);
            for name in names {
                data.push(b'+');
                name.encode(&mut data);
            }
            out.section(&CustomSection {
                name: Cow::Borrowed(TARGET_FEATURES),
                data: Cow::Owned(data),
            });
        }

        if let Some(url) = source_map_url {
            let mut data = Vec::new();
            url.encode(&mut data);
            out.section(&CustomSection {
                name: Cow::Borrowed(SOURCE_MAPPING_URL),
                data: Cow::Owned(data),
            });
        }

        out.finish()
    }
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use wasmbound::{
    allocate_and_write, read_binary, run_passes, translate_to_fuzz, validate_full, FeatureSet,
    Module, OptimizationPass, PassSettings,
};
use wasmbound_core::validate_with_diagnostics;

/// wasmbound: read, optimize, validate and synthesize WebAssembly modules.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run optimization passes over a module
    Opt {
        /// Input WebAssembly binary (.wasm)
        input: PathBuf,

        /// Output WebAssembly binary
        #[arg(long, short)]
        output: PathBuf,

        /// Optimization level: 0-4, s or z
        #[arg(short = 'O', default_value = "0", value_parser = parse_opt_level)]
        level: OptLevel,

        /// Comma-separated passes to run instead of the default pipeline
        #[arg(long, value_delimiter = ',')]
        passes: Option<Vec<OptimizationPass>>,

        /// Drop debug information in the default pipeline
        #[arg(long)]
        strip_debug_info: bool,

        /// Emit `<output>.map` and reference it from the module
        #[arg(long)]
        source_map_url: Option<String>,
    },

    /// Synthesize a valid module from arbitrary seed bytes
    Fuzz {
        /// File whose bytes drive generation
        seed: PathBuf,

        /// Output WebAssembly binary
        #[arg(long, short)]
        output: PathBuf,

        /// Allowed features: `mvp`, `all` or a comma-separated list
        #[arg(long, default_value = "mvp")]
        features: FeatureSet,
    },

    /// Check a module for validity; the exit status reports the outcome
    Validate {
        /// Input WebAssembly binary (.wasm)
        input: PathBuf,

        /// Validate against these features instead of the module's own
        #[arg(long, conflicts_with = "full")]
        features: Option<FeatureSet>,

        /// Validate with every known feature enabled
        #[arg(long)]
        full: bool,
    },

    /// Print a module in text format
    Print {
        /// Input WebAssembly binary (.wasm)
        input: PathBuf,
    },

    /// List the registered passes
    Passes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OptLevel {
    optimize: u32,
    shrink: u32,
}

fn parse_opt_level(s: &str) -> Result<OptLevel, String> {
    let (optimize, shrink) = match s {
        "s" => (2, 1),
        "z" => (2, 2),
        _ => match s.parse::<u32>() {
            Ok(n @ 0..=4) => (n, 0),
            _ => return Err(format!("expected 0-4, s or z, got `{s}`")),
        },
    };
    Ok(OptLevel { optimize, shrink })
}

fn read_module(path: &Path) -> Result<Module> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    read_binary(&bytes).with_context(|| format!("failed to decode {}", path.display()))
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Opt {
            input,
            output,
            level,
            passes,
            strip_debug_info,
            source_map_url,
        } => {
            eprintln!("wasmbound: optimizing {}", input.display());
            let mut module = read_module(&input)?;
            let settings = PassSettings {
                shrink_level: level.shrink,
                optimize_level: level.optimize,
                debug_info: !strip_debug_info,
            };
            let before = module.instruction_count();
            run_passes(&mut module, passes.as_deref(), settings);
            eprintln!(
                "wasmbound: {} -> {} instructions",
                before,
                module.instruction_count()
            );

            let result = allocate_and_write(&module, source_map_url.as_deref());
            write_file(&output, result.binary())?;
            eprintln!("wasmbound: wrote {}", output.display());
            if let Some(map) = result.source_map() {
                let mut map_path = output.into_os_string();
                map_path.push(".map");
                let map_path = PathBuf::from(map_path);
                write_file(&map_path, map.as_bytes())?;
                eprintln!("wasmbound: wrote {}", map_path.display());
            }
            result.dispose();
        }
        Command::Fuzz {
            seed,
            output,
            features,
        } => {
            let data = fs::read(&seed).with_context(|| format!("failed to read {}", seed.display()))?;
            eprintln!(
                "wasmbound: translating {} bytes with features [{}]",
                data.len(),
                features
            );
            let module = translate_to_fuzz(&data, features);
            write_file(&output, &module.write())?;
            eprintln!(
                "wasmbound: wrote {} ({} functions)",
                output.display(),
                module.function_count()
            );
        }
        Command::Validate {
            input,
            features,
            full,
        } => {
            let mut module = read_module(&input)?;
            let valid = if full {
                validate_full(&mut module)
            } else {
                let features = features.unwrap_or(module.features());
                match validate_with_diagnostics(&module, features) {
                    Ok(()) => true,
                    Err(err) => {
                        eprintln!("wasmbound: {err}");
                        false
                    }
                }
            };
            if !valid {
                eprintln!("wasmbound: {} is invalid", input.display());
                return Ok(ExitCode::FAILURE);
            }
            eprintln!("wasmbound: {} is valid", input.display());
        }
        Command::Print { input } => {
            let module = read_module(&input)?;
            let text = module.to_text().context("failed to print module")?;
            print!("{text}");
        }
        Command::Passes => {
            for pass in OptimizationPass::ALL {
                println!("{:<24} {}", pass.name(), pass.description());
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

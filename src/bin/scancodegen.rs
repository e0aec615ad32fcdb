// Scancodegen CLI
// Compile a scancode table into decoder source

#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use anyhow::Context;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
use scancodegen_core::{compile, render, EmitOptions, Layout, Target, DEFAULT_QUEUE_CAPACITY};

/// Scancode table compiler
#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "scancodegen")]
#[command(version)]
#[command(about = "Compile a keyboard scancode table into decoder source", long_about = None)]
struct Args {
    /// Scancode table: one `<hex bytes>\t<label>` row per line
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Generated source file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// TOML layout file (defaults to the user layout, then the US layout)
    #[arg(short, long, value_name = "FILE")]
    layout: Option<PathBuf>,

    /// Output language: rust or cpp
    #[arg(short, long, default_value_t = Target::Rust)]
    target: Target,

    /// Capacity of the generated key queue
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[cfg(feature = "cli")]
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    // RUST_LOG still wins when set
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init();
}

#[cfg(feature = "cli")]
fn load_layout(path: Option<&Path>) -> anyhow::Result<Layout> {
    match path {
        Some(path) => Layout::from_file(path)
            .with_context(|| format!("failed to load layout {}", path.display())),
        None => Layout::load_default().context("failed to load default layout"),
    }
}

/// Compile `args.input` and write the generated source to `args.output`
///
/// The whole artifact is rendered before the output file is touched, so a
/// failed compilation never leaves a partial file behind.
#[cfg(feature = "cli")]
fn run(args: &Args) -> anyhow::Result<()> {
    let layout = load_layout(args.layout.as_deref())?;

    let source = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let compilation = compile(&source, &layout)
        .with_context(|| format!("failed to compile {}", args.input.display()))?;

    let options = EmitOptions {
        queue_capacity: args.queue_capacity,
        source_name: args
            .input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
    };
    let generated = render(&compilation, args.target, &options);

    std::fs::write(&args.output, generated)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    log::info!(
        "wrote {} keys, {} levels to {}",
        compilation.registry.len(),
        compilation.automaton.levels().len(),
        args.output.display()
    );
    Ok(())
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(&args)
}

// Stub for when the cli feature is not enabled
#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("Error: scancodegen binary requires the 'cli' feature to be enabled.");
    std::process::exit(1);
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    const TABLE: &str = "1C\tA pressed\nF0,1C\tA released\nE0,75\tcursor up pressed\n";

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["scancodegen", "set2.tsv", "keycodes.h", "--target", "cpp", "-v"]);
        assert_eq!(args.input, PathBuf::from("set2.tsv"));
        assert_eq!(args.output, PathBuf::from("keycodes.h"));
        assert_eq!(args.target, Target::Cpp);
        assert_eq!(args.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(args.verbose);
        assert!(args.layout.is_none());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["scancodegen", "in", "out"]);
        assert_eq!(args.target, Target::Rust);
        assert!(!args.verbose);
    }

    #[test]
    fn test_missing_output_is_rejected() {
        assert!(Args::try_parse_from(["scancodegen", "in"]).is_err());
        assert!(Args::try_parse_from(["scancodegen"]).is_err());
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        assert!(Args::try_parse_from(["scancodegen", "in", "out", "--target", "go"]).is_err());
    }

    #[test]
    fn test_run_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("set2.tsv");
        let output = dir.path().join("keycodes.rs");
        std::fs::write(&input, TABLE).unwrap();

        let args = Args::parse_from([
            OsStr::new("scancodegen"),
            input.as_os_str(),
            output.as_os_str(),
            OsStr::new("--queue-capacity"),
            OsStr::new("16"),
        ]);
        run(&args).unwrap();

        let generated = std::fs::read_to_string(&output).unwrap();
        assert!(generated.contains("@generated by scancodegen from set2.tsv"));
        assert!(generated.contains("pub const QUEUE_CAPACITY: usize = 16;"));
        assert!(generated.contains("Cursor_Up = 1,"));
    }

    #[test]
    fn test_run_with_layout_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("table.tsv");
        let layout = dir.path().join("layout.toml");
        let output = dir.path().join("keycodes.h");
        std::fs::write(&input, "12\tLeft Shift pressed\n1C\tA pressed\n").unwrap();
        std::fs::write(&layout, "modifiers = [\"Left_Shift\"]\n").unwrap();

        let args = Args::parse_from([
            OsStr::new("scancodegen"),
            input.as_os_str(),
            output.as_os_str(),
            OsStr::new("--layout"),
            layout.as_os_str(),
            OsStr::new("--target"),
            OsStr::new("cpp"),
        ]);
        run(&args).unwrap();

        let generated = std::fs::read_to_string(&output).unwrap();
        assert!(generated.contains("case Key::Left_Shift: return 1;"));
    }

    #[test]
    fn test_failed_compile_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.tsv");
        let output = dir.path().join("out.rs");
        std::fs::write(&input, "E0\tEscape pressed\nE0,48\tcursor up pressed\n").unwrap();

        let args = Args::parse_from([
            OsStr::new("scancodegen"),
            input.as_os_str(),
            output.as_os_str(),
        ]);
        let err = run(&args).unwrap_err();
        assert!(format!("{err:#}").contains("bad.tsv"));
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_input_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args::parse_from([
            OsStr::new("scancodegen"),
            dir.path().join("missing.tsv").as_os_str(),
            dir.path().join("out.rs").as_os_str(),
            OsStr::new("--layout"),
            dir.path().join("missing.toml").as_os_str(),
        ]);
        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }
}

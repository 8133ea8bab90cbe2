use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use ledgermash_common::SourceSet;
use ledgermash_eval::{BUILTIN_LIBRARIES, Engine, SourceProvider, builtin_library};
use ledgermash_io::{CsvSourceProvider, load_libraries, load_run_config};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(
    name = "ledgermash",
    version,
    about = "Evaluate source.field formulas over CSV exports, grouped by a business key"
)]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a configured formula and print one row per unique key.
    Run(RunArgs),
    /// Print column profiles and probability curves for CSV sources.
    Profile(ProfileArgs),
    /// List library functions, parameters and attributes.
    Functions(FunctionsArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Run configuration (.yaml, .yml or .json).
    #[arg(long, short)]
    config: PathBuf,

    /// Bind a source name to a CSV file, e.g. `loan=exports/loans.csv`. May be repeated.
    #[arg(long = "source", value_parser = parse_binding)]
    sources: Vec<(String, PathBuf)>,

    /// Directory searched for `<source>.csv` when a source has no explicit path.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Emit JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct ProfileArgs {
    /// Source to profile as `name=path`. May be repeated.
    #[arg(long = "source", value_parser = parse_binding, required = true)]
    sources: Vec<(String, PathBuf)>,

    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct FunctionsArgs {
    /// Only this library.
    #[arg(long)]
    library: Option<String>,
}

fn parse_binding(raw: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=path, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() || path.trim().is_empty() {
        return Err(format!("expected name=path, got `{raw}`"));
    }
    Ok((name.to_string(), PathBuf::from(path.trim())))
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Run(args) => run(args),
        Command::Profile(args) => profile(args),
        Command::Functions(args) => functions(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let config = load_run_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let base_dir = args
        .config
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let libraries = load_libraries(&config, &base_dir).context("loading libraries")?;
    let mut provider = CsvSourceProvider::from_config(&config, &base_dir);
    for (name, path) in args.sources {
        provider = provider.with_path(name, path);
    }
    provider = provider.with_data_dir(args.data_dir.unwrap_or(base_dir));

    let columns = config.presentation.columns.clone();
    let engine = Engine::new(config, libraries).context("preparing run")?;
    tracing::debug!(sources = ?engine.required_sources(), "acquiring sources");
    let results = engine.run_with(&provider).context("run failed")?;

    if args.json {
        println!("{}", render::results_json(&results, &columns)?);
    } else {
        print!("{}", render::results_table(&results, &columns));
    }
    Ok(())
}

fn profile(args: ProfileArgs) -> Result<()> {
    let provider = args
        .sources
        .iter()
        .fold(CsvSourceProvider::new(), |p, (name, path)| p.with_path(name.clone(), path.clone()));
    let sources: SourceSet = args
        .sources
        .iter()
        .map(|(name, _)| provider.acquire(name))
        .collect::<Result<_, _>>()
        .context("reading sources")?;

    let analytics = ledgermash_eval::compute_analytics(&sources, &Default::default());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&analytics)?);
    } else {
        print!("{}", render::profiles_table(&analytics));
    }
    Ok(())
}

fn functions(args: FunctionsArgs) -> Result<()> {
    let names: Vec<&str> = match args.library.as_deref() {
        Some(name) if !BUILTIN_LIBRARIES.contains(&name) => {
            bail!(
                "unknown library `{name}` (available: {})",
                BUILTIN_LIBRARIES.join(", ")
            )
        }
        Some(name) => vec![name],
        None => BUILTIN_LIBRARIES.to_vec(),
    };
    for name in names {
        if let Some(library) = builtin_library(name) {
            println!("{}", render::library_listing(&library));
        }
    }
    Ok(())
}

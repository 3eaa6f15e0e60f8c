#![forbid(unsafe_code)]

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use jsparse_bench::pipeline::Mode;
use jsparse_bench::run_cmd::{self, CompilerChoice, Overrides};

#[derive(Parser, Debug)]
#[command(name = "jsparse-bench")]
#[command(about = "Benchmark JavaScript parsing and type annotation in legacy and transpiling modes", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set JSPARSE_BENCH_LOG)
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct CommonArgs {
    /// Harness config file (default: ./jsparse-bench.toml if present)
    #[arg(long)]
    config: Option<std::path::PathBuf>,
    /// Directory holding the cached fixture
    #[arg(long)]
    cache_dir: Option<std::path::PathBuf>,
    /// Externs zip archive (default: the embedded one)
    #[arg(long)]
    externs_archive: Option<std::path::PathBuf>,
    /// Continue when a required extern is missing from the archive
    #[arg(long)]
    allow_missing_externs: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Legacy,
    Modern,
    All,
}

impl ModeArg {
    fn modes(self) -> Vec<Mode> {
        match self {
            ModeArg::Legacy => vec![Mode::Legacy],
            ModeArg::Modern => vec![Mode::ModernToLegacy],
            ModeArg::All => Mode::ALL.to_vec(),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CompilerArg {
    Mock,
    Closure,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Measure one or both language modes
    Run {
        #[command(flatten)]
        common: CommonArgs,
        /// Which mode to measure
        #[arg(long, value_enum, default_value_t = ModeArg::All)]
        mode: ModeArg,
        /// Compiler collaborator
        #[arg(long, value_enum, default_value_t = CompilerArg::Closure)]
        compiler: CompilerArg,
        /// Path to closure-compiler.jar
        #[arg(long, default_value = "closure-compiler.jar")]
        closure_jar: std::path::PathBuf,
        /// Path to the java binary
        #[arg(long)]
        java: Option<std::path::PathBuf>,
        /// Extra compiler flag, e.g. --closure-flag=--summary_detail_level=3 (repeatable)
        #[arg(long = "closure-flag", allow_hyphen_values = true)]
        closure_flags: Vec<String>,
        /// Number of measured iterations to run
        #[arg(long)]
        iterations: Option<usize>,
        /// Number of warmup iterations to run before measuring
        #[arg(long)]
        warmup: Option<usize>,
        /// Worker threads sharing the measured iterations
        #[arg(long)]
        threads: Option<usize>,
        /// Write machine-readable JSON report to this file
        #[arg(long)]
        json: Option<std::path::PathBuf>,
        /// Append records to this JSONL file
        #[arg(long)]
        jsonl: Option<std::path::PathBuf>,
    },

    /// Download the fixture into the cache if it is not there yet
    Fetch {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// List the resolved externs
    Externs {
        #[command(flatten)]
        common: CommonArgs,
        /// Read the externs bundled in this closure-compiler.jar
        #[arg(long)]
        closure_jar: Option<std::path::PathBuf>,
    },

    /// Print stored records from a JSONL file
    Summary {
        /// JSONL file written by `run --jsonl`
        #[arg(long)]
        jsonl: std::path::PathBuf,
        /// Only show records for this mode
        #[arg(long, value_enum, default_value_t = ModeArg::All)]
        mode: ModeArg,
    },
}

impl CommonArgs {
    fn into_overrides(self) -> Overrides {
        Overrides {
            config: self.config,
            cache_dir: self.cache_dir,
            externs_archive: self.externs_archive,
            allow_missing_externs: self.allow_missing_externs,
            ..Default::default()
        }
    }
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("JSPARSE_BENCH_LOG").unwrap_or_else(|_| {
        if verbose { "jsparse_bench=debug".to_string() } else { "jsparse_bench=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run { common, mode, compiler, closure_jar, java, closure_flags, iterations, warmup, threads, json, jsonl } => {
            let modes = mode.modes();
            let compiler = match compiler {
                CompilerArg::Mock => CompilerChoice::Mock,
                CompilerArg::Closure => CompilerChoice::Closure { jar: closure_jar, java, flags: closure_flags },
            };
            let overrides = Overrides { iterations, warmup, threads, ..common.into_overrides() };
            run_cmd::run(modes, compiler, overrides, json, jsonl).map(|_| ())
        }
        Commands::Fetch { common } => run_cmd::fetch(common.into_overrides()),
        Commands::Externs { common, closure_jar } => run_cmd::externs(common.into_overrides(), closure_jar),
        Commands::Summary { jsonl, mode } => {
            let filter = match mode {
                ModeArg::Legacy => Some(Mode::Legacy),
                ModeArg::Modern => Some(Mode::ModernToLegacy),
                ModeArg::All => None,
            };
            run_cmd::summary(&jsonl, filter).map(|lines| {
                for line in lines {
                    println!("{line}");
                }
            })
        }
    };

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use curvegate_adapters::{
    FsAnswerStore, StoreLayout, TestLocation, read_answer_files, read_stats_file,
};
use curvegate_app::{
    CheckRequest, CheckUseCase, Clock, Overrides, StatsUseCase, SystemClock, build_run_report,
    outcome_from_comparison, parse_config, render_run_report, render_test,
};
use curvegate_domain::{Baseline, compare, new_analyzer};
use curvegate_types::{
    AnalysisSettings, AnalyzerKind, DEFAULT_BASE_SUFFIX, DEFAULT_SIGNIFICANT_DIGITS,
    DEFAULT_STDDEV_MULTIPLIER, RunReport, TestResult, ToolInfo,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code when at least one test did not pass.
const EXIT_FAILED: u8 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "curvegate",
    version,
    about = "Regression oracle for simulation output curves"
)]
struct Cli {
    /// Log debug detail to stderr
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compare one test output against a baseline answer file or a stats file.
    Compare {
        /// Baseline answer file. Repeat to merge partitioned files.
        #[arg(long, required_unless_present = "stats", conflicts_with = "stats")]
        baseline: Vec<PathBuf>,

        /// Stats file built from historical runs (used instead of --baseline)
        #[arg(long)]
        stats: Option<PathBuf>,

        /// Test output answer file. Repeat to merge partitioned files.
        #[arg(long = "test", required = true)]
        test: Vec<PathBuf>,

        /// absolute | range | stddev
        #[arg(long, default_value = "absolute")]
        mode: AnalyzerKind,

        #[arg(long, default_value_t = DEFAULT_SIGNIFICANT_DIGITS,
              value_parser = clap::value_parser!(u32).range(1..))]
        significant_digits: u32,

        #[arg(long, default_value_t = DEFAULT_STDDEV_MULTIPLIER)]
        stddev_multiplier: f64,

        /// Test name used in the report (default: first test file stem)
        #[arg(long)]
        name: Option<String>,

        /// Write a JSON report here
        #[arg(long)]
        out: Option<PathBuf>,

        /// Pretty-print JSON
        #[arg(long, default_value_t = false)]
        pretty: bool,

        /// Skip per-curve tables
        #[arg(long, default_value_t = false)]
        brief: bool,
    },

    /// Compute stats for one test from its historical baseline runs.
    Stats {
        /// Root holding <suite>/<run>/<test>.<base_suffix>
        #[arg(long)]
        baseline_dir: PathBuf,

        /// Root of run directories; the stats land in <output_dir>/<suite>/<test>/
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        #[arg(long)]
        suite: String,

        #[arg(long = "test")]
        test: String,

        #[arg(long, default_value = DEFAULT_BASE_SUFFIX)]
        base_suffix: String,

        /// Also print the stats to stdout
        #[arg(long, default_value_t = false)]
        print: bool,
    },

    /// Run the suites of a config file and write the text log and JSON report.
    Check {
        #[arg(long, default_value = "curvegate.toml")]
        config: PathBuf,

        /// Suite to run. Repeatable; default is every configured suite.
        #[arg(long = "suite")]
        suites: Vec<String>,

        /// Test to run in each selected suite. Repeatable.
        #[arg(long = "test")]
        tests: Vec<String>,

        #[arg(long)]
        mode: Option<AnalyzerKind>,

        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        significant_digits: Option<u32>,

        #[arg(long)]
        stddev_multiplier: Option<f64>,

        #[arg(long)]
        baseline_dir: Option<PathBuf>,

        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Skip per-curve tables
        #[arg(long, default_value_t = false)]
        brief: bool,

        /// Text log path (default: stdout)
        #[arg(long)]
        log: Option<PathBuf>,

        /// Write a JSON report here
        #[arg(long)]
        out: Option<PathBuf>,

        /// Pretty-print JSON
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },

    /// Render a JSON report as the text log.
    Report {
        #[arg(long)]
        report: PathBuf,

        #[arg(long, default_value_t = false)]
        brief: bool,
    },
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn real_main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Command::Compare {
            baseline,
            stats,
            test,
            mode,
            significant_digits,
            stddev_multiplier,
            name,
            out,
            pretty,
            brief,
        } => {
            let test_set = read_answer_files(&test).context("read test output")?;
            let mut analyzer = new_analyzer(mode, significant_digits, stddev_multiplier);

            let comparison = match &stats {
                Some(path) => {
                    let stats = read_stats_file(path).context("read stats")?;
                    compare(Baseline::Stats(&stats), &test_set, analyzer.as_mut())
                }
                None => {
                    let base = read_answer_files(&baseline).context("read baseline")?;
                    compare(Baseline::Answers(&base), &test_set, analyzer.as_mut())
                }
            };

            let test_name = name.unwrap_or_else(|| default_test_name(&test));
            let result = TestResult {
                suite: "compare".to_string(),
                test: test_name,
                outcome: outcome_from_comparison(comparison),
            };
            print!("{}", render_test(&result, significant_digits, brief));

            let passed = result.outcome.is_passed();
            if let Some(out) = out {
                let settings = AnalysisSettings {
                    mode,
                    significant_digits,
                    stddev_multiplier,
                };
                let report = build_run_report(
                    tool_info(),
                    uuid::Uuid::new_v4().to_string(),
                    SystemClock.now_rfc3339(),
                    settings,
                    vec![result],
                );
                write_json(&out, &report, pretty)?;
            }

            Ok(exit_code(passed))
        }

        Command::Stats {
            baseline_dir,
            output_dir,
            suite,
            test,
            base_suffix,
            print,
        } => {
            let layout = StoreLayout {
                baseline_dir,
                output_dir,
                base_suffix,
                ..StoreLayout::default()
            };
            let location = TestLocation::new(suite, test, layout);
            let outcome = StatsUseCase::new(FsAnswerStore).execute(&location)?;

            if print {
                print!("{}", curvegate_stats::render_stats(&outcome.stats));
            }
            eprintln!(
                "wrote {} from {} historical run(s)",
                outcome.path.display(),
                outcome.runs
            );
            Ok(ExitCode::SUCCESS)
        }

        Command::Check {
            config,
            suites,
            tests,
            mode,
            significant_digits,
            stddev_multiplier,
            baseline_dir,
            output_dir,
            brief,
            log,
            out,
            pretty,
        } => {
            let text = fs::read_to_string(&config)
                .with_context(|| format!("read config {}", config.display()))?;
            let config_file =
                parse_config(&text).with_context(|| format!("load {}", config.display()))?;

            let overrides = Overrides {
                mode,
                significant_digits,
                stddev_multiplier,
                baseline_dir,
                output_dir,
                brief: brief.then_some(true),
            };

            let outcome = CheckUseCase::new(FsAnswerStore, SystemClock).execute(CheckRequest {
                config: config_file,
                suites,
                tests,
                overrides,
                tool: tool_info(),
            })?;

            match log {
                Some(path) => {
                    ensure_parent(&path)?;
                    atomic_write(&path, outcome.log.as_bytes())?;
                }
                None => print!("{}", outcome.log),
            }
            if let Some(out) = out {
                write_json(&out, &outcome.report, pretty)?;
            }

            Ok(exit_code(!outcome.failed))
        }

        Command::Report { report, brief } => {
            let report: RunReport = read_json(&report)?;
            print!("{}", render_run_report(&report, brief));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_code(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILED)
    }
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "curvegate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

fn default_test_name(files: &[PathBuf]) -> String {
    files
        .first()
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "test".to_string())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let v =
        serde_json::from_slice(&bytes).with_context(|| format!("parse json {}", path.display()))?;
    Ok(v)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T, pretty: bool) -> anyhow::Result<()> {
    ensure_parent(path)?;

    let bytes = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };

    atomic_write(path, &bytes)
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    Ok(())
}

fn atomic_write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    use std::io::Write;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = parent.to_path_buf();
    tmp.push(format!(".{}.tmp", uuid::Uuid::new_v4()));

    {
        let mut f =
            fs::File::create(&tmp).with_context(|| format!("create temp {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("write temp {}", tmp.display()))?;
        f.sync_all().ok();
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use schemars::{Schema, schema_for};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Repo automation for curvegate")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// (Re)generate JSON Schemas for the run report and the config file.
    Schema {
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,

        /// Fail instead of writing when the committed schemas are stale.
        #[arg(long, default_value_t = false)]
        check: bool,
    },

    /// fmt, clippy, tests, then a schema drift check.
    Ci,
}

fn main() -> anyhow::Result<()> {
    match Cli::parse().cmd {
        Command::Schema { out_dir, check } => cmd_schema(&out_dir, check),
        Command::Ci => cmd_ci(),
    }
}

fn schemas() -> Vec<(&'static str, Schema)> {
    vec![
        (
            "curvegate.report.v1.schema.json",
            schema_for!(curvegate_types::RunReport),
        ),
        (
            "curvegate.config.v1.schema.json",
            schema_for!(curvegate_types::ConfigFile),
        ),
    ]
}

fn cmd_schema(out_dir: &Path, check: bool) -> anyhow::Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("create dir {}", out_dir.display()))?;

    let mut stale = Vec::new();
    for (name, schema) in schemas() {
        let path = out_dir.join(name);
        let mut json = serde_json::to_string_pretty(&schema)?;
        json.push('\n');

        if check {
            let current = fs::read_to_string(&path).unwrap_or_default();
            if current != json {
                stale.push(path.display().to_string());
            }
        } else {
            fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
        }
    }

    if !stale.is_empty() {
        anyhow::bail!(
            "schemas out of date (run `cargo run -p xtask -- schema`): {}",
            stale.join(", ")
        );
    }
    Ok(())
}

fn cmd_ci() -> anyhow::Result<()> {
    cargo(&["fmt", "--all", "--", "--check"])?;
    cargo(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])?;
    cargo(&["test", "--workspace"])?;
    cargo(&["run", "-p", "xtask", "--", "schema", "--check"])
}

fn cargo(args: &[&str]) -> anyhow::Result<()> {
    let status = std::process::Command::new("cargo")
        .args(args)
        .status()
        .with_context(|| format!("running cargo {}", args.join(" ")))?;
    if !status.success() {
        anyhow::bail!("cargo {} failed: {status}", args.join(" "));
    }
    Ok(())
}

//! Trial Run: executes the bundled suite against the reference block world.
//!
//! Selection, the tick budget and the engine configuration come from the
//! command line. The summary table goes to stdout, the JSON report to
//! `--json` if given, and the exit code is non-zero when any required test
//! did not pass.

mod demo;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trial::engine::{EngineConfig, Registry, RunPlan, Scheduler};
use trial::sim::BlockWorld;

#[derive(Parser, Debug)]
#[command(name = "trial-run")]
#[command(about = "Run the bundled trial suite against the reference block world")]
struct Cli {
    /// Engine configuration (TOML); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only run tests carrying this tag (repeatable; any tag matches)
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Only run tests whose `category:name` contains this text
    #[arg(long)]
    name: Option<String>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Tick budget; work still outstanding when it runs out is cancelled
    #[arg(long, default_value = "10000")]
    budget: u64,

    /// Run optional tests (overrides the configuration)
    #[arg(long)]
    include_optional: Option<bool>,

    /// List the selected tests and exit
    #[arg(long)]
    list: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trial_run=info,trial_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<u8> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };

    let mut registry: Registry<BlockWorld> = Registry::new(config.defaults.clone());
    demo::register(&mut registry).context("failed to register the demo suite")?;

    let include_optional = cli.include_optional.unwrap_or(config.include_optional);
    let mut plan = RunPlan::all().include_optional(include_optional);
    for tag in &cli.tags {
        plan = plan.tag(tag.as_str());
    }
    if let Some(name) = &cli.name {
        plan = plan.name_contains(name.as_str());
    }
    let selection = plan.select(&registry);
    if selection.run.is_empty() && selection.skipped.is_empty() {
        bail!("no test matches the selection");
    }

    if cli.list {
        for def in &selection.run {
            println!("{}", def.meta.qualified_name());
        }
        for meta in &selection.skipped {
            println!("{} (skipped)", meta.qualified_name());
        }
        return Ok(0);
    }

    info!(
        selected = selection.run.len(),
        skipped = selection.skipped.len(),
        budget = cli.budget,
        "starting run"
    );
    let mut scheduler =
        Scheduler::new(config, BlockWorld::new()).context("invalid engine configuration")?;
    for rejected in scheduler.schedule(selection) {
        warn!("{rejected}");
    }
    let report = scheduler.run_until_idle(cli.budget);

    print!("{}", report.render_table());
    if let Some(path) = &cli.json {
        report
            .write_json(path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }
    info!(
        ticks = report.ticks,
        passed = report.passed,
        retries = scheduler.reporter().retries(),
        "run finished"
    );
    Ok(report.exit_code() as u8)
}

fn load_config(path: &Path) -> anyhow::Result<EngineConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: EngineConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_repeated_tags() {
        let cli = Cli::try_parse_from([
            "trial-run",
            "--tag",
            "redstone",
            "--tag",
            "physics",
            "--budget",
            "50",
            "--include-optional",
            "false",
        ])
        .unwrap();
        assert_eq!(cli.tags, vec!["redstone", "physics"]);
        assert_eq!(cli.budget, 50);
        assert_eq!(cli.include_optional, Some(false));
        assert!(!cli.list);
    }

    #[test]
    fn config_file_round_trips_through_validation() {
        let dir = std::env::temp_dir().join(format!("trial-run-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("engine.toml");
        fs::write(&path, "width = 64\ndepth = 32\n\n[defaults]\nmax_ticks = 40\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.defaults.max_ticks, 40);

        fs::write(&path, "width = 0\n").unwrap();
        assert!(load_config(&path).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }
}

//! Runner launcher.
//!
//! Builds a runner from flags (and an optional TOML file), runs its first
//! arrival cycle in this process, and exits once a station has accepted it.
//! From then on the runner lives inside station hosts.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;

use tag_runner::core::state::Runner;
use tag_runner::cycle::{CycleEnv, Handoff, top_level};
use tag_runner::exit_codes;
use tag_runner::io::config::{RunnerConfig, load_config};
use tag_runner::io::registry_client::HttpDirectory;
use tag_runner::io::sleeper::ThreadSleeper;
use tag_runner::logging;

#[derive(Parser, Debug)]
#[command(
    name = "runner",
    version,
    about = "Launch a tag runner into the station network"
)]
struct Cli {
    /// Emit the runner's diagnostic trace.
    #[arg(long)]
    debug: bool,

    /// Identity string printed in diagnostics (defaults to a random UUID).
    #[arg(long)]
    id: Option<String>,

    /// Restraint pause in milliseconds.
    #[arg(short = 'r', long, allow_negative_numbers = true)]
    restraint_ms: Option<i64>,

    /// Delay between discovery queries that found nothing, in milliseconds.
    #[arg(short = 'q', long, allow_negative_numbers = true)]
    retry_ms: Option<i64>,

    /// Maximum number of stations returned per discovery query.
    #[arg(short = 'm', long, allow_negative_numbers = true)]
    max_results: Option<i64>,

    /// Start the game as IT.
    #[arg(long)]
    it: bool,

    /// Discovery registry base URL.
    #[arg(long)]
    registry: Option<String>,

    /// TOML configuration file; flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    logging::init();
    match run(cli) {
        Ok(handoff) => {
            println!(
                "runner handed off: station={} jump={}",
                handoff.destination, handoff.jump_count
            );
            std::process::exit(exit_codes::OK);
        }
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FATAL);
        }
    }
}

fn run(cli: Cli) -> Result<Handoff> {
    let cfg = resolve_config(&cli)?;
    let mut runner = build_runner(&cli, &cfg)?;
    let directory = HttpDirectory::new(&cfg.registry_url, cfg.timeouts())?;
    info!(
        runner = %runner.id(),
        it = runner.is_it(),
        registry = %directory.registry_url(),
        "launching runner"
    );

    let mut rng = rand::thread_rng();
    let mut env = CycleEnv {
        directory: &directory,
        sleeper: &ThreadSleeper,
        rng: &mut rng,
    };
    top_level(&mut runner, &mut env)
}

/// File values (or defaults) with command line overrides applied.
fn resolve_config(cli: &Cli) -> Result<RunnerConfig> {
    let mut cfg = match &cli.config {
        Some(path) => load_config(path).context("load runner config")?,
        None => RunnerConfig::default(),
    };
    if cli.debug {
        cfg.debug = true;
    }
    if let Some(ms) = cli.restraint_ms {
        cfg.restraint_ms = ms;
    }
    if let Some(ms) = cli.retry_ms {
        cfg.retry_ms = ms;
    }
    if let Some(n) = cli.max_results {
        cfg.max_results = n;
    }
    if let Some(url) = &cli.registry {
        cfg.registry_url = url.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn build_runner(cli: &Cli, cfg: &RunnerConfig) -> Result<Runner> {
    let mut runner = Runner::new(cfg.settings());
    if let Some(id) = &cli.id {
        runner.set_id(id.clone());
    }
    if runner.settings().max_results() == 0 {
        bail!("max_results must be at least 1");
    }
    if cli.it {
        runner.mark_it();
    }
    Ok(runner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parse_all_flags() {
        let cli = Cli::parse_from([
            "runner",
            "--debug",
            "--id",
            "scout",
            "-r",
            "100",
            "-q",
            "200",
            "-m",
            "3",
            "--it",
        ]);
        let cfg = resolve_config(&cli).expect("config");
        let runner = build_runner(&cli, &cfg).expect("runner");

        assert_eq!(runner.id(), "scout");
        assert!(runner.is_it());
        assert!(runner.settings().debug());
        assert_eq!(runner.settings().restraint(), Duration::from_millis(100));
        assert_eq!(runner.settings().retry_delay(), Duration::from_millis(200));
        assert_eq!(runner.settings().max_results(), 3);
    }

    #[test]
    fn negative_delays_clamp_to_zero() {
        let cli = Cli::parse_from(["runner", "--restraint-ms", "-50"]);
        let cfg = resolve_config(&cli).expect("config");
        let runner = build_runner(&cli, &cfg).expect("runner");
        assert_eq!(runner.settings().restraint(), Duration::ZERO);
    }

    #[test]
    fn unknown_flag_is_a_usage_error() {
        let err = Cli::try_parse_from(["runner", "--bogus"]).expect_err("unknown flag");
        assert_eq!(err.exit_code(), exit_codes::USAGE);
    }

    #[test]
    fn malformed_number_is_a_usage_error() {
        let err = Cli::try_parse_from(["runner", "-m", "lots"]).expect_err("bad number");
        assert_eq!(err.exit_code(), exit_codes::USAGE);
    }

    #[test]
    fn zero_max_results_is_rejected() {
        let cli = Cli::parse_from(["runner", "-m", "0"]);
        let cfg = resolve_config(&cli).expect("config");
        assert!(build_runner(&cli, &cfg).is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("runner.toml");
        std::fs::write(&path, "retry_ms = 900\nmax_results = 4\n").expect("write");
        let cli = Cli::parse_from([
            "runner",
            "--config",
            path.to_str().expect("utf-8 path"),
            "-m",
            "6",
        ]);

        let cfg = resolve_config(&cli).expect("config");

        assert_eq!(cfg.retry_ms, 900);
        assert_eq!(cfg.max_results, 6);
    }
}

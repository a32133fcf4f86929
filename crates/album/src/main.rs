//! Album CLI - fingerprint every photo under a directory and build thumbnails.
//!
//! Results are cached in `<root>/.album`, so running again over an unchanged
//! tree does no image work.
//!
//! # Usage
//!
//! ```bash
//! # Scan a tree
//! album --root ~/Pictures
//!
//! # Compute everything, write nothing
//! album --root ~/Pictures --test
//!
//! # Scan, then serve a status page
//! album --root ~/Pictures --http :8080
//! ```

use std::path::{Path, PathBuf};

use album_core::{Config, Pipeline, PipelineMode};
use clap::{CommandFactory, Parser, ValueEnum};

mod logging;
mod status;

/// Album - photo fingerprinting and thumbnail cache.
#[derive(Parser, Debug)]
#[command(name = "album")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Album root directory to scan
    #[arg(long, env = "ALBUM_ROOT")]
    root: Option<PathBuf>,

    /// Test mode: compute hashes and thumbnails but write nothing
    #[arg(long, visible_alias = "dry-run")]
    test: bool,

    /// Serve a status page on this address after the run (e.g. ":8080")
    #[arg(long)]
    http: Option<String>,

    /// Number of workers per stage (defaults to the number of CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Stage scheduling
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json_logs: bool,
}

/// CLI spelling of [`PipelineMode`].
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Hash every photo, then build thumbnails
    Staged,
    /// Walk, hash and build thumbnails concurrently
    Streaming,
}

impl From<Mode> for PipelineMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Staged => PipelineMode::Staged,
            Mode::Streaming => PipelineMode::Streaming,
        }
    }
}

impl Cli {
    /// Nothing to do without a root, so usage is all there is to show.
    fn wants_usage(&self) -> bool {
        self.root.is_none() && !self.print_config
    }

    /// Load the config file and layer CLI overrides on top.
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            // Logging isn't initialized yet, so use eprintln for config warnings.
            None => Config::load().unwrap_or_else(|e| {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check {}",
                    Config::default_path().display()
                );
                Config::default()
            }),
        };

        if let Some(workers) = self.workers {
            config.processing.workers = workers;
        }
        if let Some(mode) = self.mode {
            config.pipeline.mode = mode.into();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Expand `~` and drop trailing separators.
fn expand_root(root: &Path) -> PathBuf {
    let raw = root.to_string_lossy();
    let expanded = shellexpand::tilde(&raw);
    PathBuf::from(expanded.into_owned()).components().collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.wants_usage() {
        Cli::command().print_help()?;
        return Ok(());
    }

    let config = cli.load_config()?;
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("album v{}", album_core::VERSION);

    if cli.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    let Some(root) = cli.root.as_deref() else {
        return Ok(());
    };
    let root = expand_root(root);

    let report = Pipeline::new(config, &root, cli.test).run().await?;

    if let Some(addr) = &cli.http {
        status::serve(addr, report.discovered).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_apply() {
        let cli = Cli::parse_from([
            "album",
            "--root",
            "/photos",
            "--workers",
            "2",
            "--mode",
            "streaming",
            "--dry-run",
        ]);
        assert!(cli.test);
        let config = cli.load_config().unwrap();
        assert_eq!(config.processing.workers, 2);
        assert_eq!(config.pipeline.mode, PipelineMode::Streaming);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let cli = Cli::parse_from(["album", "--workers", "0"]);
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn test_missing_root_shows_usage_before_config_is_read() {
        let cli = Cli::parse_from(["album", "--config", "/nonexistent/album.toml"]);
        assert!(cli.wants_usage());
        assert!(cli.load_config().is_err());

        let cli = Cli::parse_from(["album", "--print-config"]);
        assert!(!cli.wants_usage());
        let cli = Cli::parse_from(["album", "--root", "/photos"]);
        assert!(!cli.wants_usage());
    }

    #[test]
    fn test_expand_root_strips_trailing_slash() {
        assert_eq!(expand_root(Path::new("/photos/")), PathBuf::from("/photos"));
    }
}

//! PulseGuard CLI
//!
//! Heart-rate monitor with threshold alerting for wearable feeds.

use anyhow::Context;
use chrono::Utc;
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use pulseguard_monitor::{
    config::{DataSourceKind, MonitorConfig},
    monitor::{display_time, MonitorLoop, PayloadOrigin, TickReport},
    source::SimulatedSource,
    ALERT_NOTICE, VERSION,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pulseguard")]
#[command(author = "PulseGuard")]
#[command(version = VERSION)]
#[command(about = "Heart-rate monitor with threshold alerting", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor on its refresh cadence until Ctrl+C
    Run {
        #[command(flatten)]
        overrides: Overrides,

        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,

        /// Serve the read API on this port (requires server feature)
        #[arg(long)]
        serve: Option<u16>,
    },

    /// Run a single tick and print the dashboard view as JSON
    Once {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Print simulated payloads in the remote wire format
    Simulate {
        /// Number of payloads to print
        #[arg(long, default_value = "1")]
        count: usize,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show configuration
    Config {
        #[command(flatten)]
        overrides: Overrides,

        /// Write the resolved configuration back to the config file
        #[arg(long)]
        save: bool,
    },

    /// Display the alerting notice
    Notice,
}

/// Command-line overrides layered over the configuration file.
#[derive(Args, Default)]
struct Overrides {
    /// Data source (simulated or remote)
    #[arg(long)]
    source: Option<DataSourceKind>,

    /// Remote JSON URL
    #[arg(long)]
    url: Option<String>,

    /// Refresh interval in seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Window horizon in seconds
    #[arg(long)]
    horizon: Option<u64>,

    /// Number of alerts retained
    #[arg(long)]
    capacity: Option<usize>,

    #[arg(long)]
    safe_low: Option<i64>,

    #[arg(long)]
    safe_high: Option<i64>,

    #[arg(long)]
    alert_low: Option<i64>,

    #[arg(long)]
    alert_high: Option<i64>,

    /// IANA timezone for displayed times
    #[arg(long)]
    timezone: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut MonitorConfig) {
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(url) = self.url {
            config.remote_url = Some(url);
        }
        if let Some(secs) = self.interval {
            config.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.horizon {
            config.window_horizon = Duration::from_secs(secs);
        }
        if let Some(capacity) = self.capacity {
            config.alert_log_capacity = capacity;
        }
        let t = &mut config.thresholds;
        t.safe_low = self.safe_low.unwrap_or(t.safe_low);
        t.safe_high = self.safe_high.unwrap_or(t.safe_high);
        t.alert_low = self.alert_low.unwrap_or(t.alert_low);
        t.alert_high = self.alert_high.unwrap_or(t.alert_high);
        if let Some(tz) = self.timezone {
            config.display_timezone = tz;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config_path = cli.config.unwrap_or_else(MonitorConfig::config_path);

    match cli.command {
        Commands::Run {
            overrides,
            ticks,
            serve,
        } => {
            let config = resolve_config(&config_path, overrides, false)?;
            cmd_run(config, ticks, serve).await
        }
        Commands::Once { overrides } => {
            let config = resolve_config(&config_path, overrides, false)?;
            cmd_once(config).await
        }
        Commands::Simulate { count, seed } => {
            let config = load_config(&config_path);
            cmd_simulate(&config, count, seed)
        }
        Commands::Config { overrides, save } => {
            // Never overwrite a file we could not read.
            let config = resolve_config(&config_path, overrides, save)?;
            cmd_config(&config, &config_path, save)
        }
        Commands::Notice => {
            println!("{ALERT_NOTICE}");
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Load the config file, falling back to defaults when it cannot be read.
fn load_config(path: &std::path::Path) -> MonitorConfig {
    MonitorConfig::load_from(path).unwrap_or_else(|e| {
        tracing::warn!(error = %e, path = ?path, "could not load configuration, using defaults");
        MonitorConfig::default()
    })
}

/// Load, apply overrides and validate. With `strict`, an unreadable or
/// malformed file is an error instead of falling back to defaults.
fn resolve_config(
    path: &std::path::Path,
    overrides: Overrides,
    strict: bool,
) -> anyhow::Result<MonitorConfig> {
    let mut config = if strict {
        MonitorConfig::load_from(path)
            .with_context(|| format!("failed to load configuration from {path:?}"))?
    } else {
        load_config(path)
    };
    overrides.apply(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn cmd_run(config: MonitorConfig, max_ticks: Option<u64>, serve: Option<u16>) -> anyhow::Result<()> {
    let tz = config.display_tz()?;
    let mut monitor = MonitorLoop::new(&config).context("failed to create payload source")?;

    println!("PulseGuard Monitor v{VERSION}");
    println!();
    println!("  Data source: {}", monitor.source().description());
    println!(
        "  Safe range: {}-{} bpm | Alerts at {}/{} bpm",
        config.thresholds.safe_low,
        config.thresholds.safe_high,
        config.thresholds.alert_low,
        config.thresholds.alert_high
    );
    println!(
        "  Refresh interval: {}s | Window: {}s | Alert log: {} entries",
        config.refresh_interval.as_secs(),
        config.window_horizon.as_secs(),
        config.alert_log_capacity
    );

    #[cfg(feature = "server")]
    let server_shutdown = match serve {
        Some(port) => {
            let server_config =
                pulseguard_monitor::server::ServerConfig::new(port, config.window_horizon);
            let (addr, shutdown) = pulseguard_monitor::server::run(
                server_config,
                monitor.shared_state(),
                monitor.stats(),
            )
            .await?;
            println!("  Read API: http://{addr}/api/dashboard");
            Some(shutdown)
        }
        None => None,
    };

    #[cfg(not(feature = "server"))]
    if serve.is_some() {
        eprintln!("Warning: --serve ignored (server feature not enabled at compile time)");
    }

    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let mut last_tick: Option<Instant> = None;
    let mut completed: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let due = last_tick.map_or(true, |t| t.elapsed() >= config.refresh_interval);
        if due {
            last_tick = Some(Instant::now());
            let report = monitor.tick().await;
            print_tick(&monitor, &report, tz).await;

            completed += 1;
            if max_ticks.is_some_and(|max| completed >= max) {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[cfg(feature = "server")]
    if let Some(shutdown) = server_shutdown {
        let _ = shutdown.send(());
    }

    println!();
    println!("{}", monitor.stats().summary());
    Ok(())
}

async fn print_tick(monitor: &MonitorLoop, report: &TickReport, tz: Tz) {
    let origin = match report.origin {
        PayloadOrigin::Simulated => "simulated",
        PayloadOrigin::Remote => "remote",
        PayloadOrigin::Fallback => "fallback",
    };
    let bpm = report
        .reading
        .heart_rate_bpm
        .map(|bpm| format!("{bpm} bpm"))
        .unwrap_or_else(|| "--".to_string());

    let state = monitor.shared_state();
    let state = state.read().await;
    let window = state.window();
    let recent_alerts = state.alert_count_since(window.cutoff(report.synced_at));

    println!(
        "[{}] {} ({}) | window: {} samples | alerts ({}s): {} | {}",
        display_time(report.synced_at, tz),
        bpm,
        origin,
        window.len(),
        window.horizon().num_seconds(),
        recent_alerts,
        if state.emergency_active() { "SOS ACTIVE" } else { "Normal" }
    );

    if let Some(alert) = &report.alert {
        println!("  ALERT {:?}: {}", alert.kind, alert.message);
    }
    if let Some(reason) = &report.fallback_reason {
        println!("  Remote unavailable ({reason}); showing simulated data");
    }
}

async fn cmd_once(config: MonitorConfig) -> anyhow::Result<()> {
    let mut monitor = MonitorLoop::new(&config).context("failed to create payload source")?;
    let report = monitor.tick().await;
    if let Some(reason) = &report.fallback_reason {
        tracing::warn!(%reason, "remote source unavailable, used simulated data");
    }

    let state = monitor.shared_state();
    let view = state.read().await.dashboard(Utc::now());
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn cmd_simulate(config: &MonitorConfig, count: usize, seed: Option<u64>) -> anyhow::Result<()> {
    let mut source = match seed {
        Some(seed) => SimulatedSource::with_seed(config.thresholds, seed),
        None => SimulatedSource::new(config.thresholds),
    };

    for _ in 0..count {
        let payload = source.generate();
        println!("{}", serde_json::to_string(&payload.to_json())?);
    }
    Ok(())
}

fn cmd_config(config: &MonitorConfig, path: &std::path::Path, save: bool) -> anyhow::Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {path:?}");
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);

    if save {
        config
            .save_to(path)
            .with_context(|| format!("failed to write {path:?}"))?;
        println!();
        println!("Saved.");
    }
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}

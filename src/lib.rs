//! PulseGuard Monitor - heart-rate ingestion and alerting core.
//!
//! This library ingests a periodic stream of wearable readings (heart rate
//! plus sleep, fitness and nutrition summaries), keeps a rolling window of
//! recent heart-rate samples, and records a bounded history of threshold
//! breaches.
//!
//! # Guarantees
//!
//! - **Never stalls**: remote acquisition is time-bounded and falls back to
//!   simulated data within the same tick
//! - **UTC everywhere**: every stored instant is normalized to UTC
//! - **Bounded memory**: the window is bounded by time, the alert log by count
//! - **Record only**: alerts are logged, never delivered
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       PulseGuard Monitor                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────────┐    │
//! │  │   Source    │──▶│ Normalizer  │──▶│  VitalsWindow    │    │
//! │  │ (sim/remote)│   │   (UTC)     │   │  AlertLog        │    │
//! │  └─────────────┘   └─────────────┘   │  PanelState      │    │
//! │         ▲                            └──────────────────┘    │
//! │         │ tick                                │ read         │
//! │  ┌─────────────┐                     ┌──────────────────┐    │
//! │  │ MonitorLoop │                     │  DashboardView   │    │
//! │  └─────────────┘                     └──────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pulseguard_monitor::{MonitorConfig, MonitorLoop};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MonitorConfig::default();
//! config.validate()?;
//!
//! let mut monitor = MonitorLoop::new(&config)?;
//! monitor.tick().await;
//!
//! let state = monitor.shared_state();
//! let view = state.read().await.dashboard(chrono::Utc::now());
//! println!("current: {:?} bpm", view.current_bpm);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod monitor;
pub mod source;
pub mod stats;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{ConfigError, DataSourceKind, MonitorConfig, Thresholds};
pub use core::{
    normalize, AlertEvent, AlertKind, AlertLog, NormalizationIssue, NormalizedPayload,
    PanelSnapshot, PanelState, Reading, Sample, VitalsWindow, WindowSummary,
};
pub use monitor::{
    DashboardView, MonitorLoop, MonitorState, PayloadOrigin, SharedMonitor, TickPhase, TickReport,
};
pub use source::{PayloadSource, RawPayload, RemoteSource, SimulatedSource, SourceError};
pub use stats::{SharedSyncStats, SyncStats, SyncStatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Notice describing what the monitor does with alerts.
pub const ALERT_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                PULSEGUARD MONITOR - ALERTING NOTICE              ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This monitor watches heart rate against configured thresholds.  ║
║                                                                  ║
║  ✓ WHAT IT DOES:                                                 ║
║    • Records an EMERGENCY alert at or beyond alert thresholds    ║
║    • Keeps the last 10 minutes of readings (configurable)        ║
║    • Keeps the most recent 50 alerts (configurable)              ║
║                                                                  ║
║  ✗ WHAT IT NEVER DOES:                                           ║
║    • Send SMS, push or any other notification                    ║
║    • Contact emergency services or registered contacts           ║
║    • Store readings after the process exits                      ║
║                                                                  ║
║  This is not a medical device. Readings may be simulated when    ║
║  the remote feed is unavailable.                                 ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_notice_contents() {
        assert!(ALERT_NOTICE.contains("ALERTING NOTICE"));
        assert!(ALERT_NOTICE.contains("NEVER DOES"));
        assert!(ALERT_NOTICE.contains("not a medical device"));
    }
}

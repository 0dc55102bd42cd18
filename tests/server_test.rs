//! Integration tests for the read-only HTTP server

#[cfg(feature = "server")]
mod server_tests {
    use chrono::{Duration as ChronoDuration, Utc};
    use pulseguard_monitor::config::{MonitorConfig, Thresholds};
    use pulseguard_monitor::monitor::MonitorLoop;
    use pulseguard_monitor::server::{run, ServerConfig};
    use pulseguard_monitor::source::{PayloadSource, RawPayload, SimulatedSource};
    use pulseguard_monitor::{normalize, DashboardView};
    use serde_json::json;
    use std::time::Duration;

    fn simulated_monitor() -> (MonitorConfig, MonitorLoop) {
        let config = MonitorConfig::default();
        let source =
            PayloadSource::Simulated(SimulatedSource::with_seed(Thresholds::default(), 3));
        let monitor = MonitorLoop::with_source(&config, source);
        (config, monitor)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (config, monitor) = simulated_monitor();
        let server_config = ServerConfig::new(0, config.window_horizon);

        let (addr, shutdown_tx) = run(server_config, monitor.shared_state(), monitor.stats())
            .await
            .expect("Failed to start server");

        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["status"], "ok");
        assert!(body["version"].as_str().is_some());
        assert!(body["last_sync"].is_null());

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_dashboard_reflects_ticks() {
        let (config, mut monitor) = simulated_monitor();
        for _ in 0..3 {
            monitor.tick().await;
        }

        let server_config = ServerConfig::new(0, config.window_horizon);
        let (addr, shutdown_tx) = run(server_config, monitor.shared_state(), monitor.stats())
            .await
            .expect("Failed to start server");

        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = reqwest::Client::new();
        let view: DashboardView = client
            .get(format!("http://{}/api/dashboard", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse dashboard");

        assert_eq!(view.series.len(), 3);
        assert!(view.current_bpm.is_some());
        assert!(view.last_sync.is_some());
        assert_eq!(view.thresholds, Thresholds::default());

        let stats: serde_json::Value = client
            .get(format!("http://{}/api/stats", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse stats");
        assert_eq!(stats["ticks"], 3);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_alerts_endpoint_limit_and_order() {
        let (config, monitor) = simulated_monitor();
        let state = monitor.shared_state();

        {
            let now = Utc::now();
            let mut guard = state.write().await;
            for (offset, bpm) in [(30, 125), (20, 40), (10, 130)] {
                let at = now - ChronoDuration::seconds(offset);
                let raw = RawPayload::from_json(json!({
                    "timestamp": at.to_rfc3339(),
                    "heart_rate_bpm": bpm,
                    "sleep": {"quality": "fair"}
                }));
                guard.apply(&normalize(&raw, now), now);
            }
        }

        let server_config = ServerConfig::new(0, config.window_horizon);
        let (addr, shutdown_tx) = run(server_config, state, monitor.stats())
            .await
            .expect("Failed to start server");

        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = reqwest::Client::new();
        let body: serde_json::Value = client
            .get(format!("http://{}/api/alerts?limit=2", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse alerts");

        let alerts = body["alerts"].as_array().expect("alerts array");
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0]["value"], 130);
        assert_eq!(alerts[1]["value"], 40);
        assert_eq!(alerts[0]["type"], "EMERGENCY");
        assert_eq!(body["count_since"], 3);

        let panels: serde_json::Value = client
            .get(format!("http://{}/api/panels", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse panels");
        assert_eq!(panels["sleep"]["quality"], "fair");

        let vitals: serde_json::Value = client
            .get(format!("http://{}/api/vitals", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse vitals");
        assert_eq!(vitals["series"].as_array().map(|s| s.len()), Some(3));
        assert_eq!(vitals["latest"]["bpm"], 130);

        let _ = shutdown_tx.send(());
    }
}

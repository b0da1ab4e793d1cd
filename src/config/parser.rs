//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::{AppError, Result},
    models::Config,
    types::TestCase,
};

/// Configuration parser that layers defaults, `.env`, environment and CLI
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.debug)?;

        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config)?;

        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        let cli = &self.cli;

        if let Some(requests) = cli.requests {
            config.requests = requests;
        }
        if let Some(connections) = cli.connections {
            config.connections = connections;
        }
        if let Some(max_concurrent) = cli.max_concurrent {
            config.max_concurrent = max_concurrent;
        }
        if let Some(threads) = cli.threads {
            config.worker_threads = threads;
        }

        if let Some(host) = &cli.host {
            config.target_host = host.trim().to_string();
        }
        if let Some(scheme) = &cli.scheme {
            config.scheme = scheme.trim().to_lowercase();
        }
        if let Some(port) = cli.http2_port {
            config.http2_port = port;
        }
        if let Some(port) = cli.http3_port {
            config.http3_port = port;
        }

        if let Some(cases) = &cli.cases {
            config.test_cases = TestCase::parse_list(cases)
                .map_err(|e| AppError::config(format!("Invalid --cases value '{}': {}", cases, e)))?;
        }

        if let Some(bandwidth) = cli.bandwidth {
            config.bandwidth_mbps = (bandwidth > 0).then_some(bandwidth);
        }
        if let Some(url) = &cli.controller_url {
            config.controller_url = (!url.trim().is_empty()).then(|| url.trim().to_string());
        }

        if let Some(secs) = cli.stabilize_wait {
            config.stabilize_wait_secs = secs;
        }
        if let Some(secs) = cli.inter_transport_wait {
            config.inter_transport_wait_secs = secs;
        }
        if let Some(secs) = cli.inter_case_wait {
            config.inter_case_wait_secs = secs;
        }
        if cli.readiness_probe {
            config.readiness_probe = true;
        }

        if let Some(secs) = cli.call_timeout {
            config.call_timeout_seconds = secs;
        }

        if let Some(dir) = &cli.output_dir {
            config.output_dir = dir.clone();
        }
        if cli.no_reports {
            config.write_reports = false;
        }
        if cli.no_clear {
            config.clear_on_finish = false;
        }

        if let Some(level) = &cli.log_level {
            config.log_level = Some(level.clone());
        }
        if let Some(format) = &cli.log_format {
            config.log_format = Some(format.clone());
        }
        if cli.no_color {
            config.enable_color = false;
        }

        // CLI-only flags
        config.verbose = cli.verbose;
        config.debug = cli.debug;

        if config.debug {
            println!("Applied CLI overrides to configuration");
            println!(
                "Final config: requests={}, connections={}, cases={}",
                config.requests,
                config.connections,
                config.test_cases.len()
            );
        }

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    let parser = ConfigParser::new(cli);
    parser.parse()
}

/// Display configuration summary
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    let cases: Vec<String> = config
        .test_cases
        .iter()
        .map(|c| format!("{}:{}", c.delay_ms, c.loss_pct))
        .collect();

    summary.push(format!("Target Host: {} ({})", config.target_host, config.scheme));
    summary.push(format!("HTTP/2 Port: {}", config.http2_port));
    summary.push(format!("HTTP/3 Port: {}", config.http3_port));
    summary.push(format!("Requests: {}", config.requests));
    summary.push(format!("Connections: {}", config.connections));
    summary.push(format!("Max Concurrent: {} (reserved)", config.max_concurrent));
    summary.push(format!("Worker Threads: {}", config.worker_threads));
    summary.push(format!("Test Cases: {}", cases.join(", ")));
    summary.push(format!(
        "Bandwidth: {}",
        config
            .bandwidth_mbps
            .map(|b| format!("{} Mbit/s", b))
            .unwrap_or_else(|| "unlimited".to_string())
    ));
    summary.push(format!(
        "Controller: {}",
        config.controller_url.as_deref().unwrap_or("none (conditions recorded only)")
    ));
    summary.push(format!(
        "Waits: stabilize {}s{}, inter-transport {}s, inter-case {}s",
        config.stabilize_wait_secs,
        if config.readiness_probe { " (probe)" } else { "" },
        config.inter_transport_wait_secs,
        config.inter_case_wait_secs
    ));
    summary.push(format!("Call Timeout: {}s", config.call_timeout_seconds));
    summary.push(format!(
        "Reports: {}",
        if config.write_reports { config.output_dir.as_str() } else { "disabled" }
    ));
    summary.push(format!(
        "Log Format: {}",
        config.log_format.as_deref().unwrap_or(if config.debug { "json" } else { "console" })
    ));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::env;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Moves `.env` aside and clears supported variables for the duration of a test
    struct IsolatedEnv {
        backup: Option<&'static str>,
    }

    impl IsolatedEnv {
        fn new(backup_name: &'static str) -> Self {
            for (var, _, _) in EnvManager::get_supported_env_vars() {
                env::remove_var(var);
            }
            let backup = if std::path::Path::new(".env").exists() {
                let _ = std::fs::rename(".env", backup_name);
                Some(backup_name)
            } else {
                None
            };
            Self { backup }
        }
    }

    impl Drop for IsolatedEnv {
        fn drop(&mut self) {
            for (var, _, _) in EnvManager::get_supported_env_vars() {
                env::remove_var(var);
            }
            if let Some(name) = self.backup {
                let _ = std::fs::rename(name, ".env");
            }
        }
    }

    #[test]
    fn test_config_parser_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _env = IsolatedEnv::new(".env.test_backup_defaults");

        let config = ConfigParser::new(Cli::parse_from(["rtb"])).parse().unwrap();

        assert_eq!(config.requests, crate::defaults::DEFAULT_REQUESTS);
        assert_eq!(config.connections, crate::defaults::DEFAULT_CONNECTIONS);
        assert_eq!(config.test_cases.len(), crate::defaults::DEFAULT_TEST_CASES.len());
        assert!(config.controller_url.is_none());
        assert!(config.write_reports);
        assert!(!config.verbose);
    }

    #[test]
    fn test_cli_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _env = IsolatedEnv::new(".env.test_backup_cli_overrides");

        let cli = Cli::parse_from([
            "rtb",
            "--requests",
            "100",
            "--connections",
            "7",
            "--cases",
            "10:1,20:2",
            "--bandwidth",
            "50",
            "--stabilize-wait",
            "0",
            "--readiness-probe",
            "--no-reports",
            "--no-clear",
            "--no-color",
            "--verbose",
        ]);
        let config = ConfigParser::new(cli).parse().unwrap();

        assert_eq!(config.requests, 100);
        assert_eq!(config.connections, 7);
        assert_eq!(config.test_cases, vec![TestCase::new(10, 1), TestCase::new(20, 2)]);
        assert_eq!(config.bandwidth_mbps, Some(50));
        assert_eq!(config.stabilize_wait_secs, 0);
        assert!(config.readiness_probe);
        assert!(!config.write_reports);
        assert!(!config.clear_on_finish);
        assert!(!config.enable_color);
        assert!(config.verbose);
    }

    #[test]
    fn test_env_vars_applied() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _env = IsolatedEnv::new(".env.test_backup_env_vars");

        env::set_var("BENCH_REQUESTS", "2000");
        env::set_var("TARGET_HOST", "10.1.2.3");
        env::set_var("TEST_CASES", "0:0");
        env::set_var("NETWORK_BANDWIDTH", "0");
        env::set_var("CONTROLLER_URL", "http://router:8080");

        let config = ConfigParser::new(Cli::parse_from(["rtb"])).parse().unwrap();

        assert_eq!(config.requests, 2000);
        assert_eq!(config.target_host, "10.1.2.3");
        assert_eq!(config.test_cases, vec![TestCase::new(0, 0)]);
        assert_eq!(config.bandwidth_mbps, None);
        assert_eq!(config.controller_url.as_deref(), Some("http://router:8080"));
    }

    #[test]
    fn test_cli_overrides_env_vars() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _env = IsolatedEnv::new(".env.test_backup_cli_over_env");

        env::set_var("BENCH_CONNECTIONS", "8");

        let cli = Cli::parse_from(["rtb", "--connections", "12"]);
        let config = ConfigParser::new(cli).parse().unwrap();

        assert_eq!(config.connections, 12);
    }

    #[test]
    fn test_invalid_env_value_rejected() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _env = IsolatedEnv::new(".env.test_backup_invalid_env");

        env::set_var("BENCH_REQUESTS", "lots");

        let err = ConfigParser::new(Cli::parse_from(["rtb"])).parse().unwrap_err();
        assert_eq!(err.category(), "CONFIG");
    }

    #[test]
    fn test_invalid_cases_flag_rejected() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _env = IsolatedEnv::new(".env.test_backup_invalid_cases");

        let cli = Cli::parse_from(["rtb", "--cases", "75"]);
        assert!(ConfigParser::new(cli).parse().is_err());

        let cli = Cli::parse_from(["rtb", "--cases", "0:150"]);
        assert!(ConfigParser::new(cli).parse().is_err());
    }

    #[test]
    fn test_config_summary() {
        let config = Config {
            bandwidth_mbps: Some(100),
            ..Config::default()
        };
        let summary = display_config_summary(&config);

        assert!(summary.contains("Target Host: 172.30.0.2 (https)"));
        assert!(summary.contains("Test Cases: 0:3, 75:3, 150:3, 225:3"));
        assert!(summary.contains("Bandwidth: 100 Mbit/s"));
        assert!(summary.contains("Controller: none"));
        assert!(summary.contains("Max Concurrent: 100 (reserved)"));
    }
}

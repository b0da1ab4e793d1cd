//! Command-line interface

use crate::logging::LogFormat;
use clap::Parser;

/// RPC Transport Bench - HTTP/2 vs HTTP/3 echo latency under emulated network conditions
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "rtb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Total requests per benchmark run, split across connections
    #[arg(short = 'n', long)]
    pub requests: Option<usize>,

    /// Number of persistent connections (one worker each)
    #[arg(short = 'c', long)]
    pub connections: Option<usize>,

    /// Concurrency cap (reserved, not enforced)
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Runtime worker threads
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Host serving the echo endpoint
    #[arg(long)]
    pub host: Option<String>,

    /// URL scheme for both transports (http or https)
    #[arg(long)]
    pub scheme: Option<String>,

    /// HTTP/2 port
    #[arg(long)]
    pub http2_port: Option<u16>,

    /// HTTP/3 port
    #[arg(long)]
    pub http3_port: Option<u16>,

    /// Test cases as delay:loss pairs, comma separated (e.g. "0:3,75:3")
    #[arg(long, value_name = "CASES")]
    pub cases: Option<String>,

    /// Bandwidth cap in Mbit/s applied with every condition (0 = unlimited)
    #[arg(long)]
    pub bandwidth: Option<u32>,

    /// Base URL of the network emulation router
    #[arg(long)]
    pub controller_url: Option<String>,

    /// Seconds to wait after applying a condition
    #[arg(long, value_name = "SECS")]
    pub stabilize_wait: Option<u64>,

    /// Seconds to wait between the two transports of a case
    #[arg(long, value_name = "SECS")]
    pub inter_transport_wait: Option<u64>,

    /// Seconds to wait between test cases
    #[arg(long, value_name = "SECS")]
    pub inter_case_wait: Option<u64>,

    /// Poll the controller until it reports the condition instead of sleeping
    #[arg(long)]
    pub readiness_probe: bool,

    /// Timeout of a single call in seconds
    #[arg(long, value_name = "SECS")]
    pub call_timeout: Option<u64>,

    /// Directory that receives the timestamped report directory
    #[arg(short = 'o', long)]
    pub output_dir: Option<String>,

    /// Skip writing CSV, Markdown and JSON reports
    #[arg(long)]
    pub no_reports: bool,

    /// Leave the last condition active when the matrix finishes
    #[arg(long)]
    pub no_clear: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (console, json, compact)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Print the resolved configuration and exit
    #[arg(long)]
    pub show_config: bool,

    /// Print supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if let Some(scheme) = &self.scheme {
            if scheme != "http" && scheme != "https" {
                return Err(format!("--scheme must be http or https, got '{}'", scheme));
            }
        }

        if self.connections == Some(0) {
            return Err("--connections must be greater than 0".to_string());
        }

        if self.threads == Some(0) {
            return Err("--threads must be greater than 0".to_string());
        }

        if let Some(format) = &self.log_format {
            if format.parse::<LogFormat>().is_err() {
                return Err(format!("--log-format must be console, json or compact, got '{}'", format));
            }
        }

        Ok(())
    }

    /// Whether the invocation only prints information
    pub fn is_info_only(&self) -> bool {
        self.show_config || self.env_help
    }
}

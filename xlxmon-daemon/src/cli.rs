//! CLI argument definitions for xlxmon-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Xlxmon XLX reflector activity monitoring daemon.
///
/// Follows the reflector syslog, correlates stream open/close lines
/// into sessions, and records them in the activity database.
#[derive(Parser, Debug)]
#[command(name = "xlxmon-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to xlxmon.toml configuration file.
    #[arg(short, long, default_value = "/etc/xlxmon/xlxmon.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_path() {
        let cli = DaemonCli::parse_from(["xlxmon-daemon"]);
        assert_eq!(cli.config, PathBuf::from("/etc/xlxmon/xlxmon.toml"));
        assert!(!cli.validate);
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let cli = DaemonCli::parse_from([
            "xlxmon-daemon",
            "--config",
            "/tmp/custom.toml",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--validate",
        ]);
        assert_eq!(cli.config, PathBuf::from("/tmp/custom.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_format.as_deref(), Some("pretty"));
        assert!(cli.validate);
    }
}

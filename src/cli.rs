use std::{net::IpAddr, path::PathBuf, time::Duration};

use clap::Parser;

use crate::server::{DEFAULT_MAX_BODY_BYTES, ServerConfig};

#[derive(Debug, Parser)]
#[command(
    name = "docrest",
    about = "Serve an embedded document store as a generic REST API"
)]
pub struct Cli {
    /// Directory holding the search node's data
    #[arg(env = "DOCREST_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Port to listen on
    #[arg(short, long, env = "DOCREST_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Directory served for requests outside the API
    #[arg(long, default_value = "html")]
    pub static_dir: PathBuf,

    /// How long shutdown may take before the process halts, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub grace_ms: u64,

    /// Largest accepted request body, in bytes (bounds bulk imports)
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            static_dir: Some(self.static_dir.clone()),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let cli = Cli::parse_from(["docrest"]);
        assert_eq!(cli.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(cli.bind, IpAddr::from([0, 0, 0, 0]));
        assert_eq!(cli.static_dir, PathBuf::from("html"));
        assert_eq!(cli.grace_period(), Duration::from_secs(1));
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
    }

    #[test]
    fn parse_overrides() {
        let cli = Cli::parse_from([
            "docrest",
            "/var/lib/docrest",
            "--port",
            "9200",
            "--bind",
            "127.0.0.1",
            "--grace-ms",
            "250",
            "--max-body-bytes",
            "4096",
            "-vv",
        ]);
        assert_eq!(cli.data_dir, PathBuf::from("/var/lib/docrest"));
        assert_eq!(cli.port, 9200);
        assert_eq!(cli.bind, IpAddr::from([127, 0, 0, 1]));
        assert_eq!(cli.grace_period(), Duration::from_millis(250));
        assert_eq!(cli.verbose, 2);

        let config = cli.server_config();
        assert_eq!(config.max_body_bytes, 4096);
        assert_eq!(config.static_dir, Some(PathBuf::from("html")));
    }
}

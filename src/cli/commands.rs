//! CLI commands and argument parsing

use crate::types::SecretEncoding;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reflex config client CLI
#[derive(Parser, Debug)]
#[command(name = "rfxcfg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Provider base URL (REFLEX_URL in the environment takes precedence)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// API key `<id>.<secret>` (REFLEX_APIKEY in the environment takes precedence)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Directory holding mounted secrets
    #[arg(long, global = true, default_value = crate::settings::DEFAULT_SECRETS_DIR)]
    pub secrets_dir: PathBuf,

    /// Attempts per request before giving up
    #[arg(long, global = true, default_value_t = crate::http::DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Pause between attempts, in milliseconds
    #[arg(long, global = true, default_value = "1000")]
    pub retry_delay_ms: u64,

    /// Give up on a request after this many seconds of retrying
    #[arg(long, global = true)]
    pub deadline_secs: Option<u64>,

    /// How the API-key and session secrets are encoded
    #[arg(long, global = true, value_enum, default_value = "raw")]
    pub secret_encoding: SecretEncoding,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a named config object
    Fetch {
        /// Config name
        name: String,
    },

    /// Resolve REFLEX_* from secret files or environment and fetch REFLEX_CONFIG
    Load,

    /// Force a login and print the session (never its secrets)
    Login,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON on one line
    Json,
    /// Indented JSON
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from(["rfxcfg", "fetch", "app1"]).unwrap();
        assert!(matches!(cli.command, Commands::Fetch { ref name } if name == "app1"));
        assert_eq!(cli.max_attempts, 60);
        assert_eq!(cli.retry_delay_ms, 1000);
        assert_eq!(cli.secrets_dir, PathBuf::from("/run/secrets"));
        assert_eq!(cli.secret_encoding, SecretEncoding::Raw);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.deadline_secs.is_none());
    }

    #[test]
    fn test_parse_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "rfxcfg",
            "login",
            "--url",
            "https://cfg.example",
            "--max-attempts",
            "3",
            "--secret-encoding",
            "base64",
            "--format",
            "pretty",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::Login));
        assert_eq!(cli.url.as_deref(), Some("https://cfg.example"));
        assert_eq!(cli.max_attempts, 3);
        assert_eq!(cli.secret_encoding, SecretEncoding::Base64);
        assert_eq!(cli.format, OutputFormat::Pretty);
    }

    #[test]
    fn test_fetch_requires_name() {
        assert!(Cli::try_parse_from(["rfxcfg", "fetch"]).is_err());
    }
}

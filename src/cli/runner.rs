//! CLI runner - executes commands

use crate::cache::ConfigCache;
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::error::{Error, Result};
use crate::http::RetryPolicy;
use crate::session::{Session, SessionConfig};
use crate::settings::SettingsSource;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// CLI runner
pub struct Runner {
    cli: Cli,
    cancel: CancellationToken,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts any in-flight retry loop when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Fetch { name } => self.fetch(name).await,
            Commands::Load => self.load().await,
            Commands::Login => self.login().await,
        }
    }

    async fn fetch(&self, name: &str) -> Result<()> {
        let session = self.session_from_flags()?;
        let config = session
            .get_config_with_cancel(name, Some(&self.cancel))
            .await?;
        self.print(&config)
    }

    async fn load(&self) -> Result<()> {
        let source = SettingsSource::new().secrets_dir(&self.cli.secrets_dir);
        let settings = source.resolve()?;
        debug!("Resolved settings: {:?}", settings);

        let name = settings.require_config_name()?.to_string();
        let session = Session::new(self.apply_flags(settings.session_config()?))?;
        let cache = ConfigCache::new(session, name);

        let config = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled),
            result = cache.get() => result,
        }?;
        self.print(config)
    }

    async fn login(&self) -> Result<()> {
        let session = self.session_from_flags()?;
        session.login_with_cancel(true, Some(&self.cancel)).await?;

        let info = session
            .info()
            .await
            .ok_or_else(|| Error::Other("login succeeded without a session".to_string()))?;
        self.print(&info)
    }

    fn session_from_flags(&self) -> Result<Session> {
        let config = SessionConfig {
            base_url: self.cli.url.clone(),
            api_key: self.cli.api_key.clone(),
            ..SessionConfig::default()
        }
        .with_env_overrides();

        Session::new(self.apply_flags(config))
    }

    fn apply_flags(&self, config: SessionConfig) -> SessionConfig {
        config
            .retry(self.retry_policy())
            .secret_encoding(self.cli.secret_encoding)
    }

    fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::new(
            self.cli.max_attempts,
            Duration::from_millis(self.cli.retry_delay_ms),
        );
        match self.cli.deadline_secs {
            Some(secs) => policy.deadline(Duration::from_secs(secs)),
            None => policy,
        }
    }

    fn print<T: Serialize>(&self, value: &T) -> Result<()> {
        let out = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(value)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        };
        println!("{out}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_retry_policy_from_flags() {
        let cli = Cli::parse_from([
            "rfxcfg",
            "fetch",
            "app1",
            "--max-attempts",
            "5",
            "--retry-delay-ms",
            "250",
            "--deadline-secs",
            "30",
        ]);
        let runner = Runner::new(cli);

        let policy = runner.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_millis(250));
        assert_eq!(policy.deadline, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_default_retry_policy_matches_library() {
        let runner = Runner::new(Cli::parse_from(["rfxcfg", "login"]));
        assert_eq!(runner.retry_policy(), RetryPolicy::default());
    }
}

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use session_config::SessionServiceConfig;

/// Command-line arguments of the `session-service` binary.
#[derive(Debug, Parser)]
#[command(name = "session-service", version, about = "HTTP store for session documents")]
pub struct Cli {
    /// Address to listen on (overrides server.bind)
    #[arg(long)]
    pub bind: Option<String>,

    /// Database file, or :memory: (overrides database.path)
    #[arg(long)]
    pub db: Option<String>,

    /// Extra TOML config file, layered below environment variables
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Load layered configuration, apply flag overrides, and validate.
    ///
    /// # Errors
    ///
    /// Fails if a config source cannot be read or the result is invalid.
    pub fn load_config(&self) -> anyhow::Result<SessionServiceConfig> {
        let mut config = SessionServiceConfig::load_with_dotenv_from(self.config.as_deref())
            .context("failed to load configuration")?;
        self.apply_overrides(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    /// Flags win over every configuration source.
    pub fn apply_overrides(&self, config: &mut SessionServiceConfig) {
        if let Some(bind) = &self.bind {
            config.server.bind.clone_from(bind);
        }
        if let Some(db) = &self.db {
            config.database.path.clone_from(db);
        }
    }
}

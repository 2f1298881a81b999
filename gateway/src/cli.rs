use anyhow::Context;
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf};
use weather_gateway::{Server, telemetry};
use weather_gateway_core::{API_KEY_ENV, Config};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-gateway", version, about = "Weather SSE gateway")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the gateway until interrupted.
    Serve {
        /// Address to listen on, e.g. "0.0.0.0:8000".
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Dotenv file read for provider variables; ignored when absent.
        #[arg(long, default_value = ".env")]
        env_file: PathBuf,
    },

    /// Store the provider API key in the config file.
    Configure,

    /// Print the config file location.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };

        match self.command {
            Command::Serve { bind, env_file } => {
                let mut config = Config::load(Some(&path))?
                    .with_dotenv_overrides(&env_file)?
                    .with_env_overrides();
                if let Some(bind) = bind {
                    config.server.bind = bind;
                }

                telemetry::init(&config)?;
                tracing::debug!(?config, "loaded configuration from {}", path.display());

                let server = Server::build(&config).await?;
                server.run_until_stopped().await?;
            }
            Command::Configure => {
                let mut config = Config::load(Some(&path))?;

                let api_key = inquire::Password::new("OpenWeather API key:")
                    .without_confirmation()
                    .with_help_message(&format!("{API_KEY_ENV} overrides this value at startup"))
                    .prompt()
                    .context("Failed to read API key")?;

                config.set_api_key(api_key);
                config.api_key()?;
                config.save(&path)?;
                println!("Saved API key to {}", path.display());
            }
            Command::ConfigPath => {
                println!("{}", path.display());
            }
        }

        Ok(())
    }
}

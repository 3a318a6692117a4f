use crate::args::{Cli, Command, UpstreamArgs};
use crate::config;
use crate::dispatch::Dispatcher;
use crate::logging::init_logging;
use crate::schema::{FunctionCalling, SchemaFormat, SchemaFormatter, ToolListing};
use crate::session::{run_session, StdinSource};
use anyhow::{Context, Result};
use clap::Parser;
use market_data::{CoinGeckoClient, MarketDataSource};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

pub enum Application {
    Tools,
    Functions,
    Call {
        dispatcher: Dispatcher,
        operation: String,
        args: Value,
    },
    Session(Dispatcher),
}

impl Application {
    pub async fn init() -> Result<Application> {
        // Preload environment variables from .env file if it exists before parsing CLI args
        dotenvy::dotenv().ok();

        let Cli {
            upstream,
            env_file,
            log_json,
            cmd,
        } = Cli::parse();
        init_logging(log_json);

        let application = match cmd {
            Command::Tools => Application::Tools,
            Command::Functions => Application::Functions,
            Command::Call(call) => {
                let args = serde_json::from_str(&call.args)
                    .with_context(|| format!("--args is not valid JSON: {}", call.args))?;
                Application::Call {
                    dispatcher: connect(&upstream, &env_file).await?,
                    operation: call.operation,
                    args,
                }
            }
            Command::Session => Application::Session(connect(&upstream, &env_file).await?),
        };

        Ok(application)
    }

    pub async fn run(self) -> Result<()> {
        match self {
            Self::Tools => print_json(&SchemaFormatter::from(ToolListing).render()),
            Self::Functions => print_json(&SchemaFormatter::from(FunctionCalling).render()),
            Self::Call {
                dispatcher,
                operation,
                args,
            } => {
                let result = if operation.contains('_') {
                    dispatcher.dispatch_function(&operation, args).await
                } else {
                    dispatcher.dispatch(&operation, args).await
                };
                let payload = result.with_context(|| format!("{operation} failed"))?;
                println!("{}", payload.text);
                Ok(())
            }
            Self::Session(dispatcher) => {
                let handled = run_session(&dispatcher, StdinSource, &mut std::io::stdout())
                    .await
                    .context("Session aborted")?;
                tracing::info!(handled, "session finished");
                Ok(())
            }
        }
    }
}

/// Builds the upstream client and populates the coin cache.
async fn connect(upstream: &UpstreamArgs, env_file: &Path) -> Result<Dispatcher> {
    let config = config::setup(upstream, env_file)?;
    let client = CoinGeckoClient::new(&config).context("Failed to build CoinGecko client")?;

    let dispatcher = Dispatcher::from_source(Arc::new(client) as Arc<dyn MarketDataSource>);
    dispatcher
        .init()
        .await
        .context("Failed to populate the coin cache")?;
    Ok(dispatcher)
}

fn print_json(value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to encode schema")?;
    println!("{text}");
    Ok(())
}

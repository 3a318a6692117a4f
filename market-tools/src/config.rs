use crate::args::{parse_plan, UpstreamArgs};
use anyhow::{anyhow, Context, Result};
use market_data::CoinGeckoConfig;
use std::path::Path;
use std::time::Duration;

const API_KEY_ENV_VAR: &str = "COINGECKO_API_KEY";
const PLAN_ENV_VAR: &str = "COINGECKO_PLAN";
const BASE_URL_ENV_VAR: &str = "COINGECKO_BASE_URL";
const TIMEOUT_ENV_VAR: &str = "COINGECKO_TIMEOUT_SECS";

/// Loads the env file, then builds the upstream config from flags and the environment.
///
/// clap resolves env fallbacks before the env file is loaded, so anything still unset is
/// looked up again here.
pub(crate) fn setup(args: &UpstreamArgs, env_file: &Path) -> Result<CoinGeckoConfig> {
    let _ = dotenvy::from_filename(env_file);

    let api_key = load_api_key(args.api_key.clone()).context("Failed to load API key")?;
    let plan = match args.plan {
        Some(plan) => plan,
        None => from_env(PLAN_ENV_VAR, parse_plan)?.unwrap_or_default(),
    };
    let base_url = match &args.base_url {
        Some(url) => Some(url.clone()),
        None => from_env(BASE_URL_ENV_VAR, |s| Ok(s.to_string()))?,
    };
    let timeout_secs = match args.timeout_secs {
        Some(secs) => Some(secs),
        None => from_env(TIMEOUT_ENV_VAR, |s| {
            s.trim().parse::<u64>().map_err(|e| e.to_string())
        })?,
    };

    let mut builder = CoinGeckoConfig::builder();
    builder.api_key(api_key).plan(plan);
    if let Some(url) = base_url {
        builder.base_url(url);
    }
    if let Some(secs) = timeout_secs {
        builder.timeout(Duration::from_secs(secs));
    }

    let config = builder
        .build()
        .context("Failed to build CoinGecko configuration")?;
    tracing::debug!(?config, "upstream configuration");
    Ok(config)
}

/// The flag wins; otherwise the environment, which may have been filled by the env file.
fn load_api_key(flag: Option<String>) -> Result<String> {
    match flag {
        Some(key) => Ok(key),
        None => std::env::var(API_KEY_ENV_VAR)
            .with_context(|| format!("{API_KEY_ENV_VAR} must be set")),
    }
}

/// `None` when `name` is unset; a present but unparsable value is an error.
fn from_env<T>(name: &str, parse: impl FnOnce(&str) -> Result<T, String>) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(value) => parse(&value).map(Some).map_err(|e| anyhow!("invalid {name}: {e}")),
        Err(_) => Ok(None),
    }
}

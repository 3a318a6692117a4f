use clap::ValueHint;
use clap::{Args, Parser, Subcommand};
use market_data::ApiPlan;
use std::path::PathBuf;

pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_CALL_ARGS: &str = "{}";

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub(crate) upstream: UpstreamArgs,

    /// Path to environment file (default: ./.env). Can also use APP_ENV_FILE.
    #[arg(
        long,
        value_hint = ValueHint::FilePath,
        default_value = DEFAULT_ENV_FILE,
        env = "APP_ENV_FILE",
        global = true
    )]
    pub(crate) env_file: PathBuf,

    /// Emit logs as JSON lines on stderr
    #[arg(long, env = "LOG_JSON", global = true)]
    pub(crate) log_json: bool,

    #[command(subcommand)]
    pub(crate) cmd: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Print the tool listing (name, description, inputSchema per operation)
    Tools,

    /// Print the function-calling definitions
    Functions,

    /// Populate the coin cache, run one operation and print its result
    Call(CallArgs),

    /// Populate the coin cache, then answer one JSON request per stdin line
    Session,
}

#[derive(Args)]
pub(crate) struct CallArgs {
    /// Operation name, e.g. `list-coins` (function-calling names like `list_coins` work too)
    pub(crate) operation: String,

    /// Arguments as a JSON object
    #[arg(long, default_value = DEFAULT_CALL_ARGS)]
    pub(crate) args: String,
}

#[derive(Args)]
pub(crate) struct UpstreamArgs {
    /// CoinGecko API key. Can also use COINGECKO_API_KEY (read again after the env file loads).
    #[arg(long, env = "COINGECKO_API_KEY", hide_env_values = true, global = true)]
    pub(crate) api_key: Option<String>,

    /// API plan (pro | demo, default pro); decides the default host and the key header.
    /// Can also use COINGECKO_PLAN (read again after the env file loads).
    #[arg(long, env = "COINGECKO_PLAN", value_parser = parse_plan, global = true)]
    pub(crate) plan: Option<ApiPlan>,

    /// Override the plan's base URL. Can also use COINGECKO_BASE_URL (read again after the
    /// env file loads).
    #[arg(long, env = "COINGECKO_BASE_URL", value_hint = ValueHint::Url, global = true)]
    pub(crate) base_url: Option<String>,

    /// Per-request timeout in seconds (no timeout when unset). Can also use
    /// COINGECKO_TIMEOUT_SECS (read again after the env file loads).
    #[arg(long, env = "COINGECKO_TIMEOUT_SECS", global = true)]
    pub(crate) timeout_secs: Option<u64>,
}

pub(crate) fn parse_plan(s: &str) -> Result<ApiPlan, String> {
    s.trim()
        .parse()
        .map_err(|_| format!("invalid COINGECKO_PLAN '{s}'; expected one of: pro, demo"))
}

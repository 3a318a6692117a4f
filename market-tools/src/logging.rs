use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,market_tools=info,market_data=info";

/// Logs go to stderr; stdout carries payloads.
pub fn init_logging(json: bool) {
    // Init logging using tracing subscriber with ENV and some backup default
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

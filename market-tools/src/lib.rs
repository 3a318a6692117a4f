//! Tool listing, function-calling schemas and request dispatch over CoinGecko market data.

mod app;
mod args;
mod config;
mod dispatch;
mod error;
mod logging;
mod operation;
mod payload;
pub mod schema;
mod session;

pub use app::Application;
pub use dispatch::Dispatcher;
pub use error::ToolError;
pub use logging::init_logging;
pub use operation::Operation;
pub use payload::{iso8601, unix_to_iso8601, ToolPayload};
pub use session::{run_session, RequestSource, StdinSource, VecSource};

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The operations exposed to tool-invocation hosts and LLM function calling.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Operation {
    ListCoins,
    ResolveIds,
    Refresh,
    HistoricalData,
    OhlcData,
}

impl Operation {
    /// Tool-invocation name, e.g. `list-coins`.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Function-calling names may not contain `-`, so `list-coins` becomes `list_coins`.
    pub fn function_name(&self) -> String {
        self.name().replace('-', "_")
    }

    pub fn from_function_name(name: &str) -> Option<Self> {
        name.replace('_', "-").parse().ok()
    }
}

//! Input descriptors for every operation.
//!
//! [`DESCRIPTORS`] is the single source of truth: argument validation reads it directly,
//! and the two published encodings (tool listing and function calling, see [`format`])
//! are thin renderings of it.

pub mod format;
mod validate;

pub use format::{FunctionCalling, SchemaFormat, SchemaFormatter, ToolListing};
pub use validate::{coerce_integers, validate};

use crate::operation::Operation;
use market_data::{HistoricalInterval, OhlcInterval};
use serde_json::{json, Map, Value};
use strum::VariantNames;

/// 9999-12-31T23:59:59Z, the last instant with a four-digit ISO-8601 year.
pub const MAX_UNIX_SECONDS: i64 = 253_402_300_799;
pub const MAX_PAGE_SIZE: i64 = 1000;
pub const DEFAULT_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Integer {
        min: Option<i64>,
        max: Option<i64>,
        default: Option<i64>,
    },
    /// Non-empty string.
    String,
    /// Non-empty list of strings.
    StringList,
    /// One of a fixed set of strings.
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperationDescriptor {
    pub operation: Operation,
    pub description: &'static str,
    pub fields: &'static [FieldSpec],
}

const COIN_ID: FieldSpec = FieldSpec {
    name: "id",
    description: "CoinGecko coin id, e.g. `bitcoin` (see resolve-ids)",
    kind: FieldKind::String,
    required: true,
};

const TARGET_CURRENCY: FieldSpec = FieldSpec {
    name: "targetCurrency",
    description: "Quote currency, e.g. `usd` or `eur`",
    kind: FieldKind::String,
    required: true,
};

const FROM: FieldSpec = FieldSpec {
    name: "from",
    description: "Start of the range, UNIX seconds",
    kind: FieldKind::Integer {
        min: Some(0),
        max: Some(MAX_UNIX_SECONDS),
        default: None,
    },
    required: true,
};

const TO: FieldSpec = FieldSpec {
    name: "to",
    description: "End of the range, UNIX seconds",
    kind: FieldKind::Integer {
        min: Some(0),
        max: Some(MAX_UNIX_SECONDS),
        default: None,
    },
    required: true,
};

pub static DESCRIPTORS: &[OperationDescriptor] = &[
    OperationDescriptor {
        operation: Operation::ListCoins,
        description: "List supported coins (id, symbol, name, platforms) from the cached \
                      catalog, one page at a time",
        fields: &[
            FieldSpec {
                name: "page",
                description: "Page number, starting at 1",
                kind: FieldKind::Integer {
                    min: Some(1),
                    max: None,
                    default: Some(1),
                },
                required: false,
            },
            FieldSpec {
                name: "pageSize",
                description: "Coins per page",
                kind: FieldKind::Integer {
                    min: Some(1),
                    max: Some(MAX_PAGE_SIZE),
                    default: Some(DEFAULT_PAGE_SIZE),
                },
                required: false,
            },
        ],
    },
    OperationDescriptor {
        operation: Operation::ResolveIds,
        description: "Resolve coin names or ticker symbols (case-insensitive, exact match) \
                      to CoinGecko ids",
        fields: &[FieldSpec {
            name: "names",
            description: "Coin names or symbols, e.g. [\"BTC\", \"ethereum\"]",
            kind: FieldKind::StringList,
            required: true,
        }],
    },
    OperationDescriptor {
        operation: Operation::Refresh,
        description: "Re-fetch the coin catalog from CoinGecko into the local cache",
        fields: &[],
    },
    OperationDescriptor {
        operation: Operation::HistoricalData,
        description: "Historical prices, market caps and total volumes for a coin over a \
                      time range",
        fields: &[
            COIN_ID,
            TARGET_CURRENCY,
            FROM,
            TO,
            FieldSpec {
                name: "interval",
                description: "Data granularity; omit to let CoinGecko pick one from the \
                              range width",
                kind: FieldKind::Enum(HistoricalInterval::VARIANTS),
                required: false,
            },
        ],
    },
    OperationDescriptor {
        operation: Operation::OhlcData,
        description: "OHLC candlesticks for a coin over a time range",
        fields: &[
            COIN_ID,
            TARGET_CURRENCY,
            FROM,
            TO,
            FieldSpec {
                name: "interval",
                description: "Candle granularity; hourly covers ranges up to 31 days, daily \
                              up to 180 days",
                kind: FieldKind::Enum(OhlcInterval::VARIANTS),
                required: true,
            },
        ],
    },
];

pub fn descriptors() -> &'static [OperationDescriptor] {
    DESCRIPTORS
}

/// `DESCRIPTORS` is laid out in `Operation` declaration order.
pub fn descriptor(operation: Operation) -> &'static OperationDescriptor {
    &DESCRIPTORS[operation as usize]
}

impl FieldSpec {
    /// JSON Schema for this field.
    pub fn json_schema(&self) -> Value {
        let mut schema = match self.kind {
            FieldKind::Integer { min, max, default } => {
                let mut s = json!({ "type": "integer" });
                if let Some(min) = min {
                    s["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    s["maximum"] = json!(max);
                }
                if let Some(default) = default {
                    s["default"] = json!(default);
                }
                s
            }
            FieldKind::String => json!({ "type": "string", "minLength": 1 }),
            FieldKind::StringList => json!({
                "type": "array",
                "items": { "type": "string" },
                "minItems": 1
            }),
            FieldKind::Enum(values) => json!({ "type": "string", "enum": values }),
        };
        schema["description"] = json!(self.description);
        schema
    }
}

impl OperationDescriptor {
    /// JSON Schema of the argument object.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn every_operation_has_exactly_one_descriptor() {
        for op in Operation::iter() {
            let count = DESCRIPTORS.iter().filter(|d| d.operation == op).count();
            assert_eq!(count, 1, "{op}");
            assert_eq!(descriptor(op).operation, op);
        }
        assert_eq!(DESCRIPTORS.len(), Operation::iter().count());
    }

    #[test]
    fn field_names_are_unique_per_operation() {
        for d in DESCRIPTORS {
            let names: HashSet<_> = d.fields.iter().map(|f| f.name).collect();
            assert_eq!(names.len(), d.fields.len(), "{}", d.operation);
        }
    }

    #[test]
    fn enum_values_parse_into_interval_types() {
        let historical = descriptor(Operation::HistoricalData).field("interval").unwrap();
        let FieldKind::Enum(values) = historical.kind else {
            panic!("interval is not an enum");
        };
        assert!(!historical.required);
        for v in values {
            assert!(HistoricalInterval::from_str(v).is_ok(), "{v}");
        }

        let ohlc = descriptor(Operation::OhlcData).field("interval").unwrap();
        let FieldKind::Enum(values) = ohlc.kind else {
            panic!("interval is not an enum");
        };
        assert!(ohlc.required);
        assert_eq!(values, &["hourly", "daily"]);
        for v in values {
            assert!(OhlcInterval::from_str(v).is_ok(), "{v}");
        }
    }

    #[test]
    fn input_schema_lists_required_fields() {
        let schema = descriptor(Operation::OhlcData).input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(
            schema["required"],
            json!(["id", "targetCurrency", "from", "to", "interval"])
        );
        assert_eq!(schema["properties"]["from"]["minimum"], 0);

        let schema = descriptor(Operation::ListCoins).input_schema();
        assert_eq!(schema["required"], json!([]));
        assert_eq!(schema["properties"]["pageSize"]["maximum"], 1000);
        assert_eq!(schema["properties"]["pageSize"]["default"], 100);
        assert_eq!(schema["properties"]["page"]["minimum"], 1);
    }
}

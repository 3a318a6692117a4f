//! The two published encodings of [`super::DESCRIPTORS`].

use super::{descriptors, OperationDescriptor};
use enum_dispatch::enum_dispatch;
use serde_json::{json, Value};

#[enum_dispatch]
pub trait SchemaFormat {
    /// Encodes a single operation.
    fn render_operation(&self, descriptor: &OperationDescriptor) -> Value;

    /// Wraps the encoded operations into the envelope the consumer expects.
    fn wrap(&self, entries: Vec<Value>) -> Value {
        Value::Array(entries)
    }

    fn render(&self) -> Value {
        let entries = descriptors()
            .iter()
            .map(|d| self.render_operation(d))
            .collect();
        self.wrap(entries)
    }
}

/// `{"tools": [{name, description, inputSchema}]}` as served to tool-invocation hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolListing;

impl SchemaFormat for ToolListing {
    fn render_operation(&self, descriptor: &OperationDescriptor) -> Value {
        json!({
            "name": descriptor.operation.name(),
            "description": descriptor.description,
            "inputSchema": descriptor.input_schema(),
        })
    }

    fn wrap(&self, entries: Vec<Value>) -> Value {
        json!({ "tools": entries })
    }
}

/// `[{"type": "function", "function": {name, description, parameters}}]` for LLM
/// function calling.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionCalling;

impl SchemaFormat for FunctionCalling {
    fn render_operation(&self, descriptor: &OperationDescriptor) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": descriptor.operation.function_name(),
                "description": descriptor.description,
                "parameters": descriptor.input_schema(),
            }
        })
    }
}

#[enum_dispatch(SchemaFormat)]
#[derive(Debug, Clone, Copy)]
pub enum SchemaFormatter {
    ToolListing,
    FunctionCalling,
}

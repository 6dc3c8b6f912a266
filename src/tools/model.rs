use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Static description of one tool, as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_schema", alias = "parameters", alias = "params_schema")]
    pub argument_schema: Value,
}

fn empty_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolDescriptor {
    pub fn new(name: String, description: String, argument_schema: Value) -> Self {
        Self {
            name,
            description,
            argument_schema,
        }
    }
}

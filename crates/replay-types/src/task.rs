use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A design task submitted by the orchestrator.
///
/// Immutable once submitted. The operation list is kept raw so that an
/// unknown or malformed operation only fails itself at dispatch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier. Also names the result and export files.
    #[serde(rename = "task_id", alias = "id")]
    pub id: String,
    /// Free-form task category (e.g. `create_part`, `create_assembly`).
    #[serde(rename = "type", alias = "kind", default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_description")]
    pub description: String,
    /// Ordered operations. Later operations may reference earlier ones.
    #[serde(default)]
    pub operations: Vec<RawOperation>,
    /// Requested export formats, first occurrence wins on duplicates.
    #[serde(
        default = "default_export_formats",
        deserialize_with = "dedupe_formats"
    )]
    pub export_formats: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_dimensions: Option<TargetDimensions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Task {
    /// Parse a task from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether this task builds a multi-component assembly.
    pub fn is_assembly(&self) -> bool {
        self.kind == "create_assembly"
    }
}

fn default_kind() -> String {
    "unknown".to_string()
}

fn default_description() -> String {
    "No description".to_string()
}

fn default_export_formats() -> Vec<String> {
    vec!["stl".to_string()]
}

fn dedupe_formats<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<String> = Vec::deserialize(deserializer)?;
    let mut formats: Vec<String> = Vec::with_capacity(raw.len());
    for format in raw {
        let format = format.trim().to_ascii_lowercase();
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}

/// Target dimensions the generator asked for, in millimetres.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetDimensions {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub z: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
}

/// An operation as it arrives on the wire: a `type` tag plus parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOperation {
    /// The operation tag, e.g. `sketch` or `extrude`. Empty when missing.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// All remaining fields of the operation object.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl RawOperation {
    /// Build an operation from a tag and a JSON object of parameters.
    /// Non-object parameter values are ignored.
    pub fn new(kind: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            kind: kind.into(),
            params,
        }
    }

    /// Decode the parameters into a typed struct.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.params.clone()))
    }
}

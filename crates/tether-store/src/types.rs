use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metadata attached to a collection item, keyed by field name.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A scalar metadata value.
///
/// Vector stores hand back loosely typed JSON; only scalars survive the trip
/// through the backup table. Arrays and objects are rejected on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetadataValue {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }
}

impl TryFrom<serde_json::Value> for MetadataValue {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(b) => Ok(Self::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Self::Float(f))
                } else {
                    Err(format!("unsupported number {n}"))
                }
            }
            serde_json::Value::String(s) => Ok(Self::Str(s)),
            serde_json::Value::Array(_) => Err("arrays are not supported as metadata values".into()),
            serde_json::Value::Object(_) => {
                Err("objects are not supported as metadata values".into())
            }
        }
    }
}

impl From<MetadataValue> for serde_json::Value {
    fn from(value: MetadataValue) -> Self {
        match value {
            MetadataValue::Null => Self::Null,
            MetadataValue::Bool(b) => Self::Bool(b),
            MetadataValue::Int(i) => Self::Number(i.into()),
            MetadataValue::Float(f) => serde_json::Number::from_f64(f).map_or(Self::Null, Self::Number),
            MetadataValue::Str(s) => Self::String(s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// One entry of a vector collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionItem {
    pub id: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub document: Option<String>,
}

impl CollectionItem {
    #[must_use]
    pub fn new(id: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            embedding,
            metadata: None,
            document: None,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }
}

/// A row of the backup table, with embedding and metadata already serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub id: String,
    pub embedding: Option<String>,
    pub metadata: Option<String>,
    pub document: Option<String>,
}

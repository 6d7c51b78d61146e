use serde_json::Value;

/// A positional bind parameter for a generated statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Bound as TEXT (attribute names)
    Text(String),
    /// Bound as JSONB (attribute values)
    Json(Value),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

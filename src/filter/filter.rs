use serde_json::Value;

use super::error::FilterError;
use super::types::{SqlParam, SqlResult};
use crate::database::document::Document;

/// A conjunction of exact-match conditions on top-level document attributes.
///
/// An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value` exactly
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Result<Self, FilterError> {
        let field = field.into();
        Self::validate_field(&field)?;
        let value = value.into();

        // Last condition on a field wins, same as a query object literal
        if let Some(existing) = self.conditions.iter_mut().find(|(f, _)| *f == field) {
            existing.1 = value;
        } else {
            self.conditions.push((field, value));
        }
        Ok(self)
    }

    /// Add the condition only when a value is present
    pub fn eq_opt(self, field: impl Into<String>, value: Option<impl Into<Value>>) -> Result<Self, FilterError> {
        match value {
            Some(v) => self.eq(field, v),
            None => Ok(self),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.conditions.iter().map(|(f, v)| (f.as_str(), v))
    }

    /// Evaluate the filter against an in-memory document.
    /// A missing attribute never equals a supplied value.
    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| doc.get(field) == Some(value))
    }

    /// Render the filter as a WHERE fragment against a JSONB column.
    /// Placeholders are numbered from `starting_param_index + 1`.
    pub fn to_where_sql(&self, column: &str, starting_param_index: usize) -> SqlResult {
        if self.conditions.is_empty() {
            return SqlResult { query: "1=1".to_string(), params: vec![] };
        }

        let mut params = Vec::with_capacity(self.conditions.len() * 2);
        let mut clauses = Vec::with_capacity(self.conditions.len());
        let mut index = starting_param_index;

        for (field, value) in &self.conditions {
            clauses.push(format!(
                "\"{}\" -> ${}::text = ${}::jsonb",
                column,
                index + 1,
                index + 2
            ));
            params.push(SqlParam::Text(field.clone()));
            params.push(SqlParam::Json(value.clone()));
            index += 2;
        }

        SqlResult { query: clauses.join(" AND "), params }
    }

    // HTTP handlers only pass fixed attribute names; this guards library callers
    // that build filters from caller-supplied keys.
    fn validate_field(field: &str) -> Result<(), FilterError> {
        if field.is_empty() {
            return Err(FilterError::InvalidField("Field name cannot be empty".to_string()));
        }
        if field.starts_with('$') {
            return Err(FilterError::InvalidField(format!("Operators are not supported: {}", field)));
        }
        Ok(())
    }
}

/// Validate a table name before it is interpolated into SQL
pub fn validate_table_name(name: &str) -> Result<(), FilterError> {
    let mut chars = name.chars();
    match chars.next() {
        None => Err(FilterError::InvalidTableName("Table name cannot be empty".to_string())),
        Some(first) if !(first.is_ascii_alphabetic() || first == '_') => {
            Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)))
        }
        Some(_) if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') => {
            Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)))
        }
        Some(_) => Ok(()),
    }
}

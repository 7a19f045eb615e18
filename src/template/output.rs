//! Stack outputs.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::expr::Expr;

/// A value exposed by the deployed stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    logical_id: String,
    value: Expr,
    description: Option<String>,
    export_name: Option<Expr>,
}

impl Output {
    pub fn new(logical_id: impl Into<String>, value: impl Into<Expr>) -> Self {
        Self {
            logical_id: logical_id.into(),
            value: value.into(),
            description: None,
            export_name: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Exports the value for `Fn::ImportValue` in other stacks.
    pub fn export(mut self, name: impl Into<Expr>) -> Self {
        self.export_name = Some(name.into());
        self
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn value(&self) -> &Expr {
        &self.value
    }

    pub(crate) fn expressions(&self) -> impl Iterator<Item = &Expr> {
        std::iter::once(&self.value).chain(self.export_name.iter())
    }
}

impl Serialize for Output {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        if let Some(description) = &self.description {
            map.serialize_entry("Description", description)?;
        }
        map.serialize_entry("Value", &self.value)?;
        if let Some(name) = &self.export_name {
            map.serialize_entry("Export", &Expr::object([("Name", name.clone())]))?;
        }
        map.end()
    }
}

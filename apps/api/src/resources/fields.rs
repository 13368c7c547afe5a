//! Field configuration for dashboard forms, filters, and table columns.
//!
//! One closed tagged enum per field kind, so the renderer/compiler pairing is
//! exhaustive: adding a kind is a compile error everywhere it matters, not a
//! silently ignored descriptor.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// One form input. Serialized for the dashboard's form renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FieldConfig {
    Text {
        name: &'static str,
        label: &'static str,
        required: bool,
        placeholder: Option<&'static str>,
    },
    Number {
        name: &'static str,
        label: &'static str,
        required: bool,
    },
    TextArea {
        name: &'static str,
        label: &'static str,
        required: bool,
    },
    Select {
        name: &'static str,
        label: &'static str,
        required: bool,
        options: &'static [SelectOption],
    },
    Date {
        name: &'static str,
        label: &'static str,
        required: bool,
    },
    Upload {
        name: &'static str,
        label: &'static str,
        accept: &'static str,
    },
    NestedGroup {
        name: &'static str,
        label: &'static str,
        fields: Vec<FieldConfig>,
    },
    CustomComponent {
        name: &'static str,
        label: &'static str,
        component: &'static str,
    },
}

impl FieldConfig {
    pub fn name(&self) -> &'static str {
        match self {
            FieldConfig::Text { name, .. }
            | FieldConfig::Number { name, .. }
            | FieldConfig::TextArea { name, .. }
            | FieldConfig::Select { name, .. }
            | FieldConfig::Date { name, .. }
            | FieldConfig::Upload { name, .. }
            | FieldConfig::NestedGroup { name, .. }
            | FieldConfig::CustomComponent { name, .. } => name,
        }
    }
}

/// One table column as the data-table renderer expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnConfig {
    pub label: &'static str,
    pub name: &'static str,
    pub width: u32,
    pub filterable: bool,
}

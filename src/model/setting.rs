use serde::{Deserialize, Serialize};

use super::NamedEntity;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    View,
    Const,
    Adjustable,
    #[default]
    Custom,
}

/// A named value. Numeric settings (including the CPI rate) are evaluated
/// items and may be revalued by transactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Setting {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub hint: String,
    #[serde(rename = "TYPE", default)]
    pub kind: SettingKind,
}

impl Setting {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            hint: String::new(),
            kind: SettingKind::Custom,
        }
    }

    pub fn with_kind(mut self, kind: SettingKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }
}

impl NamedEntity for Setting {
    fn name(&self) -> &str {
        &self.name
    }
}

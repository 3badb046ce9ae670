use serde::{Deserialize, Serialize};

use super::NamedEntity;

/// A named symbolic date. `date` is a literal date or `other±N[dmy]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Trigger {
    pub name: String,
    pub date: String,
}

impl Trigger {
    pub fn new(name: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            date: date.into(),
        }
    }
}

impl NamedEntity for Trigger {
    fn name(&self) -> &str {
        &self.name
    }
}

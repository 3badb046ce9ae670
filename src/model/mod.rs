//! Declarative model records, shaped like the interchange document.

pub mod item;
pub mod setting;
pub mod transaction;
pub mod trigger;

pub use item::{Asset, Expense, Flow, Income};
pub use setting::{Setting, SettingKind};
pub use transaction::{Transaction, TransactionKind};
pub use trigger::Trigger;

use serde::{Deserialize, Serialize};

pub const CURRENT_MODEL_VERSION: u32 = 1;

/// Provides read-only access to an entity's name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Entities that may declare a category for aggregation.
pub trait BelongsToCategory {
    fn category(&self) -> Option<&str>;
}

pub(crate) fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// A complete projection model. The engine only ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    #[serde(default = "Model::version_default")]
    pub version: u32,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub incomes: Vec<Income>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub settings: Vec<Setting>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    pub fn new() -> Self {
        Self {
            version: CURRENT_MODEL_VERSION,
            triggers: Vec::new(),
            expenses: Vec::new(),
            incomes: Vec::new(),
            assets: Vec::new(),
            transactions: Vec::new(),
            settings: Vec::new(),
        }
    }

    pub fn version_default() -> u32 {
        CURRENT_MODEL_VERSION
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.assets.push(asset);
        self
    }

    pub fn with_income(mut self, income: Income) -> Self {
        self.incomes.push(income);
        self
    }

    pub fn with_expense(mut self, expense: Expense) -> Self {
        self.expenses.push(expense);
        self
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transactions.push(transaction);
        self
    }

    pub fn with_setting(mut self, setting: Setting) -> Self {
        self.settings.push(setting);
        self
    }

    pub fn setting(&self, name: &str) -> Option<&Setting> {
        self.settings.iter().find(|setting| setting.name == name)
    }

    /// Inserts or replaces a setting by name.
    pub fn set_setting(&mut self, setting: Setting) {
        match self.settings.iter_mut().find(|s| s.name == setting.name) {
            Some(existing) => *existing = setting,
            None => self.settings.push(setting),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_setting_replaces_existing() {
        let mut model = Model::new().with_setting(Setting::new("cpi", "2.5"));
        model.set_setting(Setting::new("cpi", "3"));
        assert_eq!(model.settings.len(), 1);
        assert_eq!(model.setting("cpi").unwrap().value, "3");
    }

    #[test]
    fn missing_arrays_default_to_empty() {
        let model: Model = serde_json::from_str(r#"{"assets": []}"#).unwrap();
        assert_eq!(model.version, CURRENT_MODEL_VERSION);
        assert!(model.triggers.is_empty());
        assert!(model.settings.is_empty());
    }
}

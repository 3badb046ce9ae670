use serde::{Deserialize, Serialize};

use super::{non_empty, BelongsToCategory, NamedEntity};

/// Closed set of transaction behaviours.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum TransactionKind {
    /// Moves funds from one item to another.
    #[default]
    Custom,
    RevalueAsset,
    RevalueDebt,
    RevalueIncome,
    RevalueExpense,
    RevalueSetting,
    /// Sells from an asset only when cash has gone negative.
    LiquidateAsset,
    /// Pays towards a debt without overpaying it.
    PayOffDebt,
    BondInvest,
    BondMature,
}

impl TransactionKind {
    pub fn is_revaluation(self) -> bool {
        matches!(
            self,
            TransactionKind::RevalueAsset
                | TransactionKind::RevalueDebt
                | TransactionKind::RevalueIncome
                | TransactionKind::RevalueExpense
                | TransactionKind::RevalueSetting
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Transaction {
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub date: String,
    #[serde(default)]
    pub stop_date: String,
    #[serde(default)]
    pub recurrence: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub from_value: String,
    #[serde(default)]
    pub from_absolute: bool,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub to_value: String,
    #[serde(default)]
    pub to_absolute: bool,
    #[serde(rename = "TYPE", default)]
    pub kind: TransactionKind,
}

impl Transaction {
    pub fn new(name: impl Into<String>, date: impl Into<String>, kind: TransactionKind) -> Self {
        Self {
            name: name.into(),
            category: String::new(),
            date: date.into(),
            stop_date: String::new(),
            recurrence: String::new(),
            from: String::new(),
            from_value: String::new(),
            from_absolute: true,
            to: String::new(),
            to_value: String::new(),
            to_absolute: true,
            kind,
        }
    }

    /// Absolute amount taken from `item`.
    pub fn from_item(mut self, item: impl Into<String>, value: impl Into<String>) -> Self {
        self.from = item.into();
        self.from_value = value.into();
        self.from_absolute = true;
        self
    }

    /// Fraction of `item`'s current value taken from it.
    pub fn from_fraction(mut self, item: impl Into<String>, fraction: impl Into<String>) -> Self {
        self.from = item.into();
        self.from_value = fraction.into();
        self.from_absolute = false;
        self
    }

    /// Absolute amount given to (or set on) `item`.
    pub fn to_item(mut self, item: impl Into<String>, value: impl Into<String>) -> Self {
        self.to = item.into();
        self.to_value = value.into();
        self.to_absolute = true;
        self
    }

    /// Proportional amount given to (or multiplier applied to) `item`.
    pub fn to_fraction(mut self, item: impl Into<String>, fraction: impl Into<String>) -> Self {
        self.to = item.into();
        self.to_value = fraction.into();
        self.to_absolute = false;
        self
    }

    pub fn with_recurrence(mut self, recurrence: impl Into<String>) -> Self {
        self.recurrence = recurrence.into();
        self
    }

    pub fn with_stop_date(mut self, stop: impl Into<String>) -> Self {
        self.stop_date = stop.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn has_from(&self) -> bool {
        non_empty(&self.from).is_some()
    }

    pub fn has_to(&self) -> bool {
        non_empty(&self.to).is_some()
    }
}

impl NamedEntity for Transaction {
    fn name(&self) -> &str {
        &self.name
    }
}

impl BelongsToCategory for Transaction {
    fn category(&self) -> Option<&str> {
        non_empty(&self.category)
    }
}

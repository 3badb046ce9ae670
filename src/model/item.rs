use serde::{Deserialize, Serialize};

use super::{non_empty, BelongsToCategory, NamedEntity};

/// An asset or, with `is_a_debt`, a debt. Debts declare the positive amount
/// owed; the engine tracks them as negative values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Asset {
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub start: String,
    pub value: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub growth: String,
    #[serde(default)]
    pub cpi_immune: bool,
    #[serde(default)]
    pub can_be_negative: bool,
    #[serde(default)]
    pub is_a_debt: bool,
    #[serde(default)]
    pub liability: String,
    #[serde(default)]
    pub purchase_price: String,
}

impl Asset {
    pub fn new(name: impl Into<String>, start: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: String::new(),
            start: start.into(),
            value: value.into(),
            quantity: String::new(),
            growth: "0".into(),
            cpi_immune: false,
            can_be_negative: false,
            is_a_debt: false,
            liability: String::new(),
            purchase_price: String::new(),
        }
    }

    /// A debt owing `value`; debts may always go negative.
    pub fn debt(name: impl Into<String>, start: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            is_a_debt: true,
            can_be_negative: true,
            ..Self::new(name, start, value)
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_growth(mut self, growth: impl Into<String>) -> Self {
        self.growth = growth.into();
        self
    }

    pub fn with_quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = quantity.into();
        self
    }

    pub fn with_liability(mut self, liability: impl Into<String>) -> Self {
        self.liability = liability.into();
        self
    }

    pub fn with_purchase_price(mut self, price: impl Into<String>) -> Self {
        self.purchase_price = price.into();
        self
    }

    pub fn cpi_immune(mut self) -> Self {
        self.cpi_immune = true;
        self
    }

    pub fn can_be_negative(mut self) -> Self {
        self.can_be_negative = true;
        self
    }
}

impl NamedEntity for Asset {
    fn name(&self) -> &str {
        &self.name
    }
}

impl BelongsToCategory for Asset {
    fn category(&self) -> Option<&str> {
        non_empty(&self.category)
    }
}

/// A recurring income or expense.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Flow {
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub start: String,
    #[serde(default)]
    pub end: String,
    pub value: String,
    #[serde(default)]
    pub value_set: String,
    #[serde(default)]
    pub cpi_immune: bool,
    #[serde(default)]
    pub liability: String,
    #[serde(default)]
    pub recurrence: String,
}

pub type Income = Flow;
pub type Expense = Flow;

impl Flow {
    pub fn new(name: impl Into<String>, start: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: String::new(),
            start: start.into(),
            end: String::new(),
            value: value.into(),
            value_set: String::new(),
            cpi_immune: false,
            liability: String::new(),
            recurrence: String::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = end.into();
        self
    }

    pub fn with_value_set(mut self, date: impl Into<String>) -> Self {
        self.value_set = date.into();
        self
    }

    pub fn with_recurrence(mut self, recurrence: impl Into<String>) -> Self {
        self.recurrence = recurrence.into();
        self
    }

    pub fn with_liability(mut self, liability: impl Into<String>) -> Self {
        self.liability = liability.into();
        self
    }

    pub fn cpi_immune(mut self) -> Self {
        self.cpi_immune = true;
        self
    }
}

impl NamedEntity for Flow {
    fn name(&self) -> &str {
        &self.name
    }
}

impl BelongsToCategory for Flow {
    fn category(&self) -> Option<&str> {
        non_empty(&self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_fields_use_interchange_names() {
        let json = r#"{
            "NAME": "savings", "START": "1 Jan 2018", "VALUE": "500",
            "GROWTH": "12", "CPI_IMMUNE": true, "CATEGORY": "Cash"
        }"#;
        let asset: Asset = serde_json::from_str(json).unwrap();
        assert_eq!(asset.growth, "12");
        assert!(asset.cpi_immune);
        assert!(!asset.can_be_negative);
        assert_eq!(asset.category(), Some("Cash"));
        assert!(asset.quantity.is_empty());
    }

    #[test]
    fn debt_constructor_allows_negative() {
        let debt = Asset::debt("Mortgage", "1 Jan 2018", "100000");
        assert!(debt.is_a_debt);
        assert!(debt.can_be_negative);
    }

    #[test]
    fn blank_category_reads_as_none() {
        let flow = Flow::new("Phon", "1 Jan 2018", "1").with_category("  ");
        assert_eq!(flow.category(), None);
    }
}

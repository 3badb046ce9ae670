use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
    config::Vocabulary,
    model::{BelongsToCategory, Model, NamedEntity},
};

pub const VIEW_FREQUENCY: &str = "View frequency";
pub const VIEW_DETAIL: &str = "View detail";
pub const ASSET_CHART_TYPE: &str = "Type of view for asset chart";
pub const DEBT_CHART_TYPE: &str = "Type of view for debt chart";
pub const ASSET_CHART_FOCUS: &str = "Focus of assets chart";
pub const DEBT_CHART_FOCUS: &str = "Focus of debts chart";
pub const INCOME_CHART_FOCUS: &str = "Focus of incomes chart";
pub const EXPENSE_CHART_FOCUS: &str = "Focus of expenses chart";
pub const TAX_CHART_FOCUS: &str = "Focus of tax chart";
pub const TAX_CHART_NET_INCOME: &str = "Show net income in tax chart";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Monthly,
    Annually,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Detail {
    Categorised,
    Detailed,
    Total,
}

/// What an asset or debt chart plots: values, or the positive and/or
/// negative changes to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartType {
    #[serde(rename = "val")]
    Value,
    #[serde(rename = "+")]
    Additions,
    #[serde(rename = "-")]
    Reductions,
    #[serde(rename = "+-")]
    Changes,
}

impl ChartType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "val" => Some(ChartType::Value),
            "+" => Some(ChartType::Additions),
            "-" => Some(ChartType::Reductions),
            "+-" => Some(ChartType::Changes),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChartType::Value => "val",
            ChartType::Additions => "+",
            ChartType::Reductions => "-",
            ChartType::Changes => "+-",
        }
    }

    pub fn keeps(self, change: f64) -> bool {
        match self {
            ChartType::Value => false,
            ChartType::Additions => change > 0.0,
            ChartType::Reductions => change < 0.0,
            ChartType::Changes => change != 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartKind {
    Asset,
    Debt,
    Income,
    Expense,
    Tax,
}

impl ChartKind {
    const ALL: [ChartKind; 5] = [
        ChartKind::Asset,
        ChartKind::Debt,
        ChartKind::Income,
        ChartKind::Expense,
        ChartKind::Tax,
    ];

    fn focus_key(self) -> &'static str {
        match self {
            ChartKind::Asset => ASSET_CHART_FOCUS,
            ChartKind::Debt => DEBT_CHART_FOCUS,
            ChartKind::Income => INCOME_CHART_FOCUS,
            ChartKind::Expense => EXPENSE_CHART_FOCUS,
            ChartKind::Tax => TAX_CHART_FOCUS,
        }
    }
}

/// Display configuration for the chart aggregator. Every write is validated
/// against the model the settings were created for.
#[derive(Debug, Clone)]
pub struct ViewSettings {
    frequency: Frequency,
    detail: Detail,
    asset_chart_type: ChartType,
    debt_chart_type: ChartType,
    tax_net_income: bool,
    focus: HashMap<ChartKind, String>,
    choices: HashMap<ChartKind, BTreeSet<String>>,
    all_items: String,
}

impl ViewSettings {
    pub fn new(model: &Model, vocabulary: &Vocabulary) -> Self {
        let mut choices: HashMap<ChartKind, BTreeSet<String>> = HashMap::new();
        let mut add = |kind: ChartKind, name: &str, category: Option<&str>| {
            let entry = choices.entry(kind).or_default();
            entry.insert(name.to_string());
            if let Some(category) = category {
                entry.insert(category.to_string());
            }
        };
        for asset in &model.assets {
            let kind = if asset.is_a_debt {
                ChartKind::Debt
            } else {
                ChartKind::Asset
            };
            add(kind, asset.name(), asset.category());
        }
        for income in &model.incomes {
            add(ChartKind::Income, income.name(), income.category());
        }
        for expense in &model.expenses {
            add(ChartKind::Expense, expense.name(), expense.category());
        }

        let labels = model
            .incomes
            .iter()
            .map(|income| income.liability.trim())
            .chain(model.assets.iter().map(|asset| asset.liability.trim()))
            .filter(|label| !label.is_empty())
            .map(str::to_string);
        choices.entry(ChartKind::Tax).or_default().extend(labels);

        let all_items = vocabulary.all_items.clone();
        let focus = ChartKind::ALL
            .iter()
            .map(|kind| (*kind, all_items.clone()))
            .collect();
        Self {
            frequency: Frequency::Annually,
            detail: Detail::Categorised,
            asset_chart_type: ChartType::Value,
            debt_chart_type: ChartType::Value,
            tax_net_income: true,
            focus,
            choices,
            all_items,
        }
    }

    /// Sets one view setting. Returns whether `value` was accepted.
    pub fn set_view_setting(&mut self, key: &str, value: &str) -> bool {
        match key {
            VIEW_FREQUENCY => match value {
                "Monthly" => self.frequency = Frequency::Monthly,
                "Annually" => self.frequency = Frequency::Annually,
                _ => return false,
            },
            VIEW_DETAIL => match value {
                "Categorised" => self.detail = Detail::Categorised,
                "Detailed" => self.detail = Detail::Detailed,
                "Total" => self.detail = Detail::Total,
                _ => return false,
            },
            ASSET_CHART_TYPE => match ChartType::parse(value) {
                Some(chart_type) => self.asset_chart_type = chart_type,
                None => return false,
            },
            DEBT_CHART_TYPE => match ChartType::parse(value) {
                Some(chart_type) => self.debt_chart_type = chart_type,
                None => return false,
            },
            TAX_CHART_NET_INCOME => match value {
                "Y" => self.tax_net_income = true,
                "N" => self.tax_net_income = false,
                _ => return false,
            },
            _ => {
                let Some(kind) = ChartKind::ALL
                    .into_iter()
                    .find(|kind| kind.focus_key() == key)
                else {
                    return false;
                };
                let known = value == self.all_items
                    || self
                        .choices
                        .get(&kind)
                        .map_or(false, |choices| choices.contains(value));
                if !known {
                    return false;
                }
                self.focus.insert(kind, value.to_string());
            }
        }
        true
    }

    pub fn get_view_setting(&self, key: &str) -> Option<String> {
        let value = match key {
            VIEW_FREQUENCY => format!("{:?}", self.frequency),
            VIEW_DETAIL => format!("{:?}", self.detail),
            ASSET_CHART_TYPE => self.asset_chart_type.as_str().to_string(),
            DEBT_CHART_TYPE => self.debt_chart_type.as_str().to_string(),
            TAX_CHART_NET_INCOME => {
                let flag = if self.tax_net_income { "Y" } else { "N" };
                flag.to_string()
            }
            _ => {
                let kind = ChartKind::ALL
                    .into_iter()
                    .find(|kind| kind.focus_key() == key)?;
                self.focus(kind).to_string()
            }
        };
        Some(value)
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn detail(&self) -> Detail {
        self.detail
    }

    pub fn chart_type(&self, kind: ChartKind) -> ChartType {
        match kind {
            ChartKind::Asset => self.asset_chart_type,
            ChartKind::Debt => self.debt_chart_type,
            _ => ChartType::Value,
        }
    }

    pub fn tax_net_income(&self) -> bool {
        self.tax_net_income
    }

    pub fn focus(&self, kind: ChartKind) -> &str {
        self.focus
            .get(&kind)
            .map_or(self.all_items.as_str(), String::as_str)
    }

    pub fn is_focused_on_all(&self, kind: ChartKind) -> bool {
        self.focus(kind) == self.all_items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Expense, Income};

    fn settings() -> ViewSettings {
        let model = Model::new()
            .with_asset(Asset::new("savings", "1 Jan 2018", "500").with_category("Savings"))
            .with_asset(Asset::debt("Mortgage", "1 Jan 2018", "1000"))
            .with_income(Income::new("Salary", "1 Jan 2018", "10").with_liability("Joe"))
            .with_expense(Expense::new("Phon", "1 Jan 2018", "1"));
        ViewSettings::new(&model, &Vocabulary::default())
    }

    #[test]
    fn defaults() {
        let view = settings();
        assert_eq!(view.frequency(), Frequency::Annually);
        assert_eq!(view.detail(), Detail::Categorised);
        assert_eq!(view.chart_type(ChartKind::Asset), ChartType::Value);
        assert!(view.is_focused_on_all(ChartKind::Expense));
        assert!(view.tax_net_income());
    }

    #[test]
    fn validates_enumerated_values() {
        let mut view = settings();
        assert!(view.set_view_setting(VIEW_FREQUENCY, "Monthly"));
        assert!(!view.set_view_setting(VIEW_FREQUENCY, "Weekly"));
        assert_eq!(view.frequency(), Frequency::Monthly);
        assert!(view.set_view_setting(ASSET_CHART_TYPE, "+-"));
        assert!(!view.set_view_setting(DEBT_CHART_TYPE, "sum"));
        assert!(view.set_view_setting(TAX_CHART_NET_INCOME, "N"));
        assert_eq!(view.get_view_setting(TAX_CHART_NET_INCOME).as_deref(), Some("N"));
        assert!(!view.set_view_setting("No such setting", "Y"));
    }

    #[test]
    fn focus_must_name_a_known_item_or_category() {
        let mut view = settings();
        assert!(view.set_view_setting(ASSET_CHART_FOCUS, "Savings"));
        assert!(view.set_view_setting(ASSET_CHART_FOCUS, "savings"));
        assert!(!view.set_view_setting(ASSET_CHART_FOCUS, "Mortgage"));
        assert!(view.set_view_setting(DEBT_CHART_FOCUS, "Mortgage"));
        assert!(view.set_view_setting(TAX_CHART_FOCUS, "Joe"));
        assert!(!view.set_view_setting(EXPENSE_CHART_FOCUS, "Salary"));
        assert!(view.set_view_setting(EXPENSE_CHART_FOCUS, "All"));
        assert_eq!(view.focus(ChartKind::Asset), "savings");
    }
}

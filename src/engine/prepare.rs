use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::{
    config::Vocabulary,
    errors::ModelError,
    model::{non_empty, Asset, Flow, Model, Transaction, TransactionKind},
    recurrence::{occurrences, shift_month, DateWindow, RecurrenceSpec},
    resolve::{parse_number, DateResolver, SettingValues, ValueExpr},
};

use super::Roi;

#[derive(Debug)]
pub(crate) struct PreparedAsset {
    pub name: String,
    pub category: String,
    pub start: NaiveDate,
    pub value: ValueExpr,
    pub units: Option<f64>,
    pub growth: ValueExpr,
    pub cpi_immune: bool,
    pub can_be_negative: bool,
    pub is_debt: bool,
    pub liability: Option<String>,
    pub purchase_price: Option<ValueExpr>,
}

#[derive(Debug)]
pub(crate) struct PreparedFlow {
    pub name: String,
    pub category: String,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub valuation: NaiveDate,
    pub value: ValueExpr,
    pub cpi_immune: bool,
    pub liability: Option<String>,
    pub recurrence: Option<RecurrenceSpec>,
    pub occurrences: Vec<NaiveDate>,
}

/// Where a transaction's TO side lands.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Target {
    Asset(usize),
    Income(usize),
    Expense(usize),
    Setting(String),
}

#[derive(Debug)]
pub(crate) struct PreparedTransaction {
    pub name: String,
    pub kind: TransactionKind,
    pub occurrences: Vec<NaiveDate>,
    pub from: Option<usize>,
    pub from_value: Option<ValueExpr>,
    pub from_absolute: bool,
    pub to: Option<Target>,
    pub to_value: Option<ValueExpr>,
    pub to_absolute: bool,
}

/// A model with every date resolved, every expression parsed and checked, and
/// every recurrence expanded up to the horizon.
#[derive(Debug)]
pub(crate) struct PreparedModel {
    pub assets: Vec<PreparedAsset>,
    pub incomes: Vec<PreparedFlow>,
    pub expenses: Vec<PreparedFlow>,
    pub transactions: Vec<PreparedTransaction>,
    pub settings: HashMap<String, f64>,
    pub asset_index: HashMap<String, usize>,
    pub cash: Option<usize>,
    pub cpi_key: String,
    pub horizon: NaiveDate,
}

impl PreparedModel {
    pub fn prepare(
        model: &Model,
        roi: Roi,
        focus: NaiveDate,
        vocabulary: &Vocabulary,
    ) -> Result<Self, ModelError> {
        let mut dates = DateResolver::new(&model.triggers)?;
        dates.resolve_all()?;

        let settings = SettingValues::resolve(&model.settings)?;
        if settings.is_text(&vocabulary.cpi) {
            return Err(ModelError::TextSetting(vocabulary.cpi.clone()));
        }

        let mut asset_index = HashMap::new();
        for (index, asset) in model.assets.iter().enumerate() {
            asset_index.entry(asset.name.clone()).or_insert(index);
        }
        let last = roi.end.max(focus);
        let horizon = shift_month(last, 1)
            .ok_or_else(|| ModelError::MissingRoi(format!("no month follows {}", last)))?;
        let binder = Binder {
            settings: &settings,
            assets: &asset_index,
        };

        let assets = model
            .assets
            .iter()
            .map(|asset| prepare_asset(asset, &mut dates, &binder))
            .collect::<Result<Vec<_>, _>>()?;
        let incomes = model
            .incomes
            .iter()
            .map(|income| prepare_flow(income, &mut dates, &binder, horizon))
            .collect::<Result<Vec<_>, _>>()?;
        let expenses = model
            .expenses
            .iter()
            .map(|expense| prepare_flow(expense, &mut dates, &binder, horizon))
            .collect::<Result<Vec<_>, _>>()?;

        let cash = asset_index.get(&vocabulary.cash).copied();
        let lookup = Lookup {
            model,
            assets: &asset_index,
            settings: &settings,
            cash,
        };
        let transactions = model
            .transactions
            .iter()
            .map(|txn| prepare_transaction(txn, &mut dates, &binder, &lookup, horizon))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            assets = assets.len(),
            incomes = incomes.len(),
            expenses = expenses.len(),
            transactions = transactions.len(),
            %horizon,
            "model prepared"
        );
        Ok(Self {
            assets,
            incomes,
            expenses,
            transactions,
            settings: settings.into_numeric(),
            asset_index,
            cash,
            cpi_key: vocabulary.cpi.clone(),
            horizon,
        })
    }

    /// Earliest date any item or transaction becomes active.
    pub fn first_date(&self) -> Option<NaiveDate> {
        let assets = self.assets.iter().map(|asset| asset.start);
        let flows = self
            .incomes
            .iter()
            .chain(&self.expenses)
            .map(|flow| flow.valuation);
        let transactions = self
            .transactions
            .iter()
            .filter_map(|txn| txn.occurrences.first().copied());
        assets.chain(flows).chain(transactions).min()
    }

    /// Whether any income or asset can contribute to a tax pool.
    pub fn has_liabilities(&self) -> bool {
        self.incomes.iter().any(|flow| flow.liability.is_some())
            || self.assets.iter().any(|asset| asset.liability.is_some())
    }
}

/// Checks that value expressions only name numeric settings or assets.
struct Binder<'a> {
    settings: &'a SettingValues,
    assets: &'a HashMap<String, usize>,
}

impl Binder<'_> {
    fn expr(&self, raw: &str, context: &str) -> Result<ValueExpr, ModelError> {
        let expr = ValueExpr::parse(raw, context)?;
        if let Some(name) = expr.reference() {
            if self.settings.is_text(name) {
                return Err(ModelError::TextSetting(name.to_string()));
            }
            if self.settings.get(name).is_none() && !self.assets.contains_key(name) {
                return Err(ModelError::unknown(context, name));
            }
        }
        Ok(expr)
    }

    /// Growth rates are percentages whether or not they carry a `%`.
    fn rate(&self, raw: &str, context: &str) -> Result<ValueExpr, ModelError> {
        let trimmed = raw.trim().trim_end_matches('%');
        if trimmed.is_empty() {
            return Ok(ValueExpr::Number(0.0));
        }
        self.expr(trimmed, context)
    }
}

struct Lookup<'a> {
    model: &'a Model,
    assets: &'a HashMap<String, usize>,
    settings: &'a SettingValues,
    cash: Option<usize>,
}

impl Lookup<'_> {
    fn asset(&self, name: &str, context: &str) -> Result<usize, ModelError> {
        self.assets
            .get(name.trim())
            .copied()
            .ok_or_else(|| ModelError::unknown(context, name))
    }

    fn target(&self, kind: TransactionKind, name: &str, context: &str) -> Result<Target, ModelError> {
        let name = name.trim();
        match kind {
            TransactionKind::RevalueIncome => position(&self.model.incomes, name)
                .map(Target::Income)
                .ok_or_else(|| ModelError::unknown(context, name)),
            TransactionKind::RevalueExpense => position(&self.model.expenses, name)
                .map(Target::Expense)
                .ok_or_else(|| ModelError::unknown(context, name)),
            TransactionKind::RevalueSetting => {
                if self.settings.is_text(name) {
                    Err(ModelError::TextSetting(name.to_string()))
                } else if self.settings.get(name).is_some() {
                    Ok(Target::Setting(name.to_string()))
                } else {
                    Err(ModelError::unknown(context, name))
                }
            }
            _ => self.asset(name, context).map(Target::Asset),
        }
    }
}

fn position(flows: &[Flow], name: &str) -> Option<usize> {
    flows.iter().position(|flow| flow.name == name)
}

fn liability(raw: &str) -> Option<String> {
    non_empty(raw).map(str::to_string)
}

fn prepare_asset(
    asset: &Asset,
    dates: &mut DateResolver<'_>,
    binder: &Binder<'_>,
) -> Result<PreparedAsset, ModelError> {
    let context = asset.name.as_str();
    let units = match non_empty(&asset.quantity) {
        Some(raw) => {
            let units = parse_number(raw)
                .filter(|units| *units >= 0.0)
                .ok_or_else(|| ModelError::InvalidQuantity {
                    context: context.to_string(),
                    value: raw.to_string(),
                })?;
            Some(units)
        }
        None => None,
    };
    let purchase_price = non_empty(&asset.purchase_price)
        .map(|raw| binder.expr(raw, context))
        .transpose()?;

    Ok(PreparedAsset {
        name: asset.name.clone(),
        category: asset.category.trim().to_string(),
        start: dates.resolve(&asset.start, context)?,
        value: binder.expr(&asset.value, context)?,
        units,
        growth: binder.rate(&asset.growth, context)?,
        cpi_immune: asset.cpi_immune,
        can_be_negative: asset.can_be_negative || asset.is_a_debt,
        is_debt: asset.is_a_debt,
        liability: liability(&asset.liability),
        purchase_price,
    })
}

fn prepare_flow(
    flow: &Flow,
    dates: &mut DateResolver<'_>,
    binder: &Binder<'_>,
    horizon: NaiveDate,
) -> Result<PreparedFlow, ModelError> {
    let context = flow.name.as_str();
    let start = dates.resolve(&flow.start, context)?;
    let end = dates.resolve_optional(&flow.end, context)?;
    let valuation = dates
        .resolve_optional(&flow.value_set, context)?
        .map_or(start, |set| set.min(start));
    let recurrence = recurrence(&flow.recurrence, context, start)?;
    let occurrences = DateWindow::new(start, horizon)
        .map(|window| occurrences(start, end, recurrence.as_ref(), window))
        .unwrap_or_default();

    Ok(PreparedFlow {
        name: flow.name.clone(),
        category: flow.category.trim().to_string(),
        start,
        end,
        valuation,
        value: binder.expr(&flow.value, context)?,
        cpi_immune: flow.cpi_immune,
        liability: liability(&flow.liability),
        recurrence,
        occurrences,
    })
}

/// Parses an optional recurrence, rejecting one whose second occurrence
/// already falls off the calendar.
fn recurrence(
    raw: &str,
    context: &str,
    anchor: NaiveDate,
) -> Result<Option<RecurrenceSpec>, ModelError> {
    let Some(raw) = non_empty(raw) else {
        return Ok(None);
    };
    let spec = RecurrenceSpec::parse(raw, context)?;
    if spec.nth(anchor, 1).is_none() {
        return Err(ModelError::InvalidRecurrence {
            context: context.to_string(),
            value: raw.to_string(),
        });
    }
    Ok(Some(spec))
}

fn missing(context: &str, side: &str) -> ModelError {
    ModelError::invalid_value(format!("{} {}", context, side), "")
}

fn prepare_transaction(
    txn: &Transaction,
    dates: &mut DateResolver<'_>,
    binder: &Binder<'_>,
    lookup: &Lookup<'_>,
    horizon: NaiveDate,
) -> Result<PreparedTransaction, ModelError> {
    let context = txn.name.as_str();
    let kind = txn.kind;
    let date = dates.resolve(&txn.date, context)?;
    let stop = dates.resolve_optional(&txn.stop_date, context)?;
    let recurrence = recurrence(&txn.recurrence, context, date)?;

    let needs_from = matches!(
        kind,
        TransactionKind::LiquidateAsset
            | TransactionKind::PayOffDebt
            | TransactionKind::BondInvest
            | TransactionKind::BondMature
    );
    let needs_to = kind.is_revaluation()
        || matches!(
            kind,
            TransactionKind::PayOffDebt | TransactionKind::BondInvest | TransactionKind::BondMature
        );

    let from = if txn.has_from() && !kind.is_revaluation() {
        Some(lookup.asset(&txn.from, context)?)
    } else if needs_from {
        return Err(missing(context, "FROM"));
    } else {
        None
    };
    let from_value = match (from, kind) {
        (Some(_), TransactionKind::BondMature) | (None, _) => None,
        (Some(_), _) => Some(binder.expr(&txn.from_value, context)?),
    };

    let to = match kind {
        TransactionKind::LiquidateAsset => None,
        _ if txn.has_to() => Some(lookup.target(kind, &txn.to, context)?),
        _ if needs_to => return Err(missing(context, "TO")),
        _ => None,
    };
    let to_value = match non_empty(&txn.to_value) {
        Some(raw) if to.is_some() => Some(binder.expr(raw, context)?),
        _ if kind.is_revaluation() => return Err(missing(context, "TO_VALUE")),
        _ => None,
    };

    if kind == TransactionKind::Custom {
        if from.is_none() && to.is_none() {
            return Err(missing(context, "FROM"));
        }
        if from.is_none() && (to_value.is_none() || !txn.to_absolute) {
            return Err(missing(context, "TO_VALUE"));
        }
    }
    if kind == TransactionKind::LiquidateAsset && lookup.cash.is_none() {
        return Err(ModelError::MissingCash(txn.name.clone()));
    }

    let occurrences = DateWindow::new(date, horizon)
        .map(|window| occurrences(date, stop, recurrence.as_ref(), window))
        .unwrap_or_default();

    Ok(PreparedTransaction {
        name: txn.name.clone(),
        kind,
        occurrences,
        from,
        from_value,
        from_absolute: txn.from_absolute,
        to,
        to_value,
        to_absolute: txn.to_absolute,
    })
}

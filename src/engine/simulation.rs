use chrono::NaiveDate;
use tracing::debug;

use crate::{
    config::{TaxYearEnd, Vocabulary},
    errors::{SkipReason, SkippedTransaction},
    model::TransactionKind,
    recurrence::shift_month,
    resolve::ValueExpr,
    utils::{monthly_factor, round_money},
};

use super::{
    prepare::{PreparedFlow, PreparedModel, PreparedTransaction, Target},
    schedule::{build_calendar, Event, EventKind, FlowKind},
    state::{settle, BondLot, FlowState, Leg, RunState},
    tax::{TaxAssessor, TaxSchedule},
    Evaluation, EvaluationResult, ItemSnapshot, Roi,
};

/// Amount leaving a transaction's FROM item.
#[derive(Debug, Clone, Copy)]
struct Outflow {
    asset: usize,
    money: f64,
    units: Option<f64>,
}

/// One evaluation run over a prepared model.
pub(crate) struct Simulation<'a> {
    prepared: &'a PreparedModel,
    vocabulary: &'a Vocabulary,
    schedule: &'a dyn TaxSchedule,
    roi: Roi,
    focus: NaiveDate,
    flow_floor: NaiveDate,
    state: RunState,
    tax: TaxAssessor,
    output: EvaluationResult,
}

impl<'a> Simulation<'a> {
    pub fn new(
        prepared: &'a PreparedModel,
        vocabulary: &'a Vocabulary,
        schedule: &'a dyn TaxSchedule,
        roi: Roi,
        focus: NaiveDate,
    ) -> Self {
        Self {
            prepared,
            vocabulary,
            schedule,
            roi,
            focus,
            flow_floor: shift_month(roi.start, -1).unwrap_or(NaiveDate::MIN),
            state: RunState::new(prepared),
            tax: TaxAssessor::new(),
            output: EvaluationResult {
                roi: Some(roi),
                ..EvaluationResult::default()
            },
        }
    }

    pub fn run(mut self, tax_year_end: &TaxYearEnd) -> EvaluationResult {
        let events = build_calendar(self.prepared, tax_year_end);
        let mut snapshot_taken = false;
        for (position, event) in events.iter().enumerate() {
            self.handle(event);
            let last_of_day = events
                .get(position + 1)
                .map_or(true, |next| next.date != event.date);
            if last_of_day && !snapshot_taken && event.date > self.focus {
                self.take_snapshots();
                snapshot_taken = true;
            }
        }
        if !snapshot_taken {
            self.take_snapshots();
        }
        self.finish()
    }

    fn handle(&mut self, event: &Event) {
        let date = event.date;
        match event.kind {
            EventKind::AssetStart(index) => self.start_asset(index, date),
            EventKind::FlowStart(kind, index) => self.start_flow(kind, index),
            EventKind::AssetGrowth(index) => self.grow_asset(index, date),
            EventKind::FlowGrowth(kind, index) => self.grow_flow(kind, index),
            EventKind::Payment(kind, index) => self.pay(kind, index, date),
            EventKind::Transaction(index) => self.transact(index, date),
            EventKind::TaxAssessment => self.assess_tax(date),
        }
    }

    fn eval(&self, expr: &ValueExpr) -> f64 {
        expr.evaluate(|name| self.state.lookup(self.prepared, name))
            .unwrap_or(0.0)
    }

    fn cpi(&self) -> f64 {
        self.state.setting(&self.prepared.cpi_key)
    }

    fn start_asset(&mut self, index: usize, date: NaiveDate) {
        let prepared = self.prepared;
        let asset = &prepared.assets[index];
        let value = self.eval(&asset.value);
        let purchase_price = asset.purchase_price.as_ref().map(|expr| self.eval(expr));
        let state = &mut self.state.assets[index];
        state.price = if asset.is_debt { -value } else { value };
        state.purchase_price = purchase_price;
        state.started = true;
        self.emit_asset(index, date);
    }

    fn grow_asset(&mut self, index: usize, date: NaiveDate) {
        let (prepared, vocabulary) = (self.prepared, self.vocabulary);
        let asset = &prepared.assets[index];
        let cpi_factor = monthly_factor(self.cpi());
        let mut factor = monthly_factor(self.eval(&asset.growth));
        if !asset.cpi_immune {
            factor *= cpi_factor;
        }
        let state = &mut self.state.assets[index];
        let before = state.value();
        state.price *= factor;
        state.cpi_index *= cpi_factor;
        let change = state.value() - before;
        self.emit_delta(&vocabulary.growth_marker, index, date, change);
        self.emit_asset(index, date);
    }

    fn start_flow(&mut self, kind: FlowKind, index: usize) {
        let value = self.eval(&self.flow(kind, index).value);
        let state = self.flow_state(kind, index);
        state.value = value;
        state.started = true;
    }

    fn grow_flow(&mut self, kind: FlowKind, index: usize) {
        if self.flow(kind, index).cpi_immune {
            return;
        }
        let factor = monthly_factor(self.cpi());
        self.flow_state(kind, index).value *= factor;
    }

    fn pay(&mut self, kind: FlowKind, index: usize, date: NaiveDate) {
        let flow = self.flow(kind, index);
        let value = self.flow_state(kind, index).value;
        if date < self.roi.end && date >= self.flow_floor {
            self.output
                .evaluations
                .push(Evaluation::new(&flow.name, date, round_money(value)));
        }
        if let Some(cash) = self.prepared.cash {
            let money = match kind {
                FlowKind::Income => value,
                FlowKind::Expense => -value,
            };
            self.state.assets[cash].price += money;
            self.emit_delta(&flow.name, cash, date, money);
            self.emit_asset(cash, date);
        }
        if let (FlowKind::Income, Some(label)) = (kind, flow.liability.as_deref()) {
            self.tax.contribute(label, value);
        }
    }

    fn transact(&mut self, index: usize, date: NaiveDate) {
        let prepared = self.prepared;
        let txn = &prepared.transactions[index];
        match txn.kind {
            TransactionKind::Custom | TransactionKind::BondInvest => self.transfer(txn, date),
            TransactionKind::LiquidateAsset => self.liquidate(txn, date),
            TransactionKind::PayOffDebt => self.pay_off(txn, date),
            TransactionKind::BondMature => self.mature(txn, date),
            TransactionKind::RevalueAsset
            | TransactionKind::RevalueDebt
            | TransactionKind::RevalueIncome
            | TransactionKind::RevalueExpense
            | TransactionKind::RevalueSetting => self.revalue(txn, date),
        }
    }

    fn outflow(&self, txn: &PreparedTransaction) -> Option<Outflow> {
        let asset = txn.from?;
        let amount = txn
            .from_value
            .as_ref()
            .map_or(0.0, |expr| self.eval(expr));
        let state = &self.state.assets[asset];
        let (money, units) = match (txn.from_absolute, state.units) {
            (true, Some(_)) => (amount * state.price, Some(amount)),
            (true, None) => (amount, None),
            (false, units) => (amount * state.value(), units.map(|units| units * amount)),
        };
        Some(Outflow {
            asset,
            money,
            units,
        })
    }

    fn to_asset(txn: &PreparedTransaction) -> Option<usize> {
        match txn.to {
            Some(Target::Asset(index)) => Some(index),
            _ => None,
        }
    }

    fn transfer(&mut self, txn: &PreparedTransaction, date: NaiveDate) {
        let outflow = self.outflow(txn);
        let from_money = outflow.map_or(0.0, |out| out.money);
        let inflow = Self::to_asset(txn).map(|to| {
            let state = &self.state.assets[to];
            let (money, units) = match txn.to_value.as_ref() {
                Some(expr) if txn.to_absolute => {
                    let amount = self.eval(expr);
                    match state.units {
                        Some(_) => (amount * state.price, Some(amount)),
                        None => (amount, None),
                    }
                }
                Some(expr) => {
                    let money = self.eval(expr) * from_money;
                    (money, state.units_for(money))
                }
                None => (from_money, state.units_for(from_money)),
            };
            Leg {
                asset: to,
                money,
                units,
            }
        });

        let mut legs = Vec::with_capacity(2);
        if let Some(out) = outflow {
            legs.push(Leg {
                asset: out.asset,
                money: -out.money,
                units: out.units.map(|units| -units),
            });
        }
        legs.extend(inflow);

        if self.commit(txn, date, &legs) && txn.kind == TransactionKind::BondInvest {
            if let Some(inflow) = inflow {
                let bond = &mut self.state.assets[inflow.asset];
                let cpi_index = bond.cpi_index;
                bond.lots.push_back(BondLot {
                    principal: inflow.money,
                    cpi_index,
                });
            }
        }
    }

    fn liquidate(&mut self, txn: &PreparedTransaction, date: NaiveDate) {
        let Some(cash) = self.prepared.cash else {
            return;
        };
        let shortfall = -self.state.assets[cash].value();
        let Some(out) = self.outflow(txn) else {
            return;
        };
        let mut moved = out.money.min(shortfall);
        if !self.prepared.assets[out.asset].can_be_negative {
            moved = moved.min(self.state.assets[out.asset].value());
        }
        if moved <= 0.0 {
            return;
        }
        let units = self.state.assets[out.asset].units_for(moved);
        let legs = [
            Leg {
                asset: out.asset,
                money: -moved,
                units: units.map(|units| -units),
            },
            Leg {
                asset: cash,
                money: moved,
                units: None,
            },
        ];
        self.commit(txn, date, &legs);
    }

    fn pay_off(&mut self, txn: &PreparedTransaction, date: NaiveDate) {
        let (Some(out), Some(debt)) = (self.outflow(txn), Self::to_asset(txn)) else {
            return;
        };
        let outstanding = -self.state.assets[debt].value();
        let payment = out.money.min(outstanding);
        if payment <= 0.0 {
            return;
        }
        let source_units = self.state.assets[out.asset].units_for(payment);
        let legs = [
            Leg {
                asset: out.asset,
                money: -payment,
                units: source_units.map(|units| -units),
            },
            Leg {
                asset: debt,
                money: payment,
                units: self.state.assets[debt].units_for(payment),
            },
        ];
        self.commit(txn, date, &legs);
    }

    fn mature(&mut self, txn: &PreparedTransaction, date: NaiveDate) {
        let (Some(bond), Some(to)) = (txn.from, Self::to_asset(txn)) else {
            return;
        };
        let Some(lot) = self.state.assets[bond].lots.front().copied() else {
            self.skip(txn, date, bond, SkipReason::NoBondLot);
            return;
        };
        let state = &self.state.assets[bond];
        let payout = lot.principal * state.cpi_index / lot.cpi_index;
        let reduction = if self.prepared.assets[bond].cpi_immune {
            lot.principal
        } else {
            payout
        };
        let legs = [
            Leg {
                asset: bond,
                money: -reduction,
                units: state.units_for(-reduction),
            },
            Leg {
                asset: to,
                money: payout,
                units: self.state.assets[to].units_for(payout),
            },
        ];
        if self.commit(txn, date, &legs) {
            self.state.assets[bond].lots.pop_front();
        }
    }

    fn revalue(&mut self, txn: &PreparedTransaction, date: NaiveDate) {
        let Some(target) = txn.to.as_ref() else {
            return;
        };
        let amount = txn.to_value.as_ref().map_or(0.0, |expr| self.eval(expr));
        let rescale = |current: f64| {
            if txn.to_absolute {
                amount
            } else {
                current * amount
            }
        };
        let (prepared, vocabulary) = (self.prepared, self.vocabulary);
        match target {
            Target::Asset(index) => {
                let index = *index;
                let asset = &prepared.assets[index];
                let mut next = self.state.assets[index].clone();
                let before = next.value();
                next.price = match (txn.to_absolute, asset.is_debt) {
                    (true, true) => -amount,
                    (true, false) => amount,
                    (false, _) => next.price * amount,
                };
                if !settle(&mut next, asset.can_be_negative) {
                    self.skip(txn, date, index, SkipReason::WouldGoNegative);
                    return;
                }
                self.state.assets[index] = next;
                let change = self.state.assets[index].value() - before;
                if change < 0.0 {
                    if let Some(label) = asset.liability.as_deref() {
                        self.tax.contribute(label, -change);
                    }
                }
                self.emit_delta(&vocabulary.revalue_marker, index, date, change);
                self.emit_asset(index, date);
            }
            Target::Income(index) => {
                let state = &mut self.state.incomes[*index];
                state.value = rescale(state.value);
            }
            Target::Expense(index) => {
                let state = &mut self.state.expenses[*index];
                state.value = rescale(state.value);
            }
            Target::Setting(name) => {
                let value = rescale(self.state.setting(name));
                self.state.settings.insert(name.clone(), value);
                if date < self.roi.end {
                    self.output
                        .evaluations
                        .push(Evaluation::new(name, date, value));
                }
            }
        }
    }

    /// Applies the legs of one occurrence, or records it as skipped.
    fn commit(&mut self, txn: &PreparedTransaction, date: NaiveDate, legs: &[Leg]) -> bool {
        let source_before = txn.from.map(|from| self.state.assets[from].value());
        if let Err(index) = self.state.apply_legs(self.prepared, legs) {
            self.skip(txn, date, index, SkipReason::WouldGoNegative);
            return false;
        }
        if let (Some(from), Some(value_before)) = (txn.from, source_before) {
            let taken: f64 = legs
                .iter()
                .filter(|leg| leg.asset == from && leg.money < 0.0)
                .map(|leg| -leg.money)
                .sum();
            self.crystallize(from, taken, value_before);
        }
        for leg in legs {
            self.emit_delta(&txn.name, leg.asset, date, leg.money);
        }
        for leg in legs {
            self.emit_asset(leg.asset, date);
        }
        true
    }

    /// Records the taxable part of `amount` taken out of a liability-bearing
    /// asset and reduces its remaining purchase price pro rata.
    fn crystallize(&mut self, index: usize, amount: f64, value_before: f64) {
        let Some(label) = self.prepared.assets[index].liability.as_deref() else {
            return;
        };
        if amount <= 0.0 {
            return;
        }
        let state = &mut self.state.assets[index];
        let taxable = match state.purchase_price {
            Some(basis) if value_before > 0.0 => {
                let portion = (basis * amount / value_before).min(basis);
                state.purchase_price = Some(basis - portion);
                (amount - portion).max(0.0)
            }
            _ => amount,
        };
        self.tax.contribute(label, taxable);
    }

    fn assess_tax(&mut self, date: NaiveDate) {
        for assessment in self.tax.assess(self.schedule) {
            debug!(
                "tax year ending {} for `{}`: gross {:.2}, tax {:.2}",
                date, assessment.label, assessment.gross, assessment.tax
            );
            if assessment.tax > 0.0 {
                let due = self.vocabulary.tax_due_name(&assessment.label);
                self.emit_money(&due, date, assessment.tax);
                if let Some(cash) = self.prepared.cash {
                    self.state.assets[cash].price -= assessment.tax;
                    self.emit_delta(&due, cash, date, -assessment.tax);
                    self.emit_asset(cash, date);
                }
            }
            let net = self.vocabulary.net_income_name(&assessment.label);
            self.emit_money(&net, date, assessment.net_income());
        }
    }

    fn skip(&mut self, txn: &PreparedTransaction, date: NaiveDate, asset: usize, reason: SkipReason) {
        let item = self.prepared.assets[asset].name.clone();
        debug!("skipping `{}` on {}: {:?} for `{}`", txn.name, date, reason, item);
        self.output.skipped.push(SkippedTransaction {
            name: txn.name.clone(),
            date,
            item,
            reason,
        });
    }

    fn emit_asset(&mut self, index: usize, date: NaiveDate) {
        if date >= self.roi.end {
            return;
        }
        let state = &self.state.assets[index];
        let mut evaluation = Evaluation::new(
            &self.prepared.assets[index].name,
            date,
            round_money(state.value()),
        );
        evaluation.quantity = state.units;
        self.output.evaluations.push(evaluation);
    }

    fn emit_money(&mut self, name: &str, date: NaiveDate, value: f64) {
        if date < self.roi.end {
            self.output
                .evaluations
                .push(Evaluation::new(name, date, round_money(value)));
        }
    }

    fn emit_delta(&mut self, cause: &str, index: usize, date: NaiveDate, change: f64) {
        if date >= self.roi.end || change == 0.0 {
            return;
        }
        let name = self
            .vocabulary
            .compose(cause, &self.prepared.assets[index].name);
        self.output
            .deltas
            .push(Evaluation::new(name, date, round_money(change)));
    }

    fn flow(&self, kind: FlowKind, index: usize) -> &'a PreparedFlow {
        let prepared: &'a PreparedModel = self.prepared;
        match kind {
            FlowKind::Income => &prepared.incomes[index],
            FlowKind::Expense => &prepared.expenses[index],
        }
    }

    fn flow_state(&mut self, kind: FlowKind, index: usize) -> &mut FlowState {
        match kind {
            FlowKind::Income => &mut self.state.incomes[index],
            FlowKind::Expense => &mut self.state.expenses[index],
        }
    }

    fn take_snapshots(&mut self) {
        let focus = self.focus;
        for (asset, state) in self.prepared.assets.iter().zip(&self.state.assets) {
            if asset.start > focus {
                continue;
            }
            let snapshot = ItemSnapshot {
                value: state.value(),
                quantity: state.units,
                category: asset.category.clone(),
                frequency: None,
                has_started: state.started,
                has_ended: false,
            };
            let target = if asset.is_debt {
                &mut self.output.todays_debt_values
            } else {
                &mut self.output.todays_asset_values
            };
            target.insert(asset.name.clone(), snapshot);
        }

        let flows = [
            (
                &self.prepared.incomes,
                &self.state.incomes,
                &mut self.output.todays_income_values,
            ),
            (
                &self.prepared.expenses,
                &self.state.expenses,
                &mut self.output.todays_expense_values,
            ),
        ];
        for (prepared, states, target) in flows {
            for (flow, state) in prepared.iter().zip(states) {
                if flow.start > focus {
                    continue;
                }
                target.insert(
                    flow.name.clone(),
                    ItemSnapshot {
                        value: state.value,
                        quantity: None,
                        category: flow.category.clone(),
                        frequency: flow.recurrence.map(|spec| spec.label()),
                        has_started: state.started,
                        has_ended: flow.end.map_or(false, |end| end <= focus),
                    },
                );
            }
        }

        for (name, value) in &self.state.settings {
            self.output.todays_setting_values.insert(
                name.clone(),
                ItemSnapshot {
                    value: *value,
                    quantity: None,
                    category: String::new(),
                    frequency: None,
                    has_started: true,
                    has_ended: false,
                },
            );
        }
    }

    fn finish(mut self) -> EvaluationResult {
        let prepared = self.prepared;
        let cash = prepared
            .cash
            .map(|index| prepared.assets[index].name.as_str());
        self.output
            .evaluations
            .sort_by_key(|evaluation| (evaluation.date, Some(evaluation.name.as_str()) != cash));
        self.output.deltas.sort_by_key(|delta| delta.date);
        debug!(
            "evaluation produced {} evaluations, {} deltas, {} skipped",
            self.output.evaluations.len(),
            self.output.deltas.len(),
            self.output.skipped.len()
        );
        self.output
    }
}

use chrono::NaiveDate;

use crate::{
    config::TaxYearEnd,
    recurrence::{shift_month, MAX_OCCURRENCES},
};

use super::prepare::PreparedModel;

/// Processing order of events sharing a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Phase {
    Start,
    Growth,
    Payment,
    Transfer,
    Revaluation,
    TaxAssessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlowKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventKind {
    AssetStart(usize),
    FlowStart(FlowKind, usize),
    AssetGrowth(usize),
    FlowGrowth(FlowKind, usize),
    Payment(FlowKind, usize),
    Transaction(usize),
    TaxAssessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Event {
    pub date: NaiveDate,
    pub phase: Phase,
    pub order: usize,
    pub kind: EventKind,
}

/// Monthly anniversaries of `from`, strictly after it and before `until`.
fn monthly_ticks(from: NaiveDate, until: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (1..=MAX_OCCURRENCES as i32)
        .map_while(move |months| shift_month(from, months))
        .take_while(move |date| *date < until)
}

/// Every event up to the horizon, sorted by date, phase and declaration order.
pub(crate) fn build_calendar(prepared: &PreparedModel, tax_year_end: &TaxYearEnd) -> Vec<Event> {
    let horizon = prepared.horizon;
    let income_base = prepared.assets.len();
    let expense_base = income_base + prepared.incomes.len();
    let mut events = Vec::new();

    for (index, asset) in prepared.assets.iter().enumerate() {
        if asset.start >= horizon {
            continue;
        }
        events.push(Event {
            date: asset.start,
            phase: Phase::Start,
            order: index,
            kind: EventKind::AssetStart(index),
        });
        events.extend(monthly_ticks(asset.start, horizon).map(|date| Event {
            date,
            phase: Phase::Growth,
            order: index,
            kind: EventKind::AssetGrowth(index),
        }));
    }

    let flows = prepared
        .incomes
        .iter()
        .enumerate()
        .map(|(index, flow)| (FlowKind::Income, index, income_base + index, flow))
        .chain(
            prepared
                .expenses
                .iter()
                .enumerate()
                .map(|(index, flow)| (FlowKind::Expense, index, expense_base + index, flow)),
        );
    for (kind, index, order, flow) in flows {
        if flow.occurrences.is_empty() {
            continue;
        }
        let until = flow.end.map_or(horizon, |end| end.min(horizon));
        events.push(Event {
            date: flow.valuation,
            phase: Phase::Start,
            order,
            kind: EventKind::FlowStart(kind, index),
        });
        events.extend(monthly_ticks(flow.valuation, until).map(|date| Event {
            date,
            phase: Phase::Growth,
            order,
            kind: EventKind::FlowGrowth(kind, index),
        }));
        events.extend(flow.occurrences.iter().map(|date| Event {
            date: *date,
            phase: Phase::Payment,
            order,
            kind: EventKind::Payment(kind, index),
        }));
    }

    for (index, txn) in prepared.transactions.iter().enumerate() {
        let phase = if txn.kind.is_revaluation() {
            Phase::Revaluation
        } else {
            Phase::Transfer
        };
        events.extend(txn.occurrences.iter().map(|date| Event {
            date: *date,
            phase,
            order: index,
            kind: EventKind::Transaction(index),
        }));
    }

    if prepared.has_liabilities() {
        if let Some(first) = prepared.first_date() {
            let mut next = tax_year_end.next_on_or_after(first);
            while let Some(date) = next.filter(|date| *date < horizon) {
                events.push(Event {
                    date,
                    phase: Phase::TaxAssessment,
                    order: 0,
                    kind: EventKind::TaxAssessment,
                });
                next = tax_year_end.next_on_or_after(date.succ_opt().unwrap_or(date));
                if next == Some(date) {
                    break;
                }
            }
        }
    }

    events.sort_by_key(|event| (event.date, event.phase, event.order));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Vocabulary,
        engine::{prepare::PreparedModel, Roi},
        model::{Asset, Expense, Income, Model, Transaction, TransactionKind},
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar(model: &Model, end: NaiveDate) -> Vec<Event> {
        let roi = Roi::new(date(2017, 12, 1), end).unwrap();
        let prepared =
            PreparedModel::prepare(model, roi, date(2018, 1, 1), &Vocabulary::default()).unwrap();
        build_calendar(&prepared, &TaxYearEnd::default())
    }

    #[test]
    fn same_day_events_follow_phase_order() {
        let model = Model::new()
            .with_asset(Asset::new("Cash", "1 Jan 2018", "0"))
            .with_expense(Expense::new("Rent", "1 Jan 2018", "10").with_recurrence("1m"))
            .with_transaction(
                Transaction::new("Bump", "1 Feb 2018", TransactionKind::RevalueAsset)
                    .to_item("Cash", "5"),
            )
            .with_transaction(
                Transaction::new("Save", "1 Feb 2018", TransactionKind::Custom).to_item("Cash", "1"),
            );
        let events = calendar(&model, date(2018, 2, 15));
        let feb: Vec<Phase> = events
            .iter()
            .filter(|event| event.date == date(2018, 2, 1))
            .map(|event| event.phase)
            .collect();
        assert_eq!(
            feb,
            vec![
                Phase::Growth,
                Phase::Growth,
                Phase::Payment,
                Phase::Transfer,
                Phase::Revaluation
            ]
        );
        assert_eq!(events[0].kind, EventKind::AssetStart(0));
    }

    #[test]
    fn flow_ticks_start_at_valuation_and_stop_at_end() {
        let model = Model::new().with_income(
            Income::new("Salary", "1 Mar 2018", "100")
                .with_value_set("1 Jan 2018")
                .with_end("1 Apr 2018"),
        );
        let events = calendar(&model, date(2018, 6, 1));
        let ticks: Vec<NaiveDate> = events
            .iter()
            .filter(|event| event.phase == Phase::Growth)
            .map(|event| event.date)
            .collect();
        assert_eq!(ticks, vec![date(2018, 2, 1), date(2018, 3, 1)]);
        assert_eq!(events[0].date, date(2018, 1, 1));
    }

    #[test]
    fn tax_year_ends_are_scheduled_for_liabilities() {
        let model = Model::new()
            .with_income(Income::new("Salary", "1 Jan 2018", "100").with_liability("Joe"));
        let events = calendar(&model, date(2019, 6, 1));
        let assessments: Vec<NaiveDate> = events
            .iter()
            .filter(|event| event.kind == EventKind::TaxAssessment)
            .map(|event| event.date)
            .collect();
        assert_eq!(assessments, vec![date(2018, 4, 5), date(2019, 4, 5)]);
    }
}

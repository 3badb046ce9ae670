use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    category::get_category,
    config::{EngineConfig, Vocabulary},
    engine::{Evaluation, EvaluationResult, Roi},
    model::{BelongsToCategory, Model},
    recurrence::{shift_month, MAX_OCCURRENCES},
};

use super::view_settings::{ChartKind, ChartType, Detail, Frequency, ViewSettings};

const MONEY_DECIMALS: u32 = 2;
const TOTAL_SERIES: &str = "Total";
const LABEL_FORMAT: &str = "%a %b %d %Y";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDataPoint {
    pub label: String,
    pub y: f64,
    pub decimals: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemChartData {
    pub item: String,
    pub chart_data_points: Vec<ChartDataPoint>,
}

impl ItemChartData {
    pub fn values(&self) -> Vec<f64> {
        self.chart_data_points.iter().map(|point| point.y).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub asset_data: Vec<ItemChartData>,
    pub debt_data: Vec<ItemChartData>,
    pub income_data: Vec<ItemChartData>,
    pub expense_data: Vec<ItemChartData>,
    pub tax_data: Vec<ItemChartData>,
}

/// Bucket start dates from the range start, a month or a year apart.
struct Buckets {
    starts: Vec<NaiveDate>,
    end: NaiveDate,
}

impl Buckets {
    fn new(roi: Roi, frequency: Frequency) -> Self {
        let step = match frequency {
            Frequency::Monthly => 1,
            Frequency::Annually => 12,
        };
        let starts = (0..MAX_OCCURRENCES as i32)
            .map_while(|index| shift_month(roi.start, index * step))
            .take_while(|date| *date < roi.end)
            .collect();
        Self {
            starts,
            end: roi.end,
        }
    }

    fn len(&self) -> usize {
        self.starts.len()
    }

    fn index_of(&self, date: NaiveDate) -> Option<usize> {
        if date >= self.end {
            return None;
        }
        self.starts
            .partition_point(|start| *start <= date)
            .checked_sub(1)
    }

    fn labels(&self) -> Vec<String> {
        self.starts
            .iter()
            .map(|date| date.format(LABEL_FORMAT).to_string())
            .collect()
    }
}

/// Named series in first-seen order.
struct SeriesSet {
    names: Vec<String>,
    values: Vec<Vec<f64>>,
    width: usize,
}

impl SeriesSet {
    fn new(width: usize) -> Self {
        Self {
            names: Vec::new(),
            values: Vec::new(),
            width,
        }
    }

    fn add(&mut self, name: String, bucket: usize, amount: f64) {
        let position = match self.names.iter().position(|existing| *existing == name) {
            Some(position) => position,
            None => {
                self.names.push(name);
                self.values.push(vec![0.0; self.width]);
                self.names.len() - 1
            }
        };
        self.values[position][bucket] += amount;
    }

    fn into_chart(self, labels: &[String]) -> Vec<ItemChartData> {
        self.names
            .into_iter()
            .zip(self.values)
            .filter(|(_, values)| values.iter().any(|value| *value != 0.0))
            .map(|(item, values)| ItemChartData {
                item,
                chart_data_points: labels
                    .iter()
                    .zip(values)
                    .map(|(label, y)| ChartDataPoint {
                        label: label.clone(),
                        y: (y * 100.0).round() / 100.0,
                        decimals: MONEY_DECIMALS,
                    })
                    .collect(),
            })
            .collect()
    }
}

struct Aggregator<'a> {
    model: &'a Model,
    view: &'a ViewSettings,
    vocabulary: &'a Vocabulary,
    buckets: Buckets,
    labels: Vec<String>,
    categories: HashMap<&'a str, &'a str>,
    cache: HashMap<String, String>,
}

impl Aggregator<'_> {
    fn series_name(&mut self, name: &str) -> String {
        match self.view.detail() {
            Detail::Detailed => name.to_string(),
            Detail::Categorised => get_category(name, &mut self.cache, self.model, self.vocabulary),
            Detail::Total => TOTAL_SERIES.to_string(),
        }
    }

    fn in_focus(&self, kind: ChartKind, item: &str) -> bool {
        let focus = self.view.focus(kind);
        self.view.is_focused_on_all(kind)
            || focus == item
            || self.categories.get(item).map_or(false, |category| *category == focus)
    }

    /// Value of each item at each bucket start.
    fn stocks(
        &mut self,
        kind: ChartKind,
        items: &[&str],
        history: &HashMap<&str, Vec<&Evaluation>>,
    ) -> Vec<ItemChartData> {
        let focused: Vec<&str> = items
            .iter()
            .copied()
            .filter(|item| self.in_focus(kind, item))
            .collect();
        let mut series = SeriesSet::new(self.buckets.len());
        for item in focused {
            let Some(evaluations) = history.get(item) else {
                continue;
            };
            let name = self.series_name(item);
            for (bucket, start) in self.buckets.starts.iter().enumerate() {
                let seen = evaluations.partition_point(|evaluation| evaluation.date <= *start);
                if let Some(evaluation) = seen.checked_sub(1).map(|index| evaluations[index]) {
                    let value = match kind {
                        ChartKind::Debt => evaluation.value.abs(),
                        _ => evaluation.value,
                    };
                    series.add(name.clone(), bucket, value);
                }
            }
        }
        series.into_chart(&self.labels)
    }

    fn stock_chart(
        &mut self,
        kind: ChartKind,
        items: &[&str],
        history: &HashMap<&str, Vec<&Evaluation>>,
        deltas: &[Evaluation],
    ) -> Vec<ItemChartData> {
        match self.view.chart_type(kind) {
            ChartType::Value => self.stocks(kind, items, history),
            chart_type => self.changes(kind, items, chart_type, deltas),
        }
    }

    /// Changes to the chart's items, summed within each bucket.
    fn changes(
        &mut self,
        kind: ChartKind,
        items: &[&str],
        chart_type: ChartType,
        deltas: &[Evaluation],
    ) -> Vec<ItemChartData> {
        let mut series = SeriesSet::new(self.buckets.len());
        for delta in deltas {
            if !chart_type.keeps(delta.value) {
                continue;
            }
            let target = items
                .iter()
                .filter(|item| {
                    delta
                        .name
                        .strip_suffix(*item)
                        .map_or(false, |cause| cause.ends_with(&self.vocabulary.separator))
                })
                .max_by_key(|item| item.len());
            let Some(target) = target else {
                continue;
            };
            if !self.in_focus(kind, target) {
                continue;
            }
            if let Some(bucket) = self.buckets.index_of(delta.date) {
                let name = self.series_name(&delta.name);
                series.add(name, bucket, delta.value);
            }
        }
        series.into_chart(&self.labels)
    }

    /// Evaluations of the chart's items, summed within each bucket.
    fn flows<F>(&mut self, kind: ChartKind, evaluations: &[Evaluation], focus_key: F) -> Vec<ItemChartData>
    where
        F: Fn(&str) -> Option<&str>,
    {
        let mut series = SeriesSet::new(self.buckets.len());
        for evaluation in evaluations {
            let Some(key) = focus_key(&evaluation.name) else {
                continue;
            };
            if !self.in_focus(kind, key) {
                continue;
            }
            if let Some(bucket) = self.buckets.index_of(evaluation.date) {
                let name = self.series_name(&evaluation.name);
                series.add(name, bucket, evaluation.value);
            }
        }
        series.into_chart(&self.labels)
    }
}

/// Buckets an evaluation result into chart series for each item kind.
pub fn make_chart_data_from_evaluations(
    model: &Model,
    view: &ViewSettings,
    result: &EvaluationResult,
    config: &EngineConfig,
) -> ChartData {
    let Some(roi) = result.roi else {
        return ChartData::default();
    };
    let vocabulary = &config.vocabulary;
    let buckets = Buckets::new(roi, view.frequency());
    let labels = buckets.labels();

    let categories = model
        .assets
        .iter()
        .filter_map(|asset| asset.category().map(|category| (asset.name.as_str(), category)))
        .chain(model.incomes.iter().chain(&model.expenses).filter_map(|flow| {
            flow.category().map(|category| (flow.name.as_str(), category))
        }))
        .collect();
    let mut aggregator = Aggregator {
        model,
        view,
        vocabulary,
        buckets,
        labels: labels.clone(),
        categories,
        cache: HashMap::new(),
    };

    let mut history: HashMap<&str, Vec<&Evaluation>> = HashMap::new();
    for evaluation in &result.evaluations {
        history
            .entry(evaluation.name.as_str())
            .or_default()
            .push(evaluation);
    }

    let assets: Vec<&str> = model
        .assets
        .iter()
        .filter(|asset| !asset.is_a_debt)
        .map(|asset| asset.name.as_str())
        .collect();
    let debts: Vec<&str> = model
        .assets
        .iter()
        .filter(|asset| asset.is_a_debt)
        .map(|asset| asset.name.as_str())
        .collect();

    let asset_data = aggregator.stock_chart(ChartKind::Asset, &assets, &history, &result.deltas);
    let debt_data = aggregator.stock_chart(ChartKind::Debt, &debts, &history, &result.deltas);

    let incomes: HashSet<&str> = model.incomes.iter().map(|flow| flow.name.as_str()).collect();
    let expenses: HashSet<&str> = model.expenses.iter().map(|flow| flow.name.as_str()).collect();
    let income_data = aggregator.flows(ChartKind::Income, &result.evaluations, |name| {
        incomes.contains(name).then_some(name)
    });
    let expense_data = aggregator.flows(ChartKind::Expense, &result.evaluations, |name| {
        expenses.contains(name).then_some(name)
    });

    let tax_suffix = format!(" {}", vocabulary.income_tax);
    let net_suffix = format!(" {}", vocabulary.net_income);
    let show_net = view.tax_net_income();
    let tax_data = aggregator.flows(ChartKind::Tax, &result.evaluations, |name| {
        name.strip_suffix(tax_suffix.as_str()).or_else(|| {
            if show_net {
                name.strip_suffix(net_suffix.as_str())
            } else {
                None
            }
        })
    });

    ChartData {
        labels,
        asset_data,
        debt_data,
        income_data,
        expense_data,
        tax_data,
    }
}

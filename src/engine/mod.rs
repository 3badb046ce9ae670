//! The evaluation engine: steps a prepared model through time and records
//! every value change as an [`Evaluation`].

mod prepare;
mod schedule;
mod simulation;
mod state;
pub mod tax;

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    config::{EngineConfig, Vocabulary},
    errors::{ModelError, SkippedTransaction},
    model::Model,
    resolve::DateResolver,
};

use prepare::PreparedModel;
use simulation::Simulation;
use tax::TaxSchedule;

/// Range of interest: evaluations are reported for dates in `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Roi {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Roi {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Reads the range from the model's view-range settings.
    pub fn from_model(model: &Model, vocabulary: &Vocabulary) -> Result<Self, ModelError> {
        let mut dates = DateResolver::new(&model.triggers)?;
        let start = roi_setting(model, &vocabulary.roi_start, &mut dates)?;
        let end = roi_setting(model, &vocabulary.roi_end, &mut dates)?;
        Roi::new(start, end)
            .ok_or_else(|| ModelError::MissingRoi(format!("{} is not after {}", end, start)))
    }
}

fn roi_setting(
    model: &Model,
    key: &str,
    dates: &mut DateResolver<'_>,
) -> Result<NaiveDate, ModelError> {
    let setting = model
        .setting(key)
        .ok_or_else(|| ModelError::MissingRoi(format!("no `{}` setting", key)))?;
    dates.resolve(&setting.value, key)
}

/// One value of one named item on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub name: String,
    pub date: NaiveDate,
    pub value: f64,
    /// Unit count of quantity-bearing assets.
    pub quantity: Option<f64>,
}

impl Evaluation {
    pub fn new(name: impl Into<String>, date: NaiveDate, value: f64) -> Self {
        Self {
            name: name.into(),
            date,
            value,
            quantity: None,
        }
    }
}

/// An item's value as of the focus date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSnapshot {
    pub value: f64,
    pub quantity: Option<f64>,
    pub category: String,
    pub frequency: Option<String>,
    pub has_started: bool,
    pub has_ended: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationResult {
    pub roi: Option<Roi>,
    pub evaluations: Vec<Evaluation>,
    pub deltas: Vec<Evaluation>,
    pub todays_asset_values: BTreeMap<String, ItemSnapshot>,
    pub todays_debt_values: BTreeMap<String, ItemSnapshot>,
    pub todays_income_values: BTreeMap<String, ItemSnapshot>,
    pub todays_expense_values: BTreeMap<String, ItemSnapshot>,
    pub todays_setting_values: BTreeMap<String, ItemSnapshot>,
    pub skipped: Vec<SkippedTransaction>,
    /// Set when the model could not be evaluated at all.
    pub report_error: Option<String>,
}

impl EvaluationResult {
    fn failed(error: &ModelError) -> Self {
        Self {
            report_error: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn is_failure(&self) -> bool {
        self.report_error.is_some()
    }

    pub fn evaluations_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Evaluation> {
        self.evaluations
            .iter()
            .filter(move |evaluation| evaluation.name == name)
    }
}

/// Evaluates `model` over `roi`, taking snapshots just after `focus`.
///
/// A structurally invalid model produces an empty result with
/// `report_error` set; the problem is also logged at `warn`.
pub fn evaluate(
    model: &Model,
    roi: Roi,
    focus: NaiveDate,
    config: &EngineConfig,
) -> EvaluationResult {
    evaluate_with_schedule(model, roi, focus, config, &config.tax_schedule)
}

/// Like [`evaluate`] with a caller-supplied tax schedule.
pub fn evaluate_with_schedule(
    model: &Model,
    roi: Roi,
    focus: NaiveDate,
    config: &EngineConfig,
    schedule: &dyn TaxSchedule,
) -> EvaluationResult {
    match PreparedModel::prepare(model, roi, focus, &config.vocabulary) {
        Ok(prepared) => Simulation::new(&prepared, &config.vocabulary, schedule, roi, focus)
            .run(&config.tax_year_end),
        Err(err) => {
            warn!("model could not be evaluated: {}", err);
            EvaluationResult::failed(&err)
        }
    }
}

/// Evaluates `model` over the range named by its view-range settings.
/// `focus` defaults to today.
pub fn get_evaluations(
    model: &Model,
    focus: Option<NaiveDate>,
    config: &EngineConfig,
) -> EvaluationResult {
    let focus = focus.unwrap_or_else(|| Local::now().date_naive());
    match Roi::from_model(model, &config.vocabulary) {
        Ok(roi) => evaluate(model, roi, focus, config),
        Err(err) => {
            warn!("model could not be evaluated: {}", err);
            EvaluationResult::failed(&err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Setting};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn roi_must_be_non_empty() {
        assert!(Roi::new(date(2018, 1, 1), date(2018, 1, 1)).is_none());
        let roi = Roi::new(date(2018, 1, 1), date(2018, 2, 1)).unwrap();
        assert!(roi.contains(date(2018, 1, 31)));
        assert!(!roi.contains(date(2018, 2, 1)));
    }

    #[test]
    fn missing_roi_is_reported() {
        let model = Model::new().with_asset(Asset::new("savings", "1 Jan 2018", "500"));
        let result = get_evaluations(&model, Some(date(2018, 1, 1)), &EngineConfig::default());
        assert!(result.evaluations.is_empty());
        assert!(result.is_failure());
    }

    #[test]
    fn reads_roi_from_settings() {
        let vocabulary = Vocabulary::default();
        let model = Model::new()
            .with_setting(Setting::new(&vocabulary.roi_start, "1 Dec 2017"))
            .with_setting(Setting::new(&vocabulary.roi_end, "1 Apr 2018"));
        let roi = Roi::from_model(&model, &vocabulary).unwrap();
        assert_eq!(roi.start, date(2017, 12, 1));
        assert_eq!(roi.end, date(2018, 4, 1));
    }

    #[test]
    fn savings_grow_monthly() {
        let model = Model::new().with_asset(Asset::new("savings", "1 Jan 2018", "500").with_growth("12"));
        let roi = Roi::new(date(2017, 12, 1), date(2018, 4, 1)).unwrap();
        let result = evaluate(&model, roi, date(2018, 1, 1), &EngineConfig::default());
        let values: Vec<(NaiveDate, f64)> = result
            .evaluations_for("savings")
            .map(|evaluation| (evaluation.date, evaluation.value))
            .collect();
        assert_eq!(
            values,
            vec![
                (date(2018, 1, 1), 500.0),
                (date(2018, 2, 1), 504.74),
                (date(2018, 3, 1), 509.53)
            ]
        );
    }
}

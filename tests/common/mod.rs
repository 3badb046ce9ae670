#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use projection_core::{
    model::{Asset, Setting},
    EngineConfig, EvaluationResult, Model, Roi, Vocabulary,
};
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

static CONFIG: Lazy<EngineConfig> = Lazy::new(EngineConfig::default);

pub fn config() -> &'static EngineConfig {
    &CONFIG
}

pub fn vocabulary() -> &'static Vocabulary {
    &CONFIG.vocabulary
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn roi(start: NaiveDate, end: NaiveDate) -> Roi {
    Roi::new(start, end).expect("non-empty range")
}

/// A fresh directory that outlives the calling test.
pub fn temp_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

pub fn with_view_range(mut model: Model, start: &str, end: &str) -> Model {
    let vocabulary = vocabulary();
    model.set_setting(Setting::new(&vocabulary.roi_start, start));
    model.set_setting(Setting::new(&vocabulary.roi_end, end));
    model
}

pub fn cash(value: &str) -> Asset {
    Asset::new(&vocabulary().cash, "1 Jan 2018", value)
}

/// `(date, value)` pairs of one item's evaluations, in output order.
pub fn values(result: &EvaluationResult, name: &str) -> Vec<(NaiveDate, f64)> {
    result
        .evaluations_for(name)
        .map(|evaluation| (evaluation.date, evaluation.value))
        .collect()
}

pub fn last_value(result: &EvaluationResult, name: &str) -> Option<f64> {
    result
        .evaluations_for(name)
        .last()
        .map(|evaluation| evaluation.value)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

#![doc(test(attr(deny(warnings))))]

//! Projection Core simulates a declarative personal-finance model forward in
//! time: it resolves symbolic dates and value expressions, expands
//! recurrences, steps through monthly growth, transactions and tax, and turns
//! the resulting evaluation stream into chart series.

pub mod category;
pub mod chart;
pub mod config;
pub mod engine;
pub mod errors;
pub mod model;
pub mod recurrence;
pub mod resolve;
pub mod storage;
pub mod utils;

pub use category::get_category;
pub use chart::{make_chart_data_from_evaluations, ChartData, ViewSettings};
pub use config::{EngineConfig, Vocabulary};
pub use engine::{evaluate, get_evaluations, Evaluation, EvaluationResult, Roi};
pub use errors::{ModelError, SkippedTransaction};
pub use model::Model;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Projection Core tracing initialized.");
    });
}

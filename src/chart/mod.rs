//! Buckets an evaluation stream into per-kind chart series.

pub mod aggregator;
pub mod view_settings;

pub use aggregator::{make_chart_data_from_evaluations, ChartData, ChartDataPoint, ItemChartData};
pub use view_settings::{ChartKind, ChartType, Detail, Frequency, ViewSettings};

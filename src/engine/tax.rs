use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Maps a tax year's gross contributions for one liability label to the tax due.
pub trait TaxSchedule {
    fn tax_due(&self, gross: f64) -> f64;
}

impl<F> TaxSchedule for F
where
    F: Fn(f64) -> f64,
{
    fn tax_due(&self, gross: f64) -> f64 {
        self(gross)
    }
}

/// One slice of a progressive schedule. `upper` is measured in taxable
/// income above the allowance; `None` means unbounded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TaxBand {
    pub upper: Option<f64>,
    pub rate: f64,
}

/// Allowance followed by ordered bands. The default schedule charges nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BandedSchedule {
    pub allowance: f64,
    pub bands: Vec<TaxBand>,
}

impl TaxSchedule for BandedSchedule {
    fn tax_due(&self, gross: f64) -> f64 {
        let taxable = (gross - self.allowance.max(0.0)).max(0.0);
        let mut lower = 0.0;
        let mut tax = 0.0;
        for band in &self.bands {
            let upper = band.upper.unwrap_or(f64::INFINITY).max(lower);
            let slice = (taxable.min(upper) - lower).max(0.0);
            tax += slice * band.rate.clamp(0.0, 1.0);
            if taxable <= upper {
                break;
            }
            lower = upper;
        }
        tax
    }
}

/// Result of assessing one liability label at a tax-year end.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub label: String,
    pub gross: f64,
    pub tax: f64,
}

impl Assessment {
    pub fn net_income(&self) -> f64 {
        self.gross - self.tax
    }
}

/// Per-label pools of taxable contributions for the current tax year.
#[derive(Debug, Default)]
pub struct TaxAssessor {
    pools: BTreeMap<String, f64>,
}

impl TaxAssessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contribute(&mut self, label: &str, amount: f64) {
        let label = label.trim();
        if label.is_empty() || amount <= 0.0 {
            return;
        }
        *self.pools.entry(label.to_string()).or_insert(0.0) += amount;
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Assesses every label with contributions, in label order, and starts
    /// a new tax year.
    pub fn assess(&mut self, schedule: &dyn TaxSchedule) -> Vec<Assessment> {
        std::mem::take(&mut self.pools)
            .into_iter()
            .map(|(label, gross)| {
                let tax = schedule.tax_due(gross).max(0.0);
                Assessment { label, gross, tax }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> BandedSchedule {
        BandedSchedule {
            allowance: 12_500.0,
            bands: vec![
                TaxBand {
                    upper: Some(37_500.0),
                    rate: 0.2,
                },
                TaxBand {
                    upper: None,
                    rate: 0.4,
                },
            ],
        }
    }

    #[test]
    fn default_schedule_charges_nothing() {
        assert_eq!(BandedSchedule::default().tax_due(1_000_000.0), 0.0);
    }

    #[test]
    fn bands_apply_progressively() {
        let schedule = schedule();
        assert_eq!(schedule.tax_due(10_000.0), 0.0);
        assert!((schedule.tax_due(22_500.0) - 2_000.0).abs() < 1e-9);
        assert!((schedule.tax_due(60_000.0) - (7_500.0 + 4_000.0)).abs() < 1e-9);
    }

    #[test]
    fn closures_are_schedules() {
        let flat = |gross: f64| gross * 0.1;
        let mut assessor = TaxAssessor::new();
        assessor.contribute("Joe", 1_000.0);
        assessor.contribute("Jane", 500.0);
        assessor.contribute("Joe", 1_000.0);
        assessor.contribute("", 50.0);

        let assessments = assessor.assess(&flat);
        assert_eq!(assessments.len(), 2);
        assert_eq!(assessments[0].label, "Jane");
        assert!((assessments[1].gross - 2_000.0).abs() < f64::EPSILON);
        assert!((assessments[1].net_income() - 1_800.0).abs() < 1e-9);
        assert!(assessor.is_empty());
    }
}

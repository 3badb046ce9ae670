use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::tax::BandedSchedule;

const DEFAULT_DIR_NAME: &str = ".projection_core";
const CONFIG_FILE: &str = "config.json";
const TMP_SUFFIX: &str = "tmp";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("no home directory available for the default configuration path")]
    NoHomeDir,
}

/// Names the engine treats as opaque constants. They come from the
/// presentation layer's vocabulary and are never interpreted beyond equality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Vocabulary {
    pub separator: String,
    pub cpi: String,
    pub cash: String,
    pub roi_start: String,
    pub roi_end: String,
    pub growth_marker: String,
    pub revalue_marker: String,
    pub income_tax: String,
    pub net_income: String,
    pub all_items: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            separator: "/".into(),
            cpi: "cpi".into(),
            cash: "Cash".into(),
            roi_start: "Beginning of view range".into(),
            roi_end: "End of view range".into(),
            growth_marker: "growth".into(),
            revalue_marker: "revalue".into(),
            income_tax: "income tax".into(),
            net_income: "net income".into(),
            all_items: "All".into(),
        }
    }
}

impl Vocabulary {
    /// Joins two words with the composite-name separator.
    pub fn compose(&self, first: &str, second: &str) -> String {
        format!("{}{}{}", first, self.separator, second)
    }

    pub fn tax_due_name(&self, label: &str) -> String {
        format!("{} {}", label, self.income_tax)
    }

    pub fn net_income_name(&self, label: &str) -> String {
        format!("{} {}", label, self.net_income)
    }
}

/// Month and day on which each tax year is assessed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxYearEnd {
    pub month: u32,
    pub day: u32,
}

impl Default for TaxYearEnd {
    fn default() -> Self {
        Self { month: 4, day: 5 }
    }
}

impl TaxYearEnd {
    /// Assessment date falling in `year`, clamped to the month length.
    pub fn in_year(&self, year: i32) -> Option<NaiveDate> {
        let month = self.month.clamp(1, 12);
        (1..=self.day.clamp(1, 31))
            .rev()
            .find_map(|day| NaiveDate::from_ymd_opt(year, month, day))
    }

    /// First assessment date on or after `date`.
    pub fn next_on_or_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        let this_year = self.in_year(date.year())?;
        if this_year >= date {
            Some(this_year)
        } else {
            self.in_year(date.year() + 1)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub vocabulary: Vocabulary,
    pub tax_year_end: TaxYearEnd,
    pub tax_schedule: BandedSchedule,
}

/// Handles persistence of [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Self::with_base_dir(home.join(DEFAULT_DIR_NAME))
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&base)?;
        Ok(Self {
            path: base.join(CONFIG_FILE),
        })
    }

    pub fn load(&self) -> Result<EngineConfig, ConfigError> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(EngineConfig::default())
        }
    }

    pub fn save(&self, config: &EngineConfig) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tax::TaxBand;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config.vocabulary, Vocabulary::default());
        assert_eq!(config.tax_year_end, TaxYearEnd::default());
    }

    #[test]
    fn save_then_load_keeps_overrides() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap();
        let mut config = EngineConfig::default();
        config.vocabulary.cash = "Wallet".into();
        config.tax_schedule = BandedSchedule {
            allowance: 1000.0,
            bands: vec![TaxBand {
                upper: None,
                rate: 0.2,
            }],
        };
        manager.save(&config).unwrap();

        let loaded = manager.load().unwrap();
        assert_eq!(loaded.vocabulary.cash, "Wallet");
        assert_eq!(loaded.vocabulary.cpi, "cpi");
        assert_eq!(loaded.tax_schedule.bands.len(), 1);
        assert!(!manager.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn partial_vocabulary_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"vocabulary": {"separator": "|"}}"#).unwrap();
        assert_eq!(config.vocabulary.separator, "|");
        assert_eq!(config.vocabulary.cash, "Cash");
    }

    #[test]
    fn tax_year_end_clamps_and_rolls_forward() {
        let end = TaxYearEnd { month: 2, day: 30 };
        assert_eq!(
            end.in_year(2021),
            Some(NaiveDate::from_ymd_opt(2021, 2, 28).unwrap())
        );
        let april = TaxYearEnd::default();
        let after = NaiveDate::from_ymd_opt(2020, 4, 6).unwrap();
        assert_eq!(
            april.next_on_or_after(after),
            Some(NaiveDate::from_ymd_opt(2021, 4, 5).unwrap())
        );
        let on = NaiveDate::from_ymd_opt(2020, 4, 5).unwrap();
        assert_eq!(april.next_on_or_after(on), Some(on));
    }
}

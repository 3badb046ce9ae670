use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    errors::ModelError,
    model::{Model, CURRENT_MODEL_VERSION},
};

use super::Result;

const TMP_SUFFIX: &str = "tmp";

/// Parses an interchange document. Missing sections default to empty;
/// documents written by a newer version are rejected.
pub fn load_model_from_str(data: &str) -> Result<Model> {
    let model: Model = serde_json::from_str(data)?;
    if model.version > CURRENT_MODEL_VERSION {
        return Err(ModelError::UnsupportedVersion(model.version));
    }
    Ok(model)
}

pub fn model_to_string(model: &Model) -> Result<String> {
    Ok(serde_json::to_string_pretty(model)?)
}

pub fn load_model_from_path(path: &Path) -> Result<Model> {
    let data = fs::read_to_string(path)?;
    let model = load_model_from_str(&data)?;
    debug!(
        path = %path.display(),
        assets = model.assets.len(),
        transactions = model.transactions.len(),
        "loaded model"
    );
    Ok(model)
}

/// Writes the model beside `path` and renames it into place.
pub fn save_model_to_path(model: &Model, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = model_to_string(model)?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!("{}.{}", ext, TMP_SUFFIX))
        .unwrap_or_else(|| TMP_SUFFIX.to_string());
    tmp.set_extension(extension);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Setting, Trigger};
    use tempfile::TempDir;

    fn sample() -> Model {
        Model::new()
            .with_trigger(Trigger::new("Retire", "1 Jan 2030"))
            .with_asset(Asset::new("savings", "Retire", "500").with_growth("4"))
            .with_setting(Setting::new("cpi", "2.5"))
    }

    #[test]
    fn save_then_load_preserves_model() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("models").join("plan.json");
        let model = sample();
        save_model_to_path(&model, &path).unwrap();
        assert!(path.exists());
        assert!(!tmp_path(&path).exists());
        let loaded = load_model_from_path(&path).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let model = load_model_from_str(r#"{"assets": []}"#).unwrap();
        assert_eq!(model.version, CURRENT_MODEL_VERSION);
        assert!(model.triggers.is_empty());
        assert!(model.settings.is_empty());
    }

    #[test]
    fn newer_versions_are_rejected() {
        let err = load_model_from_str(r#"{"version": 99}"#).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedVersion(99)));
    }

    #[test]
    fn malformed_documents_report_serde_errors() {
        let err = load_model_from_str("{ not json").unwrap_err();
        assert!(matches!(err, ModelError::Serde(_)));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let temp = TempDir::new().unwrap();
        let err = load_model_from_path(&temp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ModelError::Io(_)));
    }
}

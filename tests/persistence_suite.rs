mod common;

use common::{config, date, temp_dir, values};
use projection_core::{
    config::ConfigManager,
    get_evaluations,
    model::TransactionKind,
    storage::{load_model_from_path, load_model_from_str, model_to_string, save_model_to_path},
    ModelError,
};

const DOCUMENT: &str = r#"{
    "version": 1,
    "triggers": [{ "NAME": "start", "DATE": "1 Jan 2018" }],
    "assets": [
        { "NAME": "Cash", "START": "start", "VALUE": "0" },
        { "NAME": "savings", "START": "start", "VALUE": "500", "GROWTH": "12", "CATEGORY": "Savings" }
    ],
    "expenses": [
        { "NAME": "Phon", "START": "start", "VALUE": "1", "RECURRENCE": "1m" }
    ],
    "transactions": [
        {
            "NAME": "Top up", "DATE": "start+1m", "TYPE": "custom",
            "FROM": "savings", "FROM_VALUE": "100", "FROM_ABSOLUTE": true,
            "TO": "Cash", "TO_ABSOLUTE": true
        }
    ],
    "settings": [
        { "NAME": "Beginning of view range", "VALUE": "1 Dec 2017", "TYPE": "view" },
        { "NAME": "End of view range", "VALUE": "1 Apr 2018", "TYPE": "view" }
    ]
}"#;

#[test]
fn interchange_document_evaluates() {
    let model = load_model_from_str(DOCUMENT).expect("parse document");
    assert_eq!(model.transactions[0].kind, TransactionKind::Custom);

    let result = get_evaluations(&model, Some(date(2018, 1, 1)), config());
    assert!(!result.is_failure(), "{:?}", result.report_error);
    assert_eq!(
        values(&result, "Phon"),
        vec![
            (date(2018, 1, 1), 1.0),
            (date(2018, 2, 1), 1.0),
            (date(2018, 3, 1), 1.0)
        ]
    );
    assert_eq!(
        values(&result, "Cash"),
        vec![
            (date(2018, 1, 1), 0.0),
            (date(2018, 1, 1), -1.0),
            (date(2018, 2, 1), -1.0),
            (date(2018, 2, 1), -2.0),
            (date(2018, 2, 1), 98.0),
            (date(2018, 3, 1), 98.0),
            (date(2018, 3, 1), 97.0),
        ]
    );
}

#[test]
fn saved_models_evaluate_identically() {
    let model = load_model_from_str(DOCUMENT).expect("parse document");
    let path = temp_dir().join("plans").join("retirement.json");
    save_model_to_path(&model, &path).expect("save model");
    let reloaded = load_model_from_path(&path).expect("load model");
    assert_eq!(reloaded, model);

    let before = get_evaluations(&model, Some(date(2018, 1, 1)), config());
    let after = get_evaluations(&reloaded, Some(date(2018, 1, 1)), config());
    assert_eq!(before.evaluations, after.evaluations);
    assert_eq!(before.deltas, after.deltas);
}

#[test]
fn serialized_models_use_interchange_keys() {
    let model = load_model_from_str(DOCUMENT).expect("parse document");
    let json = model_to_string(&model).expect("serialize");
    assert!(json.contains("\"FROM_VALUE\""));
    assert!(json.contains("\"TYPE\": \"custom\""));
    assert_eq!(load_model_from_str(&json).expect("reparse"), model);
}

#[test]
fn documents_from_newer_versions_are_rejected() {
    let err = load_model_from_str(r#"{ "version": 7 }"#).unwrap_err();
    assert!(matches!(err, ModelError::UnsupportedVersion(7)));
}

#[test]
fn engine_config_round_trips_through_config_manager() {
    let manager = ConfigManager::with_base_dir(temp_dir()).expect("config manager");
    let mut engine_config = manager.load().expect("defaults");
    engine_config.vocabulary.cash = "Current account".into();
    engine_config.tax_year_end.month = 12;
    engine_config.tax_year_end.day = 31;
    manager.save(&engine_config).expect("save config");

    let loaded = manager.load().expect("load config");
    assert_eq!(loaded.vocabulary.cash, "Current account");
    assert_eq!(loaded.tax_year_end.month, 12);
    assert!(manager.path().exists());
}

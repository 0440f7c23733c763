//! Integration tests for the study lifecycle
//!
//! These tests drive a complete study directory through the public API:
//! - Intake (ratings, personalization, record creation)
//! - First session (condition assignment, config generation, trial log)
//! - Later sessions (config reuse, mini-AAT, progression)
//! - Abort and completion edge cases

use std::fs;
use std::path::{Path, PathBuf};

use aat_trainer::core::config::ExperimentConfig;
use aat_trainer::core::error::AatError;
use aat_trainer::core::types::{Category, ParticipantId, Sex};
use aat_trainer::experiment::Study;
use aat_trainer::frontend::{Key, ScriptedFrontend, SimulatedFrontend};
use aat_trainer::language::Language;
use aat_trainer::participant::ratings::CUSTOM_KEY;
use aat_trainer::participant::RecordStore;
use aat_trainer::session::{ConfigStatus, SESSION_COUNT};
use aat_trainer::settings::SettingsStore;
use aat_trainer::stimuli::{StimulusCatalog, StimulusSet};
use aat_trainer::trial::log::COLUMNS;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const SETTINGS: &str = r#"{
    "Window Size": [1920, 1080],
    "Window Color": "black",
    "Font Size": 0.06,
    "Font Color": "white",
    "Joystick Backend": "pyglet",
    "Rotation Degrees": 3,
    "Condition Codes": {"1": "AB'C"},
    "Randomization": {
        "1": {"male": 0, "female": 0, "other": 0, "prefer-not-to-say": 0}
    },
    "N Scenarios": 3
}"#;

fn images(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}_{:02}.jpg", prefix, i)).collect()
}

/// Small sets: 2 set A and 4 set B images per category, 3 x 45 personalization images
fn catalog() -> StimulusCatalog {
    let mut set_a = StimulusSet::new("set_a");
    let mut set_b = StimulusSet::new("set_b");
    let mut standard = StimulusSet::new("standard");
    let mut personalization = StimulusSet::new("personalization");
    for category in Category::ALL {
        let tag = category.as_str();
        set_a = set_a.with_subcategory(category, "Mixed", images(&format!("a_{}", tag), 2));
        set_b = set_b.with_subcategory(category, "Mixed", images(&format!("b_{}", tag), 4));
        standard = standard.with_subcategory(category, "Mixed", images(&format!("s_{}", tag), 2));
        for sub in ["First", "Second", "Third"] {
            personalization = personalization.with_subcategory(
                category,
                sub,
                images(&format!("p_{}_{}", tag, sub), 45),
            );
        }
    }
    StimulusCatalog {
        set_a,
        set_b,
        standard,
        personalization,
    }
}

fn language() -> Language {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/language/en.toml");
    Language::load(&path).unwrap()
}

fn study(root: &Path) -> Study {
    let settings_path = root.join("settings.json");
    fs::write(&settings_path, SETTINGS).unwrap();
    Study::new(
        SettingsStore::new(settings_path),
        RecordStore::new(root.join("participants"), "aat"),
        root.join("output"),
        language(),
        catalog(),
        ExperimentConfig::default(),
    )
    .unwrap()
}

fn id() -> ParticipantId {
    ParticipantId::parse("424242").unwrap()
}

fn enroll(study: &Study) {
    let mut frontend = ScriptedFrontend::new(60.0).with_ratings(vec![3, 9, 9, 1]);
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    study.intake(id(), Sex::Female, false, &mut frontend, &mut rng).unwrap();
}

fn log_lines(path: &PathBuf) -> Vec<String> {
    fs::read_to_string(path).unwrap().lines().map(String::from).collect()
}

// ============================================================================
// Intake
// ============================================================================

#[test]
fn test_intake_writes_fresh_record() {
    let dir = tempfile::tempdir().unwrap();
    let study = study(dir.path());
    let mut frontend = ScriptedFrontend::new(60.0).with_ratings(vec![3, 9, 9, 1]);
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let record = study.intake(id(), Sex::Female, false, &mut frontend, &mut rng).unwrap();

    assert_eq!(record.current_session, 0);
    assert!(record.condition.is_none());
    assert_eq!(record.scenario_rating.scores.len(), language().imagine_scenario.scenarios.len());
    assert_eq!(record.scenario_rating.top_keys(2), vec!["Bar", "Home"]);

    // 5 + 3 + 1 panels of 5 picks, first three subcategories in order
    let selections = record.selections(Category::Alcoholic);
    let labels: Vec<&str> = selections.keys().map(String::as_str).collect();
    assert_eq!(labels, vec!["First Selection", "Second Selection", "Third Selection"]);
    assert_eq!(record.selected_images(Category::Alcoholic).len(), 45);
    assert_eq!(record.selected_images(Category::NonAlcoholic).len(), 45);

    // Condition fields are written as empty strings
    let path = study.records().presession_path(&id());
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(raw["Condition"], "");
    assert_eq!(raw["Condition_saved"], "");
    assert_eq!(raw["Current Session"], 0);
    assert_eq!(raw["Sex"], "female");
}

#[test]
fn test_intake_refuses_existing_record() {
    let dir = tempfile::tempdir().unwrap();
    let study = study(dir.path());
    enroll(&study);

    let mut frontend = ScriptedFrontend::new(60.0);
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let result = study.intake(id(), Sex::Male, false, &mut frontend, &mut rng);
    assert!(matches!(result, Err(AatError::ParticipantExists(_))));
    // Nothing was asked before refusing
    assert!(frontend.prompts().is_empty());

    let record = study.intake(id(), Sex::Male, true, &mut frontend, &mut rng).unwrap();
    assert_eq!(study.records().load(&id()).unwrap().sex, Sex::Male);
    assert_eq!(record.sex, Sex::Male);
}

#[test]
fn test_intake_collects_custom_entries() {
    let dir = tempfile::tempdir().unwrap();
    let study = study(dir.path());
    // Six scenario ratings, then the own situation; no own motivation
    let mut frontend = ScriptedFrontend::new(60.0)
        .with_ratings(vec![3, 9, 9, 1, 0, 0, 10])
        .with_texts(vec!["  After the football match ".to_string(), String::new()]);
    let mut rng = ChaCha8Rng::seed_from_u64(9);

    let record = study.intake(id(), Sex::Male, false, &mut frontend, &mut rng).unwrap();

    let scenarios = &record.scenario_rating;
    assert_eq!(scenarios.custom_text.as_deref(), Some("After the football match"));
    assert_eq!(scenarios.top_keys(3), vec![CUSTOM_KEY, "Bar", "Home"]);
    let offered = scenarios.resolve_all(&scenarios.top_keys(3), &language().imagine_scenario.scenarios);
    assert_eq!(offered[0], "After the football match");
    assert_eq!(offered.len(), 3);

    assert!(record.consequence_rating.custom_text.is_none());
    assert!(!record.consequence_rating.scores.contains_key(CUSTOM_KEY));

    let stored = study.records().load(&id()).unwrap();
    assert_eq!(stored.scenario_rating, record.scenario_rating);
}

// ============================================================================
// Sessions
// ============================================================================

#[test]
fn test_first_session_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let study = study(dir.path());
    enroll(&study);

    let mut frontend = SimulatedFrontend::new(60.0, 11).with_error_rate(0.0);
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    let report = study.run_session(&id(), &mut frontend, &mut rng).unwrap();

    // 2 practice + 24 pre-AAT + 196 training trials
    assert_eq!(report.session, 1);
    assert_eq!(report.condition, "1");
    assert_eq!(report.configs, ConfigStatus::Generated);
    assert_eq!(report.trials, 2 + 24 + 196);
    assert_eq!(report.correct, report.trials);
    assert!(report.expectation.is_some());
    assert!(report.vividness.is_some());

    for n in 1..=SESSION_COUNT {
        assert!(study.records().session_path(&id(), n).is_file());
    }

    let record = study.records().load(&id()).unwrap();
    assert_eq!(record.current_session, 2);
    assert_eq!(record.condition.as_deref(), Some("1"));
    assert_eq!(record.condition_saved.as_deref(), Some("1"));
    assert!(record.expectation.contains_key("1"));
    assert!(record.training_vividness.contains_key("1"));
    assert_eq!(record.consequence["1"].len(), 1);

    let lines = log_lines(&report.log_path);
    assert_eq!(lines[0], COLUMNS.join("\t"));
    let finals: Vec<&String> = lines.iter().filter(|l| l.contains("\tstage_final\t")).collect();
    assert_eq!(finals.len(), report.trials);
    assert!(lines.iter().skip(1).all(|l| l.starts_with("424242\t1\t")));
    assert!(lines.iter().any(|l| l.contains("\tPRACTICE\t")));
    assert!(lines.iter().any(|l| l.contains("\tTRAINING\t")));

    let settings = SettingsStore::new(dir.path().join("settings.json")).load().unwrap();
    assert_eq!(settings.enrollment("1", Sex::Female), Some(1));
}

#[test]
fn test_second_session_reuses_configs() {
    let dir = tempfile::tempdir().unwrap();
    let study = study(dir.path());
    enroll(&study);

    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let mut frontend = SimulatedFrontend::new(60.0, 22).with_error_rate(0.0);
    study.run_session(&id(), &mut frontend, &mut rng).unwrap();

    let first_config = fs::read_to_string(study.records().session_path(&id(), 2)).unwrap();
    let report = study.run_session(&id(), &mut frontend, &mut rng).unwrap();

    assert_eq!(report.session, 2);
    assert_eq!(report.configs, ConfigStatus::Reused);
    // 2 practice + 16 mini-AAT + 196 training trials
    assert_eq!(report.trials, 2 + 16 + 196);
    assert_ne!(report.log_path, PathBuf::new());
    assert_eq!(
        fs::read_to_string(study.records().session_path(&id(), 2)).unwrap(),
        first_config
    );

    // Condition assignment happened once
    let settings = SettingsStore::new(dir.path().join("settings.json")).load().unwrap();
    assert_eq!(settings.enrollment("1", Sex::Female), Some(1));

    let status = study.status(&id()).unwrap();
    assert_eq!(status.current_session, 3);
    assert_eq!(status.session_configs, 6);
    assert!(!status.finished());
}

#[test]
fn test_overwritten_participant_starts_over() {
    let dir = tempfile::tempdir().unwrap();
    let study = study(dir.path());
    enroll(&study);

    let mut frontend = SimulatedFrontend::new(60.0, 61).with_error_rate(0.0);
    let mut rng = ChaCha8Rng::seed_from_u64(62);
    study.run_session(&id(), &mut frontend, &mut rng).unwrap();

    // Fresh intake draws different personalization panels
    let mut intake_frontend = ScriptedFrontend::new(60.0);
    let mut intake_rng = ChaCha8Rng::seed_from_u64(63);
    let record = study
        .intake(id(), Sex::Female, true, &mut intake_frontend, &mut intake_rng)
        .unwrap();
    for n in 1..=SESSION_COUNT {
        assert!(!study.records().session_path(&id(), n).exists());
    }

    let report = study.run_session(&id(), &mut frontend, &mut rng).unwrap();
    assert_eq!(report.session, 1);
    assert_eq!(report.configs, ConfigStatus::Generated);

    // Personal training images all come from the new selections
    let selected: Vec<String> = Category::ALL
        .into_iter()
        .flat_map(|category| record.selected_images(category))
        .collect();
    let config: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(study.records().session_path(&id(), 1)).unwrap(),
    )
    .unwrap();
    let personal: Vec<&str> = config["Training"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["prime"].as_str())
        .filter(|prime| prime.starts_with("p_"))
        .collect();
    assert!(!personal.is_empty());
    assert!(personal.iter().all(|prime| selected.iter().any(|s| s == prime)));

    // The ID is enrolled once
    let settings = SettingsStore::new(dir.path().join("settings.json")).load().unwrap();
    assert_eq!(settings.enrollment("1", Sex::Female), Some(1));
}

#[test]
fn test_escape_leaves_session_counter() {
    let dir = tempfile::tempdir().unwrap();
    let study = study(dir.path());
    enroll(&study);

    let mut frontend = ScriptedFrontend::new(60.0).with_keys(vec![Key::Escape]);
    let mut rng = ChaCha8Rng::seed_from_u64(31);
    let result = study.run_session(&id(), &mut frontend, &mut rng);
    assert!(matches!(result, Err(AatError::Aborted)));

    let record = study.records().load(&id()).unwrap();
    assert_eq!(record.current_session, 1);
    assert!(record.expectation.is_empty());
    assert!(record.condition.is_some());
}

#[test]
fn test_finished_participant_cannot_start_again() {
    let dir = tempfile::tempdir().unwrap();
    let study = study(dir.path());
    enroll(&study);

    let mut record = study.records().load(&id()).unwrap();
    record.current_session = SESSION_COUNT + 1;
    study.records().save(&record).unwrap();

    let mut frontend = ScriptedFrontend::new(60.0);
    let mut rng = ChaCha8Rng::seed_from_u64(41);
    let result = study.run_session(&id(), &mut frontend, &mut rng);
    assert!(matches!(result, Err(AatError::StudyComplete(_))));
    assert!(study.status(&id()).unwrap().finished());
}

#[test]
fn test_unknown_participant() {
    let dir = tempfile::tempdir().unwrap();
    let study = study(dir.path());
    let mut frontend = ScriptedFrontend::new(60.0);
    let mut rng = ChaCha8Rng::seed_from_u64(51);

    let result = study.run_session(&id(), &mut frontend, &mut rng);
    assert!(matches!(result, Err(AatError::ParticipantNotFound(_))));
}

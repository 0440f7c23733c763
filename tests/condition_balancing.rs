//! Integration tests for condition balancing and session config storage
//!
//! - Enrollment stays balanced within every sex stratum
//! - Re-running assignment for a participant is a no-op
//! - Session configs are generated once and never overwritten

use std::fs;
use std::path::Path;

use aat_trainer::condition::{assign_condition, ConditionFactors};
use aat_trainer::core::error::AatError;
use aat_trainer::core::types::{Category, ParticipantId, Sex};
use aat_trainer::participant::{ParticipantRecord, RecordStore};
use aat_trainer::session::{ensure_session_configs, load_session_config, ConfigStatus};
use aat_trainer::settings::SettingsStore;
use aat_trainer::stimuli::{StimulusCatalog, StimulusSet};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const SETTINGS: &str = r#"{
    "Window Size": [1280, 720],
    "Window Color": "black",
    "Font Size": 0.06,
    "Font Color": "white",
    "Joystick Backend": "pygame",
    "Rotation Degrees": 3,
    "Condition Codes": {"1": "B", "2": "B'", "3": "AB'", "4": "AB'C"},
    "Randomization": {
        "1": {"male": 0, "female": 0, "other": 0, "prefer-not-to-say": 0},
        "2": {"male": 0, "female": 0, "other": 0, "prefer-not-to-say": 0},
        "3": {"male": 0, "female": 0, "other": 0, "prefer-not-to-say": 0},
        "4": {"male": 0, "female": 0, "other": 0, "prefer-not-to-say": 0}
    }
}"#;

fn settings_store(dir: &Path) -> SettingsStore {
    let path = dir.join("settings.json");
    fs::write(&path, SETTINGS).unwrap();
    SettingsStore::new(path)
}

fn participant(n: usize, sex: Sex) -> ParticipantRecord {
    let id = ParticipantId::parse(&format!("{:06}", 100_000 + n)).unwrap();
    ParticipantRecord::new(id, sex)
}

// ============================================================================
// Balancing
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn enrollment_stays_balanced_per_sex(sexes in prop::collection::vec(prop::sample::select(Sex::ALL.to_vec()), 1..40)) {
        let dir = tempfile::tempdir().unwrap();
        let store = settings_store(dir.path());

        for (n, sex) in sexes.iter().enumerate() {
            let mut record = participant(n, *sex);
            assign_condition(&mut record, &store).unwrap();
        }

        let settings = store.load().unwrap();
        for sex in Sex::ALL {
            let counts: Vec<u32> = settings
                .randomization
                .keys()
                .map(|code| settings.enrollment(code, sex).unwrap())
                .collect();
            let max = *counts.iter().max().unwrap();
            let min = *counts.iter().min().unwrap();
            prop_assert!(max - min <= 1, "{}: {:?}", sex, counts);

            let enrolled = sexes.iter().filter(|s| **s == sex).count() as u32;
            prop_assert_eq!(counts.iter().sum::<u32>(), enrolled);
        }
    }
}

#[test]
fn test_fill_order_follows_document_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = settings_store(dir.path());

    let codes: Vec<String> = (0..5)
        .map(|n| assign_condition(&mut participant(n, Sex::Male), &store).unwrap())
        .collect();
    assert_eq!(codes, vec!["1", "2", "3", "4", "1"]);
}

#[test]
fn test_reassignment_keeps_condition_and_counts() {
    let dir = tempfile::tempdir().unwrap();
    let store = settings_store(dir.path());
    let mut record = participant(0, Sex::Other);

    let first = assign_condition(&mut record, &store).unwrap();
    let before = fs::read_to_string(store.path()).unwrap();
    let second = assign_condition(&mut record, &store).unwrap();

    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
}

// ============================================================================
// Session config storage
// ============================================================================

fn catalog() -> StimulusCatalog {
    let set = |name: &str, n: usize| {
        Category::ALL.into_iter().fold(StimulusSet::new(name), |set, category| {
            let images = (0..n).map(|i| format!("{}/{}_{}.jpg", name, category, i)).collect();
            set.with_subcategory(category, "Mixed", images)
        })
    };
    StimulusCatalog {
        set_a: set("set_a", 3),
        set_b: set("set_b", 5),
        standard: set("standard", 4),
        personalization: set("personalization", 45),
    }
}

fn assigned(dir: &Path) -> (RecordStore, ParticipantRecord, ConditionFactors) {
    let settings = settings_store(dir);
    let store = RecordStore::new(dir.join("participants"), "aat");
    let mut record = participant(7, Sex::Female);
    let code = assign_condition(&mut record, &settings).unwrap();
    store.create(&record, false).unwrap();
    let label = settings.load().unwrap().condition_label(&code).unwrap().to_string();
    (store, record, ConditionFactors::from_label(&label))
}

#[test]
fn test_configs_generated_once_and_reused() {
    let dir = tempfile::tempdir().unwrap();
    let (store, record, factors) = assigned(dir.path());
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let status = ensure_session_configs(&store, &record, &catalog(), factors, &mut rng).unwrap();
    assert_eq!(status, ConfigStatus::Generated);

    let path = store.session_path(&record.id, 4);
    let original = fs::read_to_string(&path).unwrap();

    let mut other_rng = ChaCha8Rng::seed_from_u64(99);
    let status = ensure_session_configs(&store, &record, &catalog(), factors, &mut other_rng).unwrap();
    assert_eq!(status, ConfigStatus::Reused);
    assert_eq!(fs::read_to_string(&path).unwrap(), original);

    let session = load_session_config(&store, &record.id, 4).unwrap();
    assert_eq!(session.session, 4);
    // Mini-AAT: 4 of the 5 set B images per category, both movements
    assert_eq!(session.assessment.len(), 16);
    assert!(session.assessment.iter().all(|t| t.code.starts_with("MINIAAT_0_")));
}

#[test]
fn test_partial_config_set_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (store, record, factors) = assigned(dir.path());
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    ensure_session_configs(&store, &record, &catalog(), factors, &mut rng).unwrap();
    fs::remove_file(store.session_path(&record.id, 6)).unwrap();

    let result = ensure_session_configs(&store, &record, &catalog(), factors, &mut rng);
    assert!(matches!(
        result,
        Err(AatError::SessionConfigIncomplete { found: 5, .. })
    ));
    assert!(!store.session_path(&record.id, 6).exists());
}

#[test]
fn test_session_file_for_other_participant_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (store, record, factors) = assigned(dir.path());
    let mut rng = ChaCha8Rng::seed_from_u64(6);
    ensure_session_configs(&store, &record, &catalog(), factors, &mut rng).unwrap();

    fs::copy(store.session_path(&record.id, 2), store.session_path(&record.id, 3)).unwrap();
    let result = load_session_config(&store, &record.id, 3);
    assert!(matches!(result, Err(AatError::SessionConfig(_))));
}

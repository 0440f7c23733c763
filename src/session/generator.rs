//! Trial list generation for the six sessions
//!
//! | Session | Assessment          | Training                 |
//! |---------|---------------------|--------------------------|
//! | 1       | pre-AAT (full set)  | training list, shuffle 1 |
//! | 2-5     | mini-AAT            | training list, shuffle N |
//! | 6       | post-AAT (full set) | training list, shuffle 6 |
//!
//! The full set is every image of set A and set B with one congruent and one
//! incongruent trial each. The mini-AAT takes 4 images per set B
//! subcategory; the sample is drawn once and reshuffled per session.
//! Training lists only contain congruent trials, two per image.

use rand::seq::SliceRandom;
use rand::Rng;

use super::{SessionConfig, TrialDescriptor, SESSION_COUNT};
use crate::condition::ConditionFactors;
use crate::core::error::{AatError, Result};
use crate::core::types::{Category, TrialType};
use crate::participant::ParticipantRecord;
use crate::stimuli::{StimulusCatalog, StimulusSet};

pub const PRE_AAT_PREFIX: &str = "PREAAT";
pub const POST_AAT_PREFIX: &str = "POSTAAT";
pub const MINI_AAT_PREFIX: &str = "MINIAAT";
pub const TRAINING_PREFIX: &str = "TRAINAAT";

/// Images sampled per set B subcategory for a mini-AAT
pub const MINI_AAT_PER_SUBCATEGORY: usize = 4;

/// Repetitions of every image in a training list
pub const TRAINING_REPEATS: usize = 2;

/// Images per category, in a fixed category order
type CategoryImages = Vec<(Category, Vec<String>)>;

/// One congruent and one incongruent trial per image
fn assessment_trials(prefix: &str, images: &CategoryImages) -> Vec<TrialDescriptor> {
    let mut trials = Vec::new();
    for (category, imgs) in images {
        for img in imgs {
            for trialtype in [TrialType::Push, TrialType::Pull] {
                trials.push(TrialDescriptor::new(prefix, *category, trialtype, img.clone()));
            }
        }
    }
    trials
}

/// Congruent trials only, each image repeated
fn training_trials(images: &CategoryImages) -> Vec<TrialDescriptor> {
    let mut trials = Vec::new();
    for (category, imgs) in images {
        let movement = category.congruent_movement();
        for img in imgs {
            for _ in 0..TRAINING_REPEATS {
                trials.push(TrialDescriptor::new(TRAINING_PREFIX, *category, movement, img.clone()));
            }
        }
    }
    trials
}

fn full_set(catalog: &StimulusCatalog) -> CategoryImages {
    Category::ALL
        .into_iter()
        .map(|category| {
            let mut imgs = catalog.set_a.all_images(category);
            imgs.extend(catalog.set_b.all_images(category));
            (category, imgs)
        })
        .collect()
}

fn mini_sample<R: Rng + ?Sized>(set: &StimulusSet, rng: &mut R) -> CategoryImages {
    Category::ALL
        .into_iter()
        .map(|category| {
            let mut picked = Vec::new();
            for (_, imgs) in set.subcategories(category) {
                let mut imgs = imgs.clone();
                imgs.shuffle(rng);
                imgs.truncate(MINI_AAT_PER_SUBCATEGORY);
                picked.extend(imgs);
            }
            (category, picked)
        })
        .collect()
}

/// Set B for everyone, plus either the personal selections or the standard set
fn training_images(
    catalog: &StimulusCatalog,
    record: &ParticipantRecord,
    factors: ConditionFactors,
) -> Result<CategoryImages> {
    Category::ALL
        .into_iter()
        .map(|category| {
            let mut imgs = catalog.set_b.all_images(category);
            if factors.personalized_images {
                let personal = record.selected_images(category);
                if personal.is_empty() {
                    return Err(AatError::SessionConfig(format!(
                        "participant {} has no personal {} images",
                        record.id, category
                    )));
                }
                imgs.extend(personal);
            } else {
                imgs.extend(catalog.standard.all_images(category));
            }
            Ok((category, imgs))
        })
        .collect()
}

fn shuffled<R: Rng + ?Sized>(trials: &[TrialDescriptor], rng: &mut R) -> Vec<TrialDescriptor> {
    let mut copy = trials.to_vec();
    copy.shuffle(rng);
    copy
}

/// Build all six session configs for a participant with an assigned condition
pub fn generate_sessions<R: Rng + ?Sized>(
    record: &ParticipantRecord,
    catalog: &StimulusCatalog,
    factors: ConditionFactors,
    rng: &mut R,
) -> Result<Vec<SessionConfig>> {
    if record.condition.is_none() {
        return Err(AatError::SessionConfig(format!(
            "participant {} needs a condition before sessions are generated",
            record.id
        )));
    }

    let full = full_set(catalog);
    let pre = shuffled(&assessment_trials(PRE_AAT_PREFIX, &full), rng);
    let post = shuffled(&assessment_trials(POST_AAT_PREFIX, &full), rng);

    let mini = assessment_trials(MINI_AAT_PREFIX, &mini_sample(&catalog.set_b, rng));
    let training = training_trials(&training_images(catalog, record, factors)?);

    if pre.is_empty() || mini.is_empty() || training.is_empty() {
        return Err(AatError::SessionConfig(format!(
            "empty trial list for participant {} (pre {}, mini {}, training {})",
            record.id,
            pre.len(),
            mini.len(),
            training.len()
        )));
    }

    let mut sessions = Vec::with_capacity(SESSION_COUNT as usize);
    for session in 1..=SESSION_COUNT {
        let assessment = match session {
            1 => pre.clone(),
            n if n == SESSION_COUNT => post.clone(),
            _ => shuffled(&mini, rng),
        };
        sessions.push(SessionConfig {
            participant_id: record.id.clone(),
            session,
            assessment,
            training: shuffled(&training, rng),
        });
    }

    tracing::info!(
        "Generated {} sessions for {}: {} assessment / {} mini / {} training trials",
        sessions.len(),
        record.id,
        pre.len(),
        mini.len(),
        training.len()
    );
    Ok(sessions)
}

//! Study driver: intake, one session, status
//!
//! [`Study`] bundles everything a run needs (settings, participant store,
//! output directory, texts, stimuli, tunables) and exposes the three things
//! the lab does with a participant.

use chrono::Local;
use indexmap::IndexMap;
use rand::Rng;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::condition::{assign_condition, release_condition, ConditionFactors};
use crate::core::config::ExperimentConfig;
use crate::core::error::{AatError, Result};
use crate::core::types::{Category, ParticipantId, Sex};
use crate::frontend::{ask_choice, ask_rating, ask_text, Frontend};
use crate::language::Language;
use crate::participant::ratings::{Ratings, CUSTOM_KEY, MAX_CUSTOM_TEXT_CHARS, MAX_RATING};
use crate::participant::{PanelChooser, ParticipantRecord, PersonalizationPlan, RecordStore};
use crate::sections::{standard_session, SectionPipeline, SessionEffects};
use crate::session::{ensure_session_configs, load_session_config, ConfigStatus, SESSION_COUNT};
use crate::settings::SettingsStore;
use crate::stimuli::StimulusCatalog;
use crate::trial::{RowContext, TrialLog, TrialRunner};

/// Subcategories each participant ranks per category at intake
const RANKED_SUBCATEGORIES: usize = 3;

/// Where a study keeps its files
#[derive(Debug, Clone)]
pub struct StudyPaths {
    pub settings: PathBuf,
    pub config_dir: PathBuf,
    pub output_dir: PathBuf,
    pub language: PathBuf,
    pub stimuli: PathBuf,
    /// File name prefix of participant documents
    pub prefix: String,
}

pub struct Study {
    settings: SettingsStore,
    records: RecordStore,
    output_dir: PathBuf,
    language: Language,
    catalog: StimulusCatalog,
    config: ExperimentConfig,
}

/// Result of one completed session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub id: ParticipantId,
    pub session: u32,
    pub condition: String,
    pub configs: ConfigStatus,
    pub log_path: PathBuf,
    pub trials: usize,
    pub correct: usize,
    pub expectation: Option<u8>,
    pub vividness: Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantStatus {
    pub id: ParticipantId,
    pub sex: Sex,
    pub condition: Option<String>,
    pub current_session: u32,
    /// Session config files present on disk
    pub session_configs: usize,
}

impl ParticipantStatus {
    pub fn finished(&self) -> bool {
        self.current_session > SESSION_COUNT
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Participant {} ({})", self.id, self.sex)?;
        writeln!(
            f,
            "  Condition:       {}",
            self.condition.as_deref().unwrap_or("not assigned")
        )?;
        if self.finished() {
            writeln!(f, "  Sessions:        all {} done", SESSION_COUNT)?;
        } else {
            writeln!(f, "  Next session:    {}", self.current_session.max(1))?;
        }
        write!(f, "  Session configs: {}/{}", self.session_configs, SESSION_COUNT)
    }
}

/// Presents every panel image by image through the frontend's choice prompt
struct FrontendPicks<'a, F: Frontend + ?Sized> {
    frontend: &'a mut F,
}

impl<F: Frontend + ?Sized> PanelChooser for FrontendPicks<'_, F> {
    fn choose(&mut self, subcategory: &str, panel: &[String], required: usize) -> Result<Vec<String>> {
        let mut remaining = panel.to_vec();
        let mut picked = Vec::with_capacity(required);
        for n in 1..=required {
            let prompt = format!("{}: pick image {} of {}", subcategory, n, required);
            let choice = ask_choice(&mut *self.frontend, &prompt, &remaining)?;
            remaining.retain(|img| img != &choice);
            picked.push(choice);
        }
        Ok(picked)
    }
}

/// Rate every vocabulary entry, then the participant's own entry if given
fn rate_vocabulary<F: Frontend + ?Sized>(
    ratings: &mut Ratings,
    vocabulary: &IndexMap<String, String>,
    custom_prompt: &str,
    frontend: &mut F,
) -> Result<()> {
    for (key, text) in vocabulary {
        let score = ask_rating(frontend, text, 0, MAX_RATING)?;
        ratings.set(key.clone(), score as i64)?;
    }

    let custom = ask_text(frontend, custom_prompt, MAX_CUSTOM_TEXT_CHARS)?;
    if !custom.is_empty() {
        let score = ask_rating(frontend, &custom, 0, MAX_RATING)?;
        ratings.set_custom_text(custom)?;
        ratings.set(CUSTOM_KEY, score as i64)?;
    }
    Ok(())
}

impl Study {
    pub fn new(
        settings: SettingsStore,
        records: RecordStore,
        output_dir: impl Into<PathBuf>,
        language: Language,
        catalog: StimulusCatalog,
        config: ExperimentConfig,
    ) -> Result<Self> {
        config.validate().map_err(AatError::Config)?;
        Ok(Self {
            settings,
            records,
            output_dir: output_dir.into(),
            language,
            catalog,
            config,
        })
    }

    /// Load texts and stimuli from disk and check the settings document
    pub fn open(paths: &StudyPaths, config: ExperimentConfig) -> Result<Self> {
        let settings = SettingsStore::new(&paths.settings);
        settings.load()?;
        let language = Language::load(&paths.language)?;
        let catalog = StimulusCatalog::from_root(&paths.stimuli)?;
        Self::new(
            settings,
            RecordStore::new(&paths.config_dir, &paths.prefix),
            &paths.output_dir,
            language,
            catalog,
            config,
        )
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Create the presession record: ratings first, then personal images
    ///
    /// Overwriting a participant releases the old record's condition and
    /// removes its session configs, so the next session starts from scratch.
    pub fn intake<F: Frontend + ?Sized, R: Rng + ?Sized>(
        &self,
        id: ParticipantId,
        sex: Sex,
        overwrite: bool,
        frontend: &mut F,
        rng: &mut R,
    ) -> Result<ParticipantRecord> {
        if self.records.exists(&id) && !overwrite {
            return Err(AatError::ParticipantExists(id.to_string()));
        }
        let mut record = ParticipantRecord::new(id, sex);

        let prompts = &self.language.prompts;
        rate_vocabulary(
            &mut record.scenario_rating,
            &self.language.imagine_scenario.scenarios,
            &prompts.custom_scenario,
            frontend,
        )?;
        rate_vocabulary(
            &mut record.consequence_rating,
            &self.language.consequences,
            &prompts.custom_consequence,
            frontend,
        )?;

        for category in Category::ALL {
            let pool = &self.catalog.personalization;
            let mut remaining: Vec<String> = pool.subcategories(category).map(|(name, _)| name.clone()).collect();
            if remaining.len() < RANKED_SUBCATEGORIES {
                return Err(AatError::Config(format!(
                    "{} needs at least {} {} subcategories, found {}",
                    pool.name,
                    RANKED_SUBCATEGORIES,
                    category,
                    remaining.len()
                )));
            }

            let mut ranking = Vec::with_capacity(RANKED_SUBCATEGORIES);
            for rank in 1..=RANKED_SUBCATEGORIES {
                let prompt = format!("Rank {} of the {} drinks", rank, category);
                let choice = ask_choice(frontend, &prompt, &remaining)?;
                remaining.retain(|s| s != &choice);
                ranking.push(choice);
            }

            let plan = PersonalizationPlan::draw(pool, category, &ranking, rng)?;
            let selections = plan.collect(&mut FrontendPicks { frontend: &mut *frontend })?;
            record.set_selections(category, selections);
        }

        if overwrite && self.records.exists(&record.id) {
            let replaced = self.records.load(&record.id)?;
            release_condition(&replaced, &self.settings)?;
        }
        self.records.create(&record, overwrite)?;
        Ok(record)
    }

    /// Run the participant's next session from start to finish
    ///
    /// The record is saved after the session counter moves from 0 to 1 and
    /// after condition assignment; the finished session is only recorded once
    /// every section ran. An abort leaves the counter where it was.
    pub fn run_session<F: Frontend + ?Sized, R: Rng + ?Sized>(
        &self,
        id: &ParticipantId,
        frontend: &mut F,
        rng: &mut R,
    ) -> Result<SessionReport> {
        let mut record = self.records.load(id)?;
        let session = record.begin_session()?;
        self.records.save(&record)?;

        let code = assign_condition(&mut record, &self.settings)?;
        self.records.save(&record)?;

        let settings = self.settings.load()?;
        let factors = ConditionFactors::from_label(settings.condition_label(&code)?);
        let configs = ensure_session_configs(&self.records, &record, &self.catalog, factors, rng)?;
        let session_config = load_session_config(&self.records, id, session)?;
        tracing::info!(
            "Participant {} starting session {} in condition {} ({:?} configs)",
            id,
            session,
            code,
            configs
        );

        let effects = self.session_effects(&mut record, session, factors, settings.n_scenarios, frontend)?;

        let started = Local::now();
        let mut log = TrialLog::create(&self.output_dir, id, session, started)?;
        let sections = standard_session(&session_config, &self.language, &self.config, &effects)?;
        let mut pipeline = SectionPipeline::new(sections)?;

        let context = RowContext {
            id: id.clone(),
            condition: code.clone(),
            scenario: effects.scenario_text(&self.language).to_string(),
            session,
            consequence: effects.consequence_text(),
        };
        let outcome = {
            let mut runner = TrialRunner::new(
                &self.config,
                &self.language.hints,
                &self.language.prompts.consequence_label,
                settings.rotation_degrees,
                &mut log,
                context,
            );
            pipeline.run(frontend, &mut runner, &self.config)?
        };

        if let Some(rating) = outcome.expectation {
            record.record_expectation(session, rating);
        }
        if let Some(rating) = outcome.vividness {
            record.record_vividness(session, rating);
        }
        record.complete_session(session)?;
        self.records.save(&record)?;

        let correct = outcome.trials.iter().filter(|t| t.correct).count();
        tracing::info!(
            "Participant {} finished session {}: {}/{} trials correct, {} rows in {:?}",
            id,
            session,
            correct,
            outcome.trials.len(),
            log.rows(),
            log.path()
        );

        Ok(SessionReport {
            id: id.clone(),
            session,
            condition: code,
            configs,
            log_path: log.path().to_path_buf(),
            trials: outcome.trials.len(),
            correct,
            expectation: outcome.expectation,
            vividness: outcome.vividness,
        })
    }

    /// Scenario and consequence picks for this session
    fn session_effects<F: Frontend + ?Sized>(
        &self,
        record: &mut ParticipantRecord,
        session: u32,
        factors: ConditionFactors,
        n_scenarios: usize,
        frontend: &mut F,
    ) -> Result<SessionEffects> {
        let mut effects = SessionEffects {
            factors,
            ..SessionEffects::default()
        };

        if factors.scenario_imagery {
            let top = record.scenario_rating.top_keys(n_scenarios);
            let options = record
                .scenario_rating
                .resolve_all(&top, &self.language.imagine_scenario.scenarios);
            let scenario = ask_choice(frontend, &self.language.prompts.select_scenario, &options)?;
            tracing::info!("Participant {} imagines '{}'", record.id, scenario);
            effects.scenario = Some(scenario);
        }

        if factors.consequence_feedback {
            let top = record.consequence_rating.max_keys();
            let options = record
                .consequence_rating
                .resolve_all(&top, &self.language.consequences);
            let consequence = ask_choice(frontend, &self.language.prompts.select_consequence, &options)?;
            record.record_consequence(session, vec![consequence.clone()]);
            effects.consequences = vec![consequence];
        }

        Ok(effects)
    }

    pub fn status(&self, id: &ParticipantId) -> Result<ParticipantStatus> {
        let record = self.records.load(id)?;
        let session_configs = (1..=SESSION_COUNT)
            .filter(|&n| self.records.session_path(id, n).is_file())
            .count();
        Ok(ParticipantStatus {
            id: record.id,
            sex: record.sex,
            condition: record.condition,
            current_session: record.current_session,
            session_configs,
        })
    }
}

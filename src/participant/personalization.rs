//! Personalized image selection
//!
//! The participant ranks three subcategories per category. The first ranked
//! subcategory is shown in 5 panels, the second in 3, the third in 1; every
//! panel holds 9 images and the participant picks 5 of them. That yields
//! 25 + 15 + 5 = 45 personal images per category.

use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::core::error::{AatError, Result};
use crate::core::types::Category;
use crate::stimuli::StimulusSet;

pub const PANEL_SIZE: usize = 9;
pub const PICKS_PER_PANEL: usize = 5;
pub const PANELS_PER_RANK: [usize; 3] = [5, 3, 1];

/// Subcategory label -> (pick index -> image path), in rank order
pub type ImageSelections = IndexMap<String, IndexMap<String, String>>;

/// Picks images from a panel; implemented by whatever presents the grid
pub trait PanelChooser {
    fn choose(&mut self, subcategory: &str, panel: &[String], required: usize) -> Result<Vec<String>>;
}

/// Takes the first `required` images of each (already shuffled) panel
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstPicks;

impl PanelChooser for FirstPicks {
    fn choose(&mut self, _subcategory: &str, panel: &[String], required: usize) -> Result<Vec<String>> {
        Ok(panel.iter().take(required).cloned().collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedSubcategory {
    pub subcategory: String,
    pub panels: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonalizationPlan {
    pub category: Category,
    pub ranked: Vec<RankedSubcategory>,
}

impl PersonalizationPlan {
    /// Draw the panels for one category
    ///
    /// `ranking` must name three distinct subcategories of `pool`, each with
    /// enough images for its panels.
    pub fn draw<R: Rng + ?Sized>(
        pool: &StimulusSet,
        category: Category,
        ranking: &[String],
        rng: &mut R,
    ) -> Result<Self> {
        if ranking.len() != PANELS_PER_RANK.len() {
            return Err(AatError::InvalidSelection(format!(
                "{}: rank exactly {} subcategories, got {}",
                category,
                PANELS_PER_RANK.len(),
                ranking.len()
            )));
        }
        let distinct: HashSet<&String> = ranking.iter().collect();
        if distinct.len() != ranking.len() || ranking.iter().any(|s| s.trim().is_empty()) {
            return Err(AatError::InvalidSelection(format!(
                "{}: ranked subcategories must be distinct and non-empty",
                category
            )));
        }

        let mut ranked = Vec::with_capacity(ranking.len());
        for (subcategory, n_panels) in ranking.iter().zip(PANELS_PER_RANK) {
            let images = pool.subcategory(category, subcategory).ok_or_else(|| {
                AatError::InvalidSelection(format!(
                    "{}: '{}' is not a subcategory of {}",
                    category, subcategory, pool.name
                ))
            })?;

            let needed = n_panels * PANEL_SIZE;
            if images.len() < needed {
                return Err(AatError::Config(format!(
                    "{}/{} holds {} images, {} needed for {} panels",
                    category,
                    subcategory,
                    images.len(),
                    needed,
                    n_panels
                )));
            }

            let mut shuffled = images.to_vec();
            shuffled.shuffle(rng);
            shuffled.truncate(needed);
            let panels = shuffled.chunks(PANEL_SIZE).map(<[String]>::to_vec).collect();

            ranked.push(RankedSubcategory {
                subcategory: subcategory.clone(),
                panels,
            });
        }

        Ok(Self { category, ranked })
    }

    /// Present every panel to `chooser` and collect the picks
    pub fn collect(&self, chooser: &mut impl PanelChooser) -> Result<ImageSelections> {
        let mut selections = ImageSelections::new();

        for ranked in &self.ranked {
            let mut picked: Vec<String> = Vec::new();
            for panel in &ranked.panels {
                let picks = chooser.choose(&ranked.subcategory, panel, PICKS_PER_PANEL)?;
                validate_picks(&ranked.subcategory, panel, &picks)?;
                picked.extend(picks);
            }

            let numbered = picked
                .into_iter()
                .enumerate()
                .map(|(i, img)| ((i + 1).to_string(), img))
                .collect();
            selections.insert(format!("{} Selection", ranked.subcategory), numbered);
        }

        tracing::debug!(
            "{}: collected {} personal images",
            self.category,
            selections.values().map(IndexMap::len).sum::<usize>()
        );
        Ok(selections)
    }
}

fn validate_picks(subcategory: &str, panel: &[String], picks: &[String]) -> Result<()> {
    if picks.len() != PICKS_PER_PANEL {
        return Err(AatError::InvalidSelection(format!(
            "{}: pick exactly {} images per panel, got {}",
            subcategory,
            PICKS_PER_PANEL,
            picks.len()
        )));
    }
    let unique: HashSet<&String> = picks.iter().collect();
    if unique.len() != picks.len() {
        return Err(AatError::InvalidSelection(format!(
            "{}: the same image was picked twice",
            subcategory
        )));
    }
    if let Some(stray) = picks.iter().find(|p| !panel.contains(p)) {
        return Err(AatError::InvalidSelection(format!(
            "{}: '{}' is not part of the panel",
            subcategory, stray
        )));
    }
    Ok(())
}

//! Joystick stages
//!
//! The axis is cut into named bands: `baseline` around rest, then
//! `pull1..pullN` above and `push1..pushN` below. Band edges are exclusive,
//! so a position exactly on an edge belongs to no band.
//!
//! A band is logged when it is entered and then stays quiet until the stick
//! moves into a neighbouring band; entering a band re-arms both of its
//! neighbours. Moving back and forth across an edge therefore logs every
//! crossing, while jitter inside one band logs nothing.

use std::fmt;

use crate::core::config::ExperimentConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Baseline,
    Pull(u8),
    Push(u8),
    /// Logged once when the trial ends
    Final,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Baseline => f.write_str("baseline"),
            Stage::Pull(n) => write!(f, "pull{}", n),
            Stage::Push(n) => write!(f, "push{}", n),
            Stage::Final => f.write_str("stage_final"),
        }
    }
}

/// A stage entry that has to be written to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageEntry {
    pub stage: Stage,
    pub number: u32,
}

#[derive(Debug, Clone)]
pub struct StageTracker {
    half_width: f32,
    band_width: f32,
    bands: usize,
    /// push N .. push 1, baseline, pull 1 .. pull N
    armed: Vec<bool>,
    number: u32,
}

impl StageTracker {
    pub fn new(config: &ExperimentConfig) -> Self {
        let bands = config.stage_band_count;
        Self {
            half_width: config.baseline_half_width,
            band_width: config.stage_band_width,
            bands,
            armed: vec![true; 2 * bands + 1],
            number: 0,
        }
    }

    /// Band containing `y`, if any
    pub fn classify(&self, y: f32) -> Option<Stage> {
        if y > -self.half_width && y < self.half_width {
            return Some(Stage::Baseline);
        }
        let distance = y.abs();
        for band in 1..=self.bands {
            let lower = self.half_width + self.band_width * (band - 1) as f32;
            let upper = lower + self.band_width;
            if distance > lower && distance < upper {
                let band = band as u8;
                return Some(if y > 0.0 { Stage::Pull(band) } else { Stage::Push(band) });
            }
        }
        None
    }

    fn slot(&self, stage: Stage) -> Option<usize> {
        match stage {
            Stage::Baseline => Some(self.bands),
            Stage::Pull(n) => Some(self.bands + n as usize),
            Stage::Push(n) => Some(self.bands - n as usize),
            Stage::Final => None,
        }
    }

    /// Feed one stick sample; returns the entry to log, if any
    pub fn observe(&mut self, y: f32) -> Option<StageEntry> {
        let stage = self.classify(y)?;
        let slot = self.slot(stage)?;
        if !self.armed[slot] {
            return None;
        }

        self.armed[slot] = false;
        if slot > 0 {
            self.armed[slot - 1] = true;
        }
        if slot + 1 < self.armed.len() {
            self.armed[slot + 1] = true;
        }

        self.number += 1;
        Some(StageEntry {
            stage,
            number: self.number,
        })
    }

    /// The closing entry; it repeats the last stage number
    pub fn finish(&self) -> StageEntry {
        StageEntry {
            stage: Stage::Final,
            number: self.number,
        }
    }
}

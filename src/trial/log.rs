//! Tab-separated trial output
//!
//! One file per session run: `<output>/<id>/<id>_<session>_<timestamp>.txt`,
//! with `_1`, `_2`, ... appended when the name is taken. The header row is
//! written on creation and every row is flushed as it is appended, so an
//! aborted session keeps everything logged up to the abort.

use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::core::error::{AatError, Result};
use crate::core::types::{ParticipantId, StudyPart, TrialType};

pub const COLUMNS: [&str; 18] = [
    "ID",
    "Condition",
    "Scenario",
    "CurrentTime",
    "Studypart",
    "Code",
    "TrialType",
    "Delay",
    "Picture",
    "Trialnumber",
    "RT",
    "Stage_number",
    "Stage",
    "Y_coordinate",
    "RespCorrect",
    "Congruency",
    "Session",
    "Consequence",
];

const FILE_TIMESTAMP: &str = "%Y_%m_%d_%H_%M_%S";

/// Trial timestamp format of the `CurrentTime` column
pub const ROW_TIMESTAMP: &str = "%Y-%m-%d/%H:%M:%S";

/// Attempts at a free file name before giving up
const MAX_SUFFIX: u32 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct TrialRow {
    pub id: ParticipantId,
    pub condition: String,
    pub scenario: String,
    pub current_time: String,
    pub study_part: StudyPart,
    pub code: String,
    pub trial_type: TrialType,
    pub delay: u32,
    pub picture: String,
    pub trial_number: u32,
    pub rt: f64,
    pub stage_number: u32,
    pub stage: String,
    pub y: f32,
    pub correct: bool,
    pub congruency: String,
    pub session: u32,
    pub consequence: String,
}

impl TrialRow {
    fn fields(&self) -> [String; 18] {
        [
            self.id.to_string(),
            self.condition.clone(),
            self.scenario.clone(),
            self.current_time.clone(),
            self.study_part.to_string(),
            self.code.clone(),
            self.trial_type.to_string(),
            self.delay.to_string(),
            self.picture.clone(),
            self.trial_number.to_string(),
            self.rt.to_string(),
            self.stage_number.to_string(),
            self.stage.clone(),
            format_y(self.y),
            u8::from(self.correct).to_string(),
            self.congruency.clone(),
            self.session.to_string(),
            self.consequence.clone(),
        ]
    }
}

/// Y coordinate rounded to 5 decimals, without trailing zeros
fn format_y(y: f32) -> String {
    let rounded = (y as f64 * 1e5).round() / 1e5;
    // -0 would print as "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    rounded.to_string()
}

/// Tabs and newlines would break the row layout
fn sanitize(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], " ")
}

#[derive(Debug)]
pub struct TrialLog {
    path: PathBuf,
    writer: BufWriter<File>,
    rows: usize,
}

impl TrialLog {
    /// Create the session log under `<output_root>/<id>/`
    pub fn create(
        output_root: &Path,
        id: &ParticipantId,
        session: u32,
        started: DateTime<Local>,
    ) -> Result<Self> {
        let dir = output_root.join(id.as_str());
        fs::create_dir_all(&dir)?;

        let stem = format!("{}_{}_{}", id, session, started.format(FILE_TIMESTAMP));
        for suffix in 0..MAX_SUFFIX {
            let name = if suffix == 0 {
                format!("{}.txt", stem)
            } else {
                format!("{}_{}.txt", stem, suffix)
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    let mut log = Self {
                        path,
                        writer: BufWriter::new(file),
                        rows: 0,
                    };
                    log.write_line(&COLUMNS.map(String::from))?;
                    tracing::info!("Writing trial output to {:?}", log.path);
                    return Ok(log);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AatError::Config(format!(
            "no free output file name for {} in {:?}",
            stem, dir
        )))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows written so far
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn append(&mut self, row: &TrialRow) -> Result<()> {
        self.write_line(&row.fields())?;
        self.rows += 1;
        Ok(())
    }

    fn write_line(&mut self, fields: &[String]) -> Result<()> {
        let line = fields
            .iter()
            .map(|f| sanitize(f))
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }
}

//! Experiment configuration with documented constants
//!
//! Joystick thresholds, timing and feedback parameters live here so that the
//! trial engine and the session layout never carry bare numbers.

/// Configuration for the trial engine and the standard session layout
///
/// The defaults reproduce the protocol the study was run with. Changing the
/// stage bands changes what ends up in the output log, so downstream analysis
/// scripts must be updated together with them.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    // === JOYSTICK ===
    /// Half-width of the baseline band around the resting position
    pub baseline_half_width: f32,

    /// Width of each pull/push band beyond the baseline
    ///
    /// Four bands of 0.2 cover the range 0.1 to 0.9 on either side.
    pub stage_band_width: f32,

    /// Number of bands per direction (pull1..pullN / push1..pushN)
    pub stage_band_count: usize,

    /// Deflection that ends a trial in the required direction
    pub terminal_threshold: f32,

    /// Radius in which the stick counts as centered before a trial starts
    pub centered_radius: f32,

    /// Deflection beyond which wrong-direction movement colours the screen
    pub wrong_direction_threshold: f32,

    // === STIMULUS ===
    /// Images are drawn at their native size divided by this factor
    pub stimulus_scale_divisor: f32,

    /// Seconds of waiting for a trial start before hints are drawn
    pub hint_delay_secs: f32,

    /// Frame rate used by virtual frame clocks (headless frontends)
    pub frames_per_second: f32,

    // === FEEDBACK ===
    /// Number of assessment trials one full meter sweep is scaled to
    pub assessment_trials: usize,

    /// Starting meter value for the assessment block
    pub assessment_meter_start: f32,

    /// Trials between assessment feedback presentations
    pub assessment_feedback_interval: usize,

    /// Number of training trials one full meter sweep is scaled to
    pub training_trials: usize,

    /// Trials between training feedback presentations
    pub training_feedback_interval: usize,

    /// Base frame budget of the meter animation
    ///
    /// The actual budget shrinks as the meter fills:
    /// `base / (1 + 10.2857 * perc)`, at least one frame.
    pub meter_base_frames: u32,

    /// Seconds the chosen consequence is flashed after a correct trial
    pub consequence_flash_secs: f32,

    // === SESSION LAYOUT ===
    /// Seconds the first training scenario stays on screen
    pub first_scenario_secs: f32,

    /// Seconds the remaining training scenarios stay on screen
    pub scenario_secs: f32,

    /// Trial count after which the assessment break is shown
    pub assessment_break_after: usize,

    /// Trial counts after which training scenario breaks are shown
    pub training_breaks: [usize; 3],
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            // Joystick bands (baseline +-0.1, then 0.2 wide up to 0.9)
            baseline_half_width: 0.1,
            stage_band_width: 0.2,
            stage_band_count: 4,
            terminal_threshold: 0.95,
            centered_radius: 0.095,
            wrong_direction_threshold: 0.2,

            // Stimulus
            stimulus_scale_divisor: 1.4,
            hint_delay_secs: 5.0,
            frames_per_second: 60.0,

            // Feedback
            assessment_trials: 120,
            assessment_meter_start: 0.5,
            assessment_feedback_interval: 1,
            training_trials: 240,
            training_feedback_interval: 10,
            meter_base_frames: 50,
            consequence_flash_secs: 0.15,

            // Layout
            first_scenario_secs: 120.0,
            scenario_secs: 30.0,
            assessment_break_after: 60,
            training_breaks: [60, 120, 180],
        }
    }
}

impl ExperimentConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Outer edge of the last band on either side
    pub fn outer_band_edge(&self) -> f32 {
        self.baseline_half_width + self.stage_band_width * self.stage_band_count as f32
    }

    /// Meter increment for one assessment trial
    pub fn assessment_increment(&self) -> f32 {
        1.0 / self.assessment_trials as f32
    }

    /// Meter increment for one training trial
    pub fn training_increment(&self) -> f32 {
        1.0 / self.training_trials as f32
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.stage_band_count == 0 {
            return Err("stage_band_count must be at least 1".into());
        }

        // The terminal threshold must lie beyond every logged band
        if self.terminal_threshold <= self.outer_band_edge() {
            return Err(format!(
                "terminal_threshold ({}) must exceed the outer band edge ({:.2})",
                self.terminal_threshold,
                self.outer_band_edge()
            ));
        }

        if self.terminal_threshold > 1.0 {
            return Err(format!(
                "terminal_threshold ({}) is unreachable for a unit joystick axis",
                self.terminal_threshold
            ));
        }

        if self.centered_radius <= 0.0 || self.centered_radius > self.baseline_half_width {
            return Err(format!(
                "centered_radius ({}) must be positive and inside the baseline band ({})",
                self.centered_radius, self.baseline_half_width
            ));
        }

        if self.assessment_feedback_interval == 0 || self.training_feedback_interval == 0 {
            return Err("Feedback intervals must be at least 1".into());
        }

        if self.assessment_trials == 0 || self.training_trials == 0 {
            return Err("Trial counts for meter increments must be positive".into());
        }

        if self.frames_per_second <= 0.0 || self.stimulus_scale_divisor <= 0.0 {
            return Err("frames_per_second and stimulus_scale_divisor must be positive".into());
        }

        Ok(())
    }
}

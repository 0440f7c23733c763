//! AAT Trainer - multi-session approach-avoidance training
//!
//! Participants push alcohol-related images away and pull others closer with
//! a joystick. The crate assigns conditions, generates the six session trial
//! lists, runs sessions through a pluggable frontend and writes one
//! tab-separated log per session.

pub mod condition;
pub mod core;
pub mod experiment;
pub mod feedback;
pub mod frontend;
pub mod language;
pub mod participant;
pub mod sections;
pub mod session;
pub mod settings;
pub mod stimuli;
pub mod trial;

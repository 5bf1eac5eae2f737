//! Parameters structure for GaitCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::WalkingStyle;
use crate::body_frame::BodyFrame;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for gait control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    // ---- TIMING ----
    /// Delay between two control cycles, also used between the steps of the
    /// startup sequence.
    ///
    /// Units: milliseconds
    pub cycle_period_ms: u64,

    // ---- STEPPING ----
    /// Height a foot is raised to when it steps.
    ///
    /// Units: millimetres
    pub step_height_mm: f64,

    /// Once a grounded foot has drifted this far from its rest centre it is
    /// selected to step.
    ///
    /// Units: millimetres
    pub min_step_distance_mm: f64,

    /// Body height applied to all legs at construction.
    ///
    /// Units: millimetres
    pub initial_body_height_mm: f64,

    /// Walking style in use at construction.
    pub walking_style: WalkingStyle,

    // ---- GEOMETRY ----
    pub geometry: BodyFrame,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            cycle_period_ms: 100,
            step_height_mm: 40.0,
            min_step_distance_mm: 30.0,
            initial_body_height_mm: 60.0,
            walking_style: WalkingStyle::default(),
            geometry: BodyFrame::default(),
        }
    }
}

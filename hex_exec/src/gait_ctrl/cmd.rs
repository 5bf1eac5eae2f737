//! Commands passed into GaitCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{body_frame::LegId, vec2::Vec2};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The motion demanded of the platform.
///
/// The control loop takes a copy of the whole command at the start of every
/// cycle, so a cycle never sees half of an update.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PlatformCommand {
    /// Displacement of the body over the planted feet per cycle.
    ///
    /// Units: millimetres/cycle
    pub velocity: Vec2,

    /// Rotation of the body about its centre per cycle.
    ///
    /// Units: degrees/cycle
    pub rotation_rate_deg: f64,

    /// Height of the leg roots above the ground.
    ///
    /// Units: millimetres
    pub body_height_mm: f64,

    /// How many legs may step at the same time.
    pub walking_style: WalkingStyle,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Which legs are lifted together when a step is taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalkingStyle {
    /// Only the leg that drifted furthest steps.
    OneLeg,
    /// The leg that drifted furthest and its diagonal partner step.
    TwoLegs,
    /// The whole tripod containing the leg that drifted furthest steps.
    ThreeLegs,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WalkingStyle {
    /// The set of legs to lift when `selected` needs to step.
    pub fn legs_to_raise(self, selected: LegId) -> Vec<LegId> {
        match self {
            WalkingStyle::OneLeg => vec![selected],
            WalkingStyle::TwoLegs => vec![selected, selected.diagonal()],
            WalkingStyle::ThreeLegs => {
                let parity = selected.index() % 2;
                LegId::ALL
                    .iter()
                    .copied()
                    .filter(|l| l.index() % 2 == parity)
                    .collect()
            }
        }
    }
}

impl Default for WalkingStyle {
    fn default() -> Self {
        WalkingStyle::OneLeg
    }
}

impl Default for PlatformCommand {
    fn default() -> Self {
        Self {
            velocity: Vec2::default(),
            rotation_rate_deg: 0.0,
            body_height_mm: 60.0,
            walking_style: WalkingStyle::default(),
        }
    }
}

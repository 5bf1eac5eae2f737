//! The gait engine, which owns the legs and runs one control cycle at a time

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use serde::Serialize;
use std::sync::Arc;

// Internal
use super::{Params, PlatformCommand, WalkingStyle};
use crate::{
    body_frame::{LegId, NUM_LEGS},
    eqpt::ServoSink,
    leg::{Joint, JointAngles, Leg, LegError},
};
use util::module::State;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Joint-space pose used for transport, as (femur, tibia, coxa).
///
/// Units: degrees
pub const PARK_POSE_DEG: [f64; 3] = [180.0, 0.0, 0.0];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// All six legs plus the stepping policy.
///
/// The engine is only ever driven from behind the controller's lock, so it
/// has no synchronisation of its own.
#[derive(Debug)]
pub struct GaitEngine {
    legs: Vec<Leg>,

    min_step_distance_mm: f64,
}

/// Status report for one control cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct StatusReport {
    /// Legs which were off the ground at the start of the cycle.
    pub airborne: [bool; NUM_LEGS],

    /// Legs which started a step during the cycle.
    pub lifted: [bool; NUM_LEGS],

    /// Legs whose target could not be solved, no demands were sent for them.
    pub unreachable: [bool; NUM_LEGS],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GaitEngine {
    pub fn new(params: &Params, servo: Arc<dyn ServoSink>) -> Self {
        let frame = Arc::new(params.geometry.clone());

        let legs = LegId::ALL
            .iter()
            .map(|id| {
                Leg::new(
                    *id,
                    frame.clone(),
                    servo.clone(),
                    params.step_height_mm,
                    params.initial_body_height_mm,
                )
            })
            .collect();

        Self {
            legs,
            min_step_distance_mm: params.min_step_distance_mm,
        }
    }

    pub fn leg(&self, id: LegId) -> &Leg {
        &self.legs[id.index()]
    }

    pub fn leg_mut(&mut self, id: LegId) -> &mut Leg {
        &mut self.legs[id.index()]
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn any_airborne(&self) -> bool {
        self.legs.iter().any(Leg::is_airborne)
    }

    /// Apply a new body height to every leg and immediately resolve all
    /// joints.
    pub fn set_body_height(&mut self, body_height_mm: f64) -> [bool; NUM_LEGS] {
        for leg in self.legs.iter_mut() {
            leg.set_body_height(body_height_mm);
        }
        self.recompute_all()
    }

    /// Solve and send the joints of a single leg.
    ///
    /// An unreachable target is logged and reported as `false`, it is never
    /// allowed to stop the caller.
    pub fn recompute_leg(&mut self, id: LegId) -> bool {
        match self.leg_mut(id).recompute_joint_angles() {
            Ok(_) => true,
            Err(e) => {
                warn!("{}", e);
                false
            }
        }
    }

    /// Solve and send the joints of every leg, returning which legs were
    /// unreachable.
    pub fn recompute_all(&mut self) -> [bool; NUM_LEGS] {
        let mut unreachable = [false; NUM_LEGS];
        for id in LegId::ALL.iter() {
            unreachable[id.index()] = !self.recompute_leg(*id);
        }
        unreachable
    }

    /// Find the grounded leg which has drifted furthest from its rest centre,
    /// if that drift has reached the step threshold.
    pub fn select_leg_to_raise(&self) -> Option<LegId> {
        let (id, distance) = self
            .legs
            .iter()
            .map(|l| (l.id(), l.distance_from_center()))
            .fold(None, |best: Option<(LegId, f64)>, (id, d)| match best {
                Some((_, best_d)) if best_d >= d => best,
                _ => Some((id, d)),
            })?;

        if distance >= self.min_step_distance_mm {
            Some(id)
        } else {
            None
        }
    }

    /// Lift the legs the walking style pairs with `selected`, each aiming
    /// for its own rest centre.
    pub fn raise(&mut self, selected: LegId, style: WalkingStyle) -> Result<Vec<LegId>, LegError> {
        let legs = style.legs_to_raise(selected);

        for id in legs.iter() {
            let leg = self.leg_mut(*id);
            let target = leg.rest_centre();
            leg.begin_lift(target)?;
        }

        debug!("Stepping {:?} ({:?}, selected {})", legs, style, selected);

        Ok(legs)
    }

    /// Drive every joint to the transport pose, bypassing the kinematics.
    pub fn park(&self) {
        for leg in self.legs.iter() {
            for joint in Joint::ALL.iter() {
                leg.set_joint_angle(*joint, PARK_POSE_DEG[*joint as usize]);
            }
        }
    }

    /// Put every foot down where it is and resolve the joints.
    pub fn settle(&mut self) -> [bool; NUM_LEGS] {
        for leg in self.legs.iter_mut() {
            leg.lower();
        }
        self.recompute_all()
    }

    /// Last solved joint angles of every leg.
    pub fn joint_angles(&self) -> [JointAngles; NUM_LEGS] {
        let mut out = [JointAngles::default(); NUM_LEGS];
        for leg in self.legs.iter() {
            out[leg.id().index()] = leg.joint_angles();
        }
        out
    }
}

impl State for GaitEngine {
    type InputData = PlatformCommand;
    type OutputData = [JointAngles; NUM_LEGS];
    type StatusReport = StatusReport;
    type ProcError = LegError;

    /// Run one steady-state walking cycle.
    ///
    /// Raised feet advance through their step, planted feet are carried by
    /// the commanded velocity and rotation. Once every foot is down the
    /// furthest drifted leg (and its partners under the walking style) may
    /// be lifted. All joints are then resolved and sent.
    fn proc(
        &mut self,
        cmd: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let mut report = StatusReport::default();

        for leg in self.legs.iter_mut() {
            if leg.is_airborne() {
                report.airborne[leg.id().index()] = true;
                leg.advance_airborne_motion();
            } else {
                leg.add_global_offset(cmd.velocity.x, cmd.velocity.y);
                leg.rotate_about_body_center(cmd.rotation_rate_deg);
            }
        }

        // Only consider a new step once all six feet were down
        if !report.airborne.iter().any(|a| *a) {
            if let Some(selected) = self.select_leg_to_raise() {
                for id in self.raise(selected, cmd.walking_style)? {
                    report.lifted[id.index()] = true;
                }
            }
        }

        report.unreachable = self.recompute_all();

        trace!("GaitEngine status: {:?}", report);

        Ok((self.joint_angles(), report))
    }
}

//! Implementations for the Leg state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use std::sync::Arc;

// Internal
use super::*;
use crate::{
    body_frame::{BodyFrame, LegMount},
    eqpt::ServoSink,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single leg of the platform.
pub struct Leg {
    id: LegId,

    frame: Arc<BodyFrame>,
    mount: LegMount,

    servo: Arc<dyn ServoSink>,

    /// Foot target in the leg's local frame.
    local_position: Vec2,

    /// How far the foot is lifted off the ground, zero when planted.
    height_above_ground: f64,

    /// How far the leg root is above the ground.
    body_height: f64,

    /// Height the foot is raised to when stepping.
    step_height: f64,

    rest_centre: Vec2,

    motion_state: MotionState,

    /// Ground point the foot swings to while raised.
    pending_target: Option<Vec2>,

    joint_angles: JointAngles,
}

/// A foot position in the leg's local frame together with its lift.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroundContact {
    pub x: f64,
    pub y: f64,
    pub height: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Leg {
    /// Create a new leg, planted at the origin of its local frame.
    pub fn new(
        id: LegId,
        frame: Arc<BodyFrame>,
        servo: Arc<dyn ServoSink>,
        step_height: f64,
        body_height: f64,
    ) -> Self {
        let mount = frame.mount(id);
        let rest_centre = frame.rest_centre(id);

        debug!(
            "{} leg created, rest centre ({}, {})",
            id, rest_centre.x, rest_centre.y
        );

        Self {
            id,
            frame,
            mount,
            servo,
            local_position: Vec2::default(),
            height_above_ground: 0.0,
            body_height,
            step_height,
            rest_centre,
            motion_state: MotionState::OnGround,
            pending_target: None,
            joint_angles: JointAngles::default(),
        }
    }

    // ---- ACCESSORS ----

    pub fn id(&self) -> LegId {
        self.id
    }

    pub(crate) fn frame(&self) -> &BodyFrame {
        &self.frame
    }

    pub(crate) fn servo(&self) -> &dyn ServoSink {
        self.servo.as_ref()
    }

    pub fn local_position(&self) -> Vec2 {
        self.local_position
    }

    pub fn height_above_ground(&self) -> f64 {
        self.height_above_ground
    }

    pub fn body_height(&self) -> f64 {
        self.body_height
    }

    pub fn set_body_height(&mut self, body_height: f64) {
        self.body_height = body_height;
    }

    pub fn rest_centre(&self) -> Vec2 {
        self.rest_centre
    }

    pub fn set_rest_centre(&mut self, rest_centre: Vec2) {
        self.rest_centre = rest_centre;
    }

    pub fn motion_state(&self) -> MotionState {
        self.motion_state
    }

    pub fn is_airborne(&self) -> bool {
        self.motion_state != MotionState::OnGround
    }

    pub fn pending_target(&self) -> Option<Vec2> {
        self.pending_target
    }

    /// Last successfully solved joint angles.
    pub fn joint_angles(&self) -> JointAngles {
        self.joint_angles
    }

    pub(crate) fn set_joint_angles(&mut self, angles: JointAngles) {
        self.joint_angles = angles;
    }

    /// Direction the leg points in the body frame.
    ///
    /// Units: degrees
    pub fn heading_deg(&self) -> f64 {
        self.id.heading_deg()
    }

    // ---- POSITIONING ----

    /// Overwrite the foot target. Reachability is not checked.
    pub fn set_local_target(&mut self, x: f64, y: f64) {
        self.local_position = Vec2::new(x, y);
    }

    /// Move the foot target by a displacement given in the body frame.
    ///
    /// The X component is subtracted, so a positive displacement carries the
    /// body forward over the planted foot. The Y component is added on the
    /// right side and subtracted on the mirrored left side.
    pub fn add_global_offset(&mut self, dx: f64, dy: f64) {
        self.local_position.x -= dx;
        if self.mount.mirrored {
            self.local_position.y -= dy;
        } else {
            self.local_position.y += dy;
        }
    }

    /// Set the foot target and its lift together.
    pub fn set_ground_contact(&mut self, contact: GroundContact) {
        self.set_local_target(contact.x, contact.y);
        self.height_above_ground = contact.height;
    }

    pub fn ground_contact(&self) -> GroundContact {
        GroundContact {
            x: self.local_position.x,
            y: self.local_position.y,
            height: self.height_above_ground,
        }
    }

    /// True when the foot target is within [`CENTRE_TOLERANCE_MM`] of the
    /// rest centre on both axes.
    pub fn is_centered(&self) -> bool {
        (self.local_position.x - self.rest_centre.x).abs() < CENTRE_TOLERANCE_MM
            && (self.local_position.y - self.rest_centre.y).abs() < CENTRE_TOLERANCE_MM
    }

    pub fn distance_from_center(&self) -> f64 {
        Vec2::distance(self.local_position, self.rest_centre)
    }

    /// Move the foot target back to the rest centre. Height and state are
    /// unchanged.
    pub fn recenter(&mut self) {
        self.local_position = self.rest_centre;
    }

    // ---- FRAMES ----

    pub fn local_to_global(&self, local: Vec2) -> Vec2 {
        self.mount.local_to_global(local)
    }

    pub fn global_to_local(&self, global: Vec2) -> Vec2 {
        self.mount.global_to_local(global)
    }

    /// Rotate the foot target about the body centre.
    pub fn rotate_about_body_center(&mut self, angle_deg: f64) {
        let global = self.local_to_global(self.local_position).rotated(angle_deg);
        self.local_position = self.global_to_local(global);
    }

    // ---- STEP STATE MACHINE ----

    /// Raise the foot and remember where it should come down.
    pub fn begin_lift(&mut self, target: Vec2) -> Result<(), LegError> {
        self.lift(Some(target))
    }

    /// Raise the foot without a new ground point, used when repositioning
    /// before walking.
    pub fn begin_lift_in_place(&mut self) -> Result<(), LegError> {
        self.lift(None)
    }

    /// Put the foot down wherever it is.
    pub fn lower(&mut self) {
        self.height_above_ground = 0.0;
        self.motion_state = MotionState::OnGround;
        self.pending_target = None;
    }

    /// Advance a raised foot by one step of the state machine. Does nothing
    /// for a planted foot.
    pub fn advance_airborne_motion(&mut self) {
        match self.motion_state {
            MotionState::OnGround => (),
            MotionState::MovingUp => {
                if let Some(target) = self.pending_target.take() {
                    self.local_position = target;
                }
                self.motion_state = MotionState::MovingToTarget;
            }
            MotionState::MovingToTarget => {
                self.height_above_ground = 0.0;
                self.motion_state = MotionState::OnGround;
                debug!("{} leg touched down", self.id);
            }
        }
    }

    // ---- DIRECT JOINT CONTROL ----

    /// Send a joint-space angle straight to one servo, bypassing the
    /// kinematics. The stored joint angles are not updated.
    pub fn set_joint_angle(&self, joint: Joint, angle_deg: f64) {
        self.servo.set_angle(
            self.id.motor_index(joint as usize),
            joint.to_servo_deg(angle_deg, self.frame.coxa_mount_offset_deg),
        );
    }

    fn lift(&mut self, target: Option<Vec2>) -> Result<(), LegError> {
        if self.motion_state != MotionState::OnGround {
            return Err(LegError::InvalidState {
                leg: self.id,
                state: self.motion_state,
            });
        }

        self.pending_target = target;
        self.height_above_ground = self.step_height;
        self.motion_state = MotionState::MovingUp;

        debug!("{} leg lifted", self.id);

        Ok(())
    }
}

impl std::fmt::Debug for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Leg")
            .field("id", &self.id)
            .field("local_position", &self.local_position)
            .field("height_above_ground", &self.height_above_ground)
            .field("body_height", &self.body_height)
            .field("rest_centre", &self.rest_centre)
            .field("motion_state", &self.motion_state)
            .field("pending_target", &self.pending_target)
            .field("joint_angles", &self.joint_angles)
            .finish()
    }
}

//! # Hexapod library.
//!
//! This library allows other crates in the workspace, and the `hex_exec`
//! binary, to access the hexapod's kinematics and gait control.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Body frame - segment lengths, leg mounting offsets and the leg index table
pub mod body_frame;

/// Equipment interfaces - servo demands and loop timing
pub mod eqpt;

/// Gait control module - runs the walking loop over all six legs
pub mod gait_ctrl;

/// Leg module - per leg state machine and inverse kinematics
pub mod leg;

/// Two dimensional vectors
pub mod vec2;

//! # Equipment interfaces
//!
//! The gait controller talks to the hardware through two collaborators: a
//! servo sink which receives one angle demand per joint, and a delay used to
//! pace the control loop. Both are infallible from the controller's point of
//! view, any driver errors must be handled inside the implementation.
//!
//! Closures of the right shape implement both traits, so callers can pass
//! `|motor, angle| ...` and `|ms| ...` directly.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use std::{thread, time::Duration};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Receives joint angle demands.
pub trait ServoSink: Send + Sync {
    /// Demand the servo with index `motor` (leg index * 3 + joint) move to
    /// `angle_deg`.
    fn set_angle(&self, motor: usize, angle_deg: f64);
}

/// Blocking delay used between control steps.
pub trait Delay: Send + Sync {
    /// Block the calling thread for `ms` milliseconds.
    fn sleep_ms(&self, ms: u64);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Delay backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

/// Servo sink which only logs the demands, for running without hardware.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogServoSink;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<F> ServoSink for F
where
    F: Fn(usize, f64) + Send + Sync,
{
    fn set_angle(&self, motor: usize, angle_deg: f64) {
        self(motor, angle_deg)
    }
}

impl<F> Delay for F
where
    F: Fn(u64) + Send + Sync,
{
    fn sleep_ms(&self, ms: u64) {
        self(ms)
    }
}

impl Delay for ThreadDelay {
    fn sleep_ms(&self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

impl ServoSink for LogServoSink {
    fn set_angle(&self, motor: usize, angle_deg: f64) {
        trace!("Servo {:2} -> {:8.3} deg", motor, angle_deg);
    }
}

//! Main hexapod executable entry point.
//!
//! # Architecture
//!
//! The executable:
//!
//!     - Starts a session and the logger
//!     - Loads the gait control parameters
//!     - Parks the legs, then starts the walking loop
//!     - Walks forward for a while, then stops, joins and parks again
//!
//! No motor driver is attached, servo demands are written to the log at
//! trace level.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::info;
use std::{sync::Arc, thread, time::Duration};

// Internal
use hex_lib::{
    eqpt::{LogServoSink, ThreadDelay},
    gait_ctrl::GaitCtrl,
    vec2::Vec2,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// How long the demo walk lasts.
const WALK_DURATION: Duration = Duration::from_secs(10);

/// Forward speed of the demo walk.
///
/// Units: millimetres/cycle
const WALK_SPEED_MM: f64 = 5.0;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("hex_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    info!("Hexapod Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- MODULE INIT ----

    let gait_ctrl = GaitCtrl::from_param_file(
        "gait_ctrl.toml",
        Arc::new(LogServoSink),
        Arc::new(ThreadDelay),
    )
    .wrap_err("Failed to initialise GaitCtrl")?;

    info!("GaitCtrl init complete");

    // ---- WALK ----

    gait_ctrl.park().wrap_err("Failed to park the legs")?;

    gait_ctrl.start().wrap_err("Failed to start GaitCtrl")?;

    gait_ctrl
        .set_velocity(Vec2::new(WALK_SPEED_MM, 0.0))
        .wrap_err("Failed to set the walking velocity")?;

    thread::sleep(WALK_DURATION);

    gait_ctrl
        .set_velocity(Vec2::default())
        .wrap_err("Failed to clear the walking velocity")?;

    // ---- SHUTDOWN ----

    gait_ctrl.stop()?;
    gait_ctrl.join().wrap_err("GaitCtrl worker failed")?;

    gait_ctrl.settle()?;
    gait_ctrl.park().wrap_err("Failed to park the legs")?;

    info!("End of execution");

    Ok(())
}

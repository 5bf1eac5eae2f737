//! # Gait Control
//!
//! [`GaitCtrl`] owns the six legs and the platform command, and runs the
//! walking loop on a background worker thread.
//!
//! Every leg mutation, whether made by the worker or by an external setter,
//! happens under the engine mutex, and the command is read by the worker as
//! a single snapshot at the start of each cycle. The worker is started with
//! [`GaitCtrl::start`], asked to exit with [`GaitCtrl::stop`] and awaited
//! with [`GaitCtrl::join`]. Dropping the controller stops and joins it.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod engine;
mod params;
mod worker;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, info};
use std::{
    convert::TryFrom,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
    thread::{self, JoinHandle},
};

// Internal
use crate::{
    body_frame::LegId,
    eqpt::{Delay, ServoSink},
    leg::{GroundContact, JointAngles, LegError, MotionState},
    vec2::Vec2,
};
use util::params::LoadError;
use worker::worker_thread;

pub use cmd::*;
pub use engine::*;
pub use params::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The gait controller.
pub struct GaitCtrl {
    shared: Arc<Shared>,

    worker: Mutex<Option<Worker>>,
}

/// State shared between the controller and its worker.
struct Shared {
    params: Params,

    cmd: RwLock<PlatformCommand>,
    engine: Mutex<GaitEngine>,

    delay: Arc<dyn Delay>,
}

/// A spawned worker and the token used to stop it.
struct Worker {
    stop: Arc<AtomicBool>,
    jh: JoinHandle<Result<(), GaitCtrlError>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GaitCtrlError {
    #[error("Leg error: {0}")]
    LegError(#[from] LegError),

    #[error("Couldn't load parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Sync primitive is poisoned")]
    PoisonError,

    #[error("The worker thread panicked")]
    WorkerPanicked,

    #[error("Couldn't spawn the worker thread: {0}")]
    SpawnError(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GaitCtrl {
    /// Create a new controller. The worker is not started.
    pub fn new(params: Params, servo: Arc<dyn ServoSink>, delay: Arc<dyn Delay>) -> Self {
        let engine = GaitEngine::new(&params, servo);

        let cmd = PlatformCommand {
            body_height_mm: params.initial_body_height_mm,
            walking_style: params.walking_style,
            ..Default::default()
        };

        Self {
            shared: Arc::new(Shared {
                params,
                cmd: RwLock::new(cmd),
                engine: Mutex::new(engine),
                delay,
            }),
            worker: Mutex::new(None),
        }
    }

    /// Create a new controller from a parameter file in `$HEX_SW_ROOT/params`.
    pub fn from_param_file(
        path: &str,
        servo: Arc<dyn ServoSink>,
        delay: Arc<dyn Delay>,
    ) -> Result<Self, GaitCtrlError> {
        let params = util::params::load(path)?;
        Ok(Self::new(params, servo, delay))
    }

    pub fn params(&self) -> &Params {
        &self.shared.params
    }

    // ---- COMMAND ----

    pub fn set_velocity(&self, velocity: Vec2) -> Result<(), GaitCtrlError> {
        self.shared.cmd.write()?.velocity = velocity;
        Ok(())
    }

    pub fn set_rotation_rate(&self, rotation_rate_deg: f64) -> Result<(), GaitCtrlError> {
        self.shared.cmd.write()?.rotation_rate_deg = rotation_rate_deg;
        Ok(())
    }

    /// Set the velocity and rotation rate as one update, so no cycle sees
    /// only one of them.
    pub fn set_velocity_and_rotation(
        &self,
        velocity: Vec2,
        rotation_rate_deg: f64,
    ) -> Result<(), GaitCtrlError> {
        let mut cmd = self.shared.cmd.write()?;
        cmd.velocity = velocity;
        cmd.rotation_rate_deg = rotation_rate_deg;
        Ok(())
    }

    /// Set the body height and resolve every leg immediately, without waiting
    /// for the next cycle.
    pub fn set_body_height(&self, body_height_mm: f64) -> Result<(), GaitCtrlError> {
        // Engine then command, the worker never holds both
        let mut engine = self.shared.engine.lock()?;
        self.shared.cmd.write()?.body_height_mm = body_height_mm;
        engine.set_body_height(body_height_mm);
        Ok(())
    }

    pub fn body_height(&self) -> Result<f64, GaitCtrlError> {
        Ok(self.shared.cmd.read()?.body_height_mm)
    }

    pub fn set_walking_style(&self, style: WalkingStyle) -> Result<(), GaitCtrlError> {
        self.shared.cmd.write()?.walking_style = style;
        Ok(())
    }

    /// Copy of the current platform command.
    pub fn command(&self) -> Result<PlatformCommand, GaitCtrlError> {
        Ok(*self.shared.cmd.read()?)
    }

    // ---- LEGS ----

    /// Override one leg's foot target, optionally raising the foot there.
    ///
    /// A raised foot is put back down by the walking loop. Intended for
    /// calibration, not for use while walking.
    pub fn set_leg_local_target(
        &self,
        leg_index: usize,
        x: f64,
        y: f64,
        lift: bool,
    ) -> Result<(), GaitCtrlError> {
        let id = LegId::try_from(leg_index).map_err(LegError::from)?;
        let mut engine = self.shared.engine.lock()?;

        // Lift first so a refused lift leaves the leg untouched
        let leg = engine.leg_mut(id);
        if lift {
            leg.begin_lift_in_place()?;
        }
        leg.set_local_target(x, y);

        engine.recompute_leg(id);

        Ok(())
    }

    /// Change the rest centre of a leg, the point it steps back to.
    pub fn set_leg_rest_center(&self, leg_index: usize, x: f64, y: f64) -> Result<(), GaitCtrlError> {
        let id = LegId::try_from(leg_index).map_err(LegError::from)?;
        self.shared
            .engine
            .lock()?
            .leg_mut(id)
            .set_rest_centre(Vec2::new(x, y));
        Ok(())
    }

    pub fn leg_rest_center(&self, leg_index: usize) -> Result<Vec2, GaitCtrlError> {
        let id = LegId::try_from(leg_index).map_err(LegError::from)?;
        Ok(self.shared.engine.lock()?.leg(id).rest_centre())
    }

    /// Last solved joint angles of a leg.
    pub fn joint_angles(&self, leg_index: usize) -> Result<JointAngles, GaitCtrlError> {
        let id = LegId::try_from(leg_index).map_err(LegError::from)?;
        Ok(self.shared.engine.lock()?.leg(id).joint_angles())
    }

    pub fn leg_motion_state(&self, leg_index: usize) -> Result<MotionState, GaitCtrlError> {
        let id = LegId::try_from(leg_index).map_err(LegError::from)?;
        Ok(self.shared.engine.lock()?.leg(id).motion_state())
    }

    pub fn leg_ground_contact(&self, leg_index: usize) -> Result<GroundContact, GaitCtrlError> {
        let id = LegId::try_from(leg_index).map_err(LegError::from)?;
        Ok(self.shared.engine.lock()?.leg(id).ground_contact())
    }

    /// Drive every joint to the transport pose.
    pub fn park(&self) -> Result<(), GaitCtrlError> {
        self.shared.engine.lock()?.park();
        info!("Legs parked");
        Ok(())
    }

    /// Put every foot down where it is, used once motion has ended.
    pub fn settle(&self) -> Result<(), GaitCtrlError> {
        self.shared.engine.lock()?.settle();
        Ok(())
    }

    // ---- WORKER ----

    /// Start the walking loop. Does nothing if it is already running.
    pub fn start(&self) -> Result<(), GaitCtrlError> {
        let mut worker = self.worker.lock()?;

        if let Some(w) = worker.as_ref() {
            if w.is_running() {
                return Ok(());
            }
        }

        // A previous worker that was stopped but never joined is reaped first
        if let Some(old) = worker.take() {
            if let Err(e) = old.join() {
                error!("Previous GaitCtrl worker exited with an error: {}", e);
            }
        }

        let stop = Arc::new(AtomicBool::new(false));
        let shared = self.shared.clone();
        let worker_stop = stop.clone();

        let jh = thread::Builder::new()
            .name("gait_ctrl::worker".into())
            .spawn(move || worker_thread(shared, worker_stop))
            .map_err(GaitCtrlError::SpawnError)?;

        *worker = Some(Worker { stop, jh });

        info!("GaitCtrl started");

        Ok(())
    }

    /// Ask the walking loop to exit. The current cycle is completed first, so
    /// one more set of demands may still be sent.
    pub fn stop(&self) -> Result<(), GaitCtrlError> {
        if let Some(w) = self.worker.lock()?.as_ref() {
            w.stop.store(true, Ordering::SeqCst);
            info!("GaitCtrl stop requested");
        }
        Ok(())
    }

    pub fn is_running(&self) -> Result<bool, GaitCtrlError> {
        Ok(self
            .worker
            .lock()?
            .as_ref()
            .map(Worker::is_running)
            .unwrap_or(false))
    }

    /// Stop the walking loop and wait for it to exit, returning the worker's
    /// result.
    pub fn join(&self) -> Result<(), GaitCtrlError> {
        let worker = self.worker.lock()?.take();

        match worker {
            Some(w) => {
                w.stop.store(true, Ordering::SeqCst);
                w.join()
            }
            None => Ok(()),
        }
    }
}

impl Worker {
    fn is_running(&self) -> bool {
        !self.stop.load(Ordering::SeqCst) && !self.jh.is_finished()
    }

    fn join(self) -> Result<(), GaitCtrlError> {
        self.jh.join().map_err(|_| GaitCtrlError::WorkerPanicked)?
    }
}

impl Drop for GaitCtrl {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            error!("GaitCtrl worker exited with an error: {}", e);
        }
    }
}

impl std::fmt::Debug for GaitCtrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaitCtrl")
            .field("params", &self.shared.params)
            .field("cmd", &self.shared.cmd)
            .field("engine", &self.shared.engine)
            .finish()
    }
}

impl From<LoadError> for GaitCtrlError {
    fn from(e: LoadError) -> Self {
        Self::ParamLoadError(e)
    }
}

impl<G> From<PoisonError<G>> for GaitCtrlError {
    fn from(_: PoisonError<G>) -> Self {
        Self::PoisonError
    }
}

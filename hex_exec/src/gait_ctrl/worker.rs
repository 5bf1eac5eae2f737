//! Background control loop of GaitCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, info, warn};
use util::module::State;

use super::{GaitCtrlError, Shared};
use crate::body_frame::LegId;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Body of the worker thread.
///
/// Walks every leg to its rest centre then runs the step cycle once per
/// period until `stop` is raised. The engine lock is released before every
/// delay so external setters are never held up for a whole period.
pub(super) fn worker_thread(shared: Arc<Shared>, stop: Arc<AtomicBool>) -> Result<(), GaitCtrlError> {
    info!("GaitCtrl worker started");

    prepare_to_walk(&shared, &stop)?;

    while !stop.load(Ordering::SeqCst) {
        // Take the whole command at once so a cycle never sees a partial update
        let cmd = *shared.cmd.read()?;

        {
            let mut engine = shared.engine.lock()?;
            if let Err(e) = engine.proc(&cmd) {
                warn!("GaitCtrl cycle failed: {}", e);
            }
        }

        shared.delay.sleep_ms(shared.params.cycle_period_ms);
    }

    info!("GaitCtrl worker stopped");

    Ok(())
}

/// Bring each leg in turn to its rest centre, one leg at a time.
fn prepare_to_walk(shared: &Shared, stop: &AtomicBool) -> Result<(), GaitCtrlError> {
    let period = shared.params.cycle_period_ms;

    for id in LegId::ALL.iter() {
        if stop.load(Ordering::SeqCst) {
            debug!("Stop requested during startup, {} leg onwards not prepared", id);
            return Ok(());
        }

        let centred = shared.engine.lock()?.leg(*id).is_centered();

        if !centred {
            {
                let mut engine = shared.engine.lock()?;
                let leg = engine.leg_mut(*id);
                if !leg.is_airborne() {
                    leg.begin_lift_in_place()?;
                }
            }
            shared.delay.sleep_ms(period);

            shared.engine.lock()?.leg_mut(*id).recenter();
            shared.delay.sleep_ms(period);

            shared.engine.lock()?.recompute_leg(*id);
            shared.delay.sleep_ms(period);
        }

        {
            let mut engine = shared.engine.lock()?;
            engine.leg_mut(*id).lower();
            engine.recompute_leg(*id);
        }
        shared.delay.sleep_ms(period);
        shared.delay.sleep_ms(period);

        debug!("{} leg prepared", id);
    }

    Ok(())
}

//! Tests of the gait controller's worker lifecycle and end-to-end output.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::{channel, Sender},
        Arc, Barrier, Mutex,
    },
    thread::{self, ThreadId},
    time::{Duration, Instant},
};

use hex_lib::{
    body_frame::{InvalidLegIndexError, LegId},
    gait_ctrl::{GaitCtrl, GaitCtrlError, Params},
    leg::{solve, LegError, MotionState},
    vec2::Vec2,
};

/// Delays the worker makes before its first walking cycle, with every leg
/// starting away from its rest centre.
const STARTUP_DELAYS: usize = 6 * 5;

const TIMEOUT: Duration = Duration::from_secs(10);

/// Servo demands of a (0, 100) foot on the ground with body height 50.
const GOLDEN_0_100_H50: [f64; 3] = [149.5816312785, 146.7209684508, 90.0];

type Demands = Arc<Mutex<Vec<(ThreadId, usize, f64)>>>;

struct Harness {
    ctrl: GaitCtrl,
    demands: Demands,
    delays: Arc<AtomicUsize>,

    /// Releases a worker blocked in a stepped delay, see [`Harness::stepped`].
    permits: Mutex<Option<Sender<()>>>,
}

impl Harness {
    /// Controller whose delays sleep for 1 ms.
    fn new(params: Params) -> Self {
        Self::build(params, None, || thread::sleep(Duration::from_millis(1)))
    }

    /// Controller whose delays block until the test releases them, so the
    /// worker can be advanced one delay at a time.
    fn stepped(params: Params) -> Self {
        let (tx, rx) = channel::<()>();
        let rx = Mutex::new(rx);

        // Once the sender is dropped every delay returns immediately
        Self::build(params, Some(tx), move || {
            let _ = rx.lock().unwrap().recv();
        })
    }

    fn build<W>(params: Params, permits: Option<Sender<()>>, wait: W) -> Self
    where
        W: Fn() + Send + Sync + 'static,
    {
        let demands: Demands = Arc::new(Mutex::new(Vec::new()));
        let delays = Arc::new(AtomicUsize::new(0));

        let sink = demands.clone();
        let servo = Arc::new(move |motor: usize, angle: f64| {
            sink.lock()
                .unwrap()
                .push((thread::current().id(), motor, angle));
        });

        let count = delays.clone();
        let delay = Arc::new(move |_ms: u64| {
            count.fetch_add(1, Ordering::SeqCst);
            wait();
        });

        Self {
            ctrl: GaitCtrl::new(params, servo, delay),
            demands,
            delays,
            permits: Mutex::new(permits),
        }
    }

    /// Block until the worker has made at least `n` delays.
    fn wait_for_delays(&self, n: usize) {
        let start = Instant::now();
        while self.delays.load(Ordering::SeqCst) < n {
            assert!(start.elapsed() < TIMEOUT, "worker did not make progress");
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Release a stepped worker until it is blocked in its `n`th delay.
    fn release_until(&self, n: usize) {
        self.wait_for_delays(1);
        while self.delays.load(Ordering::SeqCst) < n {
            let reached = self.delays.load(Ordering::SeqCst);
            if let Some(tx) = self.permits.lock().unwrap().as_ref() {
                tx.send(()).unwrap();
            }
            self.wait_for_delays(reached + 1);
        }
    }

    /// Let a stepped worker run freely, needed before it can be joined.
    fn open_gate(&self) {
        self.permits.lock().unwrap().take();
    }

    /// Last `n` demands sent.
    fn last_demands(&self, n: usize) -> Vec<(ThreadId, usize, f64)> {
        let demands = self.demands.lock().unwrap();
        assert!(demands.len() >= n);
        demands[demands.len() - n..].to_vec()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        // A stepped worker must be free to run before the controller joins it
        if let Ok(mut permits) = self.permits.lock() {
            permits.take();
        }
    }
}

fn centred_params() -> Params {
    let mut params = Params::default();
    params.geometry.rest_centres_mm = [[0.0, 100.0]; 6];
    params.initial_body_height_mm = 50.0;
    params
}

#[test]
fn test_end_to_end_no_drift() {
    let harness = Harness::new(centred_params());

    harness.ctrl.start().unwrap();
    harness.wait_for_delays(STARTUP_DELAYS + 2);
    harness.ctrl.join().unwrap();

    // The last demands sent come from a full walking cycle
    let demands = harness.demands.lock().unwrap();
    assert!(demands.len() >= 18);
    let last_cycle = &demands[demands.len() - 18..];

    let golden = GOLDEN_0_100_H50;
    for (i, (_, motor, angle)) in last_cycle.iter().enumerate() {
        assert_eq!(*motor, i);
        assert!(
            (angle - golden[motor % 3]).abs() < 1e-6,
            "motor {}: {} != {}",
            motor,
            angle,
            golden[motor % 3]
        );
    }

    for i in 0..6 {
        assert_eq!(harness.ctrl.leg_motion_state(i).unwrap(), MotionState::OnGround);
        let contact = harness.ctrl.leg_ground_contact(i).unwrap();
        assert_eq!((contact.x, contact.y, contact.height), (0.0, 100.0, 0.0));
    }
}

#[test]
fn test_start_twice_runs_one_worker() {
    let harness = Harness::new(centred_params());

    harness.ctrl.start().unwrap();
    harness.ctrl.start().unwrap();
    assert!(harness.ctrl.is_running().unwrap());

    harness.wait_for_delays(STARTUP_DELAYS + 5);
    harness.ctrl.join().unwrap();

    let threads: HashSet<ThreadId> = harness
        .demands
        .lock()
        .unwrap()
        .iter()
        .map(|d| d.0)
        .collect();
    assert_eq!(threads.len(), 1);
    assert!(!threads.contains(&thread::current().id()));
}

#[test]
fn test_stop_and_join() {
    let harness = Harness::new(centred_params());

    assert!(!harness.ctrl.is_running().unwrap());

    harness.ctrl.start().unwrap();
    harness.wait_for_delays(3);

    harness.ctrl.stop().unwrap();
    assert!(!harness.ctrl.is_running().unwrap());

    harness.ctrl.join().unwrap();

    // Nothing is sent once the worker has been joined
    let sent = harness.demands.lock().unwrap().len();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(harness.demands.lock().unwrap().len(), sent);

    // Joining again is harmless
    harness.ctrl.join().unwrap();
}

#[test]
fn test_restart_after_stop() {
    let harness = Harness::new(centred_params());

    harness.ctrl.start().unwrap();
    harness.wait_for_delays(2);
    harness.ctrl.stop().unwrap();

    harness.ctrl.start().unwrap();
    assert!(harness.ctrl.is_running().unwrap());

    harness.ctrl.join().unwrap();
    assert!(!harness.ctrl.is_running().unwrap());
}

#[test]
fn test_set_body_height_is_immediate() {
    let harness = Harness::new(Params::default());

    harness.ctrl.set_body_height(50.0).unwrap();

    assert_eq!(harness.ctrl.body_height().unwrap(), 50.0);
    assert_eq!(harness.demands.lock().unwrap().len(), 18);
    assert_eq!(harness.delays.load(Ordering::SeqCst), 0);
}

#[test]
fn test_velocity_and_rotation_update_together() {
    let harness = Harness::new(Params::default());

    harness
        .ctrl
        .set_velocity_and_rotation(Vec2::new(3.0, -1.0), 1.5)
        .unwrap();

    let cmd = harness.ctrl.command().unwrap();
    assert_eq!(cmd.velocity, Vec2::new(3.0, -1.0));
    assert_eq!(cmd.rotation_rate_deg, 1.5);
    assert_eq!(cmd.body_height_mm, 60.0);
}

#[test]
fn test_leg_calibration() {
    let harness = Harness::new(Params::default());

    harness.ctrl.set_leg_rest_center(4, 10.0, 150.0).unwrap();
    assert_eq!(
        harness.ctrl.leg_rest_center(4).unwrap(),
        Vec2::new(10.0, 150.0)
    );

    harness.ctrl.set_leg_local_target(2, -100.0, 100.0, true).unwrap();
    assert_eq!(
        harness.ctrl.leg_motion_state(2).unwrap(),
        MotionState::MovingUp
    );
    let contact = harness.ctrl.leg_ground_contact(2).unwrap();
    assert_eq!((contact.x, contact.y, contact.height), (-100.0, 100.0, 40.0));

    // Motors of leg 2 only
    let motors: Vec<usize> = harness
        .demands
        .lock()
        .unwrap()
        .iter()
        .map(|d| d.1)
        .collect();
    assert_eq!(motors, vec![6, 7, 8]);

    // Lifting an airborne leg is refused
    assert!(matches!(
        harness.ctrl.set_leg_local_target(2, -100.0, 100.0, true),
        Err(GaitCtrlError::LegError(LegError::InvalidState {
            leg: LegId::RightBack,
            state: MotionState::MovingUp
        }))
    ));
}

#[test]
fn test_invalid_leg_index() {
    let harness = Harness::new(Params::default());

    assert!(matches!(
        harness.ctrl.set_leg_local_target(6, 0.0, 100.0, false),
        Err(GaitCtrlError::LegError(LegError::InvalidIndex(
            InvalidLegIndexError(6)
        )))
    ));
    assert!(matches!(
        harness.ctrl.leg_rest_center(42),
        Err(GaitCtrlError::LegError(LegError::InvalidIndex(_)))
    ));
    assert!(harness.demands.lock().unwrap().is_empty());
}

#[test]
fn test_park() {
    let harness = Harness::new(Params::default());

    harness.ctrl.park().unwrap();

    let demands = harness.demands.lock().unwrap();
    assert_eq!(demands.len(), 18);
    for (_, motor, angle) in demands.iter() {
        let expected = if motor % 3 == 2 { 90.0 } else { 180.0 };
        assert_eq!(*angle, expected);
    }
}

#[test]
fn test_drop_stops_worker() {
    let harness = Harness::new(centred_params());
    harness.ctrl.start().unwrap();
    harness.wait_for_delays(2);

    let demands = harness.demands.clone();
    drop(harness);

    let sent = demands.lock().unwrap().len();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(demands.lock().unwrap().len(), sent);
}

#[test]
fn test_concurrent_body_height_agrees_with_legs() {
    let harness = Arc::new(Harness::new(Params::default()));
    let barrier = Arc::new(Barrier::new(2));

    let setters: Vec<_> = [50.0, 70.0]
        .iter()
        .map(|height| {
            let harness = harness.clone();
            let barrier = barrier.clone();
            let height = *height;
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..200 {
                    harness.ctrl.set_body_height(height).unwrap();
                }
            })
        })
        .collect();
    for s in setters {
        s.join().unwrap();
    }

    // Whichever caller finished last, the command and the legs agree
    let body_height = harness.ctrl.body_height().unwrap();
    let frame = &harness.ctrl.params().geometry;
    for i in 0..6 {
        let contact = harness.ctrl.leg_ground_contact(i).unwrap();
        let expected = solve(
            frame,
            Vec2::new(contact.x, contact.y),
            contact.height,
            body_height,
        )
        .unwrap();
        assert_eq!(harness.ctrl.joint_angles(i).unwrap(), expected);
    }
}

#[test]
fn test_concurrent_start_runs_one_worker() {
    const NUM_CALLERS: usize = 8;

    let harness = Arc::new(Harness::new(centred_params()));
    let barrier = Arc::new(Barrier::new(NUM_CALLERS));

    let callers: Vec<_> = (0..NUM_CALLERS)
        .map(|_| {
            let harness = harness.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                harness.ctrl.start().unwrap();
            })
        })
        .collect();
    for c in callers {
        c.join().unwrap();
    }

    assert!(harness.ctrl.is_running().unwrap());
    harness.wait_for_delays(STARTUP_DELAYS + 3);
    harness.ctrl.join().unwrap();

    let threads: HashSet<ThreadId> = harness
        .demands
        .lock()
        .unwrap()
        .iter()
        .map(|d| d.0)
        .collect();
    assert_eq!(threads.len(), 1);
}

#[test]
fn test_concurrent_start_stop_never_overlaps_workers() {
    const NUM_CALLERS: usize = 6;

    let harness = Arc::new(Harness::new(centred_params()));
    let barrier = Arc::new(Barrier::new(NUM_CALLERS));

    let callers: Vec<_> = (0..NUM_CALLERS)
        .map(|i| {
            let harness = harness.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..20 {
                    if i % 2 == 0 {
                        harness.ctrl.start().unwrap();
                    } else {
                        harness.ctrl.stop().unwrap();
                    }
                    thread::sleep(Duration::from_millis(1));
                }
            })
        })
        .collect();
    for c in callers {
        c.join().unwrap();
    }

    harness.ctrl.join().unwrap();
    assert!(!harness.ctrl.is_running().unwrap());

    // A worker is always joined before the next is spawned, so the demands of
    // each worker thread form one unbroken run
    let demands = harness.demands.lock().unwrap();
    let mut finished: HashSet<ThreadId> = HashSet::new();
    for pair in demands.windows(2) {
        if pair[0].0 != pair[1].0 {
            assert!(finished.insert(pair[0].0));
            assert!(!finished.contains(&pair[1].0));
        }
    }
}

#[test]
fn test_lift_while_walking() {
    let harness = Harness::stepped(centred_params());
    harness.ctrl.set_velocity(Vec2::new(2.0, 0.0)).unwrap();

    harness.ctrl.start().unwrap();

    // Blocked after the first walking cycle
    let mut delays = STARTUP_DELAYS + 1;
    harness.release_until(delays);
    for i in 0..6 {
        assert_eq!(harness.ctrl.leg_motion_state(i).unwrap(), MotionState::OnGround);
    }

    harness.ctrl.set_leg_local_target(1, 0.0, 100.0, true).unwrap();
    assert_eq!(harness.ctrl.leg_motion_state(1).unwrap(), MotionState::MovingUp);

    // A second lift of the raised leg is refused and leaves it alone
    assert!(matches!(
        harness.ctrl.set_leg_local_target(1, 20.0, 100.0, true),
        Err(GaitCtrlError::LegError(LegError::InvalidState { .. }))
    ));
    assert_eq!(harness.ctrl.leg_ground_contact(1).unwrap().x, 0.0);

    let expected = [MotionState::MovingToTarget, MotionState::OnGround];
    for state in expected.iter() {
        delays += 1;
        harness.release_until(delays);

        assert_eq!(harness.ctrl.leg_motion_state(1).unwrap(), *state);
        for i in [0, 2, 3, 4, 5].iter() {
            assert_eq!(harness.ctrl.leg_motion_state(*i).unwrap(), MotionState::OnGround);
        }
    }

    // Touched down where it was lifted, the cycle solved it on the ground
    let contact = harness.ctrl.leg_ground_contact(1).unwrap();
    assert_eq!((contact.x, contact.y, contact.height), (0.0, 100.0, 0.0));

    let cycle = harness.last_demands(18);
    for (_, motor, angle) in cycle[3..6].iter() {
        assert!((angle - GOLDEN_0_100_H50[motor % 3]).abs() < 1e-6);
    }

    // Walking carries on with no further steps below the threshold
    delays += 1;
    harness.release_until(delays);
    for i in 0..6 {
        assert_eq!(harness.ctrl.leg_motion_state(i).unwrap(), MotionState::OnGround);
    }

    harness.open_gate();
    harness.ctrl.join().unwrap();
}

//! Arbiter loop tests with injected builders and real (cheap) processes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use sweepbox_audio::arbiter::{Arbiter, ArbiterHandle, ControlState, PipelineKind, Snapshot};
use sweepbox_types::EffectsParams;

const TEST_TICK: Duration = Duration::from_millis(20);

/// Shared-state stand-in: one snapshot behind a lock plus the restart flag.
struct FakeState {
    snapshot: Mutex<Snapshot>,
    restart: AtomicBool,
}

impl FakeState {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            snapshot: Mutex::new(Snapshot {
                sweep_running: false,
                fx: EffectsParams::default(),
                capture_device: "cap".into(),
                output_device: "out".into(),
            }),
            restart: AtomicBool::new(false),
        })
    }

    fn set(&self, f: impl FnOnce(&mut Snapshot)) {
        f(&mut self.snapshot.lock().unwrap());
    }
}

impl ControlState for FakeState {
    fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().unwrap().clone()
    }
    fn take_restart_flag(&self) -> bool {
        self.restart.swap(false, Ordering::SeqCst)
    }
    fn flag_restart(&self) {
        self.restart.store(true, Ordering::SeqCst);
    }
}

struct Rig {
    state: Arc<FakeState>,
    handle: ArbiterHandle,
    effects_starts: Arc<AtomicUsize>,
    passthrough_starts: Arc<AtomicUsize>,
    shutdown: crossbeam_channel::Sender<()>,
    join: thread::JoinHandle<()>,
}

fn counting_builder(counter: Arc<AtomicUsize>) -> sweepbox_audio::arbiter::PipelineBuilder {
    Box::new(move |_snap| {
        counter.fetch_add(1, Ordering::SeqCst);
        vec!["sh".into(), "-c".into(), "sleep 30".into()]
    })
}

fn start_rig() -> Rig {
    let state = FakeState::new();
    let effects_starts = Arc::new(AtomicUsize::new(0));
    let passthrough_starts = Arc::new(AtomicUsize::new(0));

    let arbiter = Arbiter::with_builders(
        state.clone(),
        counting_builder(effects_starts.clone()),
        counting_builder(passthrough_starts.clone()),
    )
    .tick_interval(TEST_TICK);
    let handle = arbiter.handle();

    let (shutdown, shutdown_rx) = crossbeam_channel::bounded(1);
    let join = thread::spawn(move || arbiter.run(shutdown_rx));

    Rig {
        state,
        handle,
        effects_starts,
        passthrough_starts,
        shutdown,
        join,
    }
}

impl Rig {
    fn stop(self) {
        let _ = self.shutdown.send(());
        self.join.join().unwrap();
    }

    fn wait_for(&self, expected: Option<PipelineKind>, why: &str) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if self.handle.current_kind() == expected {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("{why}: wanted {expected:?}, have {:?}", self.handle.current_kind());
    }
}

#[test]
fn sweep_flag_gates_the_pipeline() {
    let rig = start_rig();

    // Effects enabled but sweep stopped: nothing may spawn.
    rig.state.set(|s| s.fx.enabled = true);
    thread::sleep(TEST_TICK * 5);
    assert_eq!(rig.handle.current_kind(), None);
    assert_eq!(rig.effects_starts.load(Ordering::SeqCst), 0);

    rig.state.set(|s| s.sweep_running = true);
    rig.wait_for(Some(PipelineKind::Effects), "effects after start");

    rig.state.set(|s| s.sweep_running = false);
    rig.wait_for(None, "stop after sweep halt");

    rig.stop();
}

#[test]
fn effects_toggle_swaps_pipelines_exclusively() {
    let rig = start_rig();

    rig.state.set(|s| s.sweep_running = true);
    rig.wait_for(Some(PipelineKind::Passthrough), "passthrough first");

    rig.state.set(|s| s.fx.enabled = true);
    rig.wait_for(Some(PipelineKind::Effects), "swap to effects");

    rig.state.set(|s| s.fx.enabled = false);
    rig.wait_for(Some(PipelineKind::Passthrough), "swap back");

    // One start per mode occupancy, never a double.
    assert_eq!(rig.effects_starts.load(Ordering::SeqCst), 1);
    assert_eq!(rig.passthrough_starts.load(Ordering::SeqCst), 2);

    rig.stop();
}

#[test]
fn restart_flag_causes_exactly_one_effects_restart() {
    let rig = start_rig();

    rig.state.set(|s| {
        s.sweep_running = true;
        s.fx.enabled = true;
    });
    rig.wait_for(Some(PipelineKind::Effects), "initial effects");

    // A burst of edits between ticks raises the flag once.
    rig.state.flag_restart();
    rig.state.flag_restart();
    rig.state.flag_restart();

    let deadline = Instant::now() + Duration::from_secs(5);
    while rig.effects_starts.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    // Let several more ticks pass: the count must settle at exactly two.
    thread::sleep(TEST_TICK * 10);
    assert_eq!(rig.effects_starts.load(Ordering::SeqCst), 2);
    assert_eq!(rig.handle.current_kind(), Some(PipelineKind::Effects));

    rig.stop();
}

#[test]
fn device_change_rebuilds_the_running_pipeline() {
    let rig = start_rig();

    rig.state.set(|s| s.sweep_running = true);
    rig.wait_for(Some(PipelineKind::Passthrough), "initial passthrough");
    assert_eq!(rig.passthrough_starts.load(Ordering::SeqCst), 1);

    rig.state.set(|s| s.output_device = "bt-sink-1".into());
    let deadline = Instant::now() + Duration::from_secs(5);
    while rig.passthrough_starts.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(rig.passthrough_starts.load(Ordering::SeqCst), 2);
    assert_eq!(rig.handle.current_kind(), Some(PipelineKind::Passthrough));

    rig.stop();
}

#[test]
fn suspend_preempts_and_resume_rebuilds() {
    let rig = start_rig();

    rig.state.set(|s| {
        s.sweep_running = true;
        s.fx.enabled = true;
    });
    rig.wait_for(Some(PipelineKind::Effects), "effects before playback");

    let was_running = rig.handle.suspend();
    assert!(was_running);
    assert_eq!(rig.handle.current_kind(), None);

    // While suspended, ticks must not bring the pipeline back.
    thread::sleep(TEST_TICK * 5);
    assert_eq!(rig.handle.current_kind(), None);

    rig.handle.resume(was_running);
    rig.wait_for(Some(PipelineKind::Effects), "rebuild after resume");

    rig.stop();
}

#[test]
fn idle_ticks_take_no_process_actions() {
    let rig = start_rig();

    rig.state.set(|s| s.sweep_running = true);
    rig.wait_for(Some(PipelineKind::Passthrough), "steady state");
    let starts = rig.passthrough_starts.load(Ordering::SeqCst);

    thread::sleep(TEST_TICK * 10);
    assert_eq!(rig.passthrough_starts.load(Ordering::SeqCst), starts);

    rig.stop();
}

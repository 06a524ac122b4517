//! The audio device arbiter.
//!
//! One decision loop owns the continuous-pipeline lifecycle. Everything else
//! communicates intent by mutating shared state; the arbiter observes a
//! consistent snapshot once per tick and makes the device match it. The
//! decision is idempotent: re-evaluating an unchanged snapshot performs no
//! process actions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{info, warn};

use sweepbox_types::EffectsParams;

use crate::pipeline;
use crate::process::{ManagedProcess, OutputSink};

/// How often the decision loop re-evaluates shared state.
pub const TICK_INTERVAL: Duration = Duration::from_millis(200);
/// How long to hold off after a failed start before trying again.
pub const START_BACKOFF: Duration = Duration::from_secs(1);

/// The two mutually-exclusive continuous pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Effects,
    Passthrough,
}

/// A consistent view of the state the arbiter decides from. Taken under the
/// record locks, used lock-free for the (slow) process actions.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub sweep_running: bool,
    pub fx: EffectsParams,
    pub capture_device: String,
    pub output_device: String,
}

/// State access the arbiter needs. Implemented by the shared runtime state
/// in `sweepbox-core`; the trait breaks the dependency cycle between the
/// state records and this crate.
pub trait ControlState: Send + Sync {
    fn snapshot(&self) -> Snapshot;
    /// Read and clear the effects restart flag. Consuming it here means a
    /// burst of edits between two ticks costs exactly one restart.
    fn take_restart_flag(&self) -> bool;
    /// Request an effects-pipeline rebuild on the next tick.
    fn flag_restart(&self);
}

/// Which continuous pipeline the snapshot calls for, if any. Audio only
/// flows while the receiver is being swept; that rule dominates.
pub fn desired_pipeline(snap: &Snapshot) -> Option<PipelineKind> {
    if !snap.sweep_running {
        None
    } else if snap.fx.enabled {
        Some(PipelineKind::Effects)
    } else {
        Some(PipelineKind::Passthrough)
    }
}

/// Builds the argv for one pipeline kind from a snapshot. Injected so tests
/// can substitute cheap commands for the real capture chain.
pub type PipelineBuilder = Box<dyn Fn(&Snapshot) -> Vec<String> + Send + Sync>;

struct RunningPipeline {
    kind: PipelineKind,
    /// Output device the process was bound to at start; pipelines do not
    /// migrate devices, so a mismatch forces a rebuild.
    output_device: String,
    process: ManagedProcess,
}

struct ArbiterShared {
    slot: Mutex<Option<RunningPipeline>>,
    suspended: AtomicBool,
}

/// Cross-thread view of the arbiter: playback pre-emption and status.
#[derive(Clone)]
pub struct ArbiterHandle {
    shared: Arc<ArbiterShared>,
    state: Arc<dyn ControlState>,
}

impl ArbiterHandle {
    /// Stop any continuous pipeline and keep the arbiter from starting a
    /// new one until [`resume`](Self::resume). Returns whether a pipeline
    /// was running, for the caller to pass back to `resume`.
    pub fn suspend(&self) -> bool {
        self.shared.suspended.store(true, Ordering::SeqCst);
        let mut slot = self.shared.slot.lock().unwrap();
        match slot.take() {
            Some(running) => {
                info!(target: "arbiter", "suspending, stopping {:?} pipeline", running.kind);
                running.process.stop();
                true
            }
            None => false,
        }
    }

    /// Lift a suspension. Nothing is restarted here: if a pipeline was
    /// running before, the restart flag makes the next tick rebuild it from
    /// the then-current snapshot, discarding whatever ran before.
    pub fn resume(&self, was_running: bool) {
        if was_running {
            self.state.flag_restart();
        }
        self.shared.suspended.store(false, Ordering::SeqCst);
    }

    /// Kind of the continuous pipeline currently alive, if any.
    pub fn current_kind(&self) -> Option<PipelineKind> {
        self.shared.slot.lock().unwrap().as_ref().map(|r| r.kind)
    }
}

/// The decision loop. Owns the pipeline slot; nothing else starts or stops
/// continuous pipelines.
pub struct Arbiter {
    state: Arc<dyn ControlState>,
    shared: Arc<ArbiterShared>,
    effects_builder: PipelineBuilder,
    passthrough_builder: PipelineBuilder,
    tick_interval: Duration,
    backoff_until: Option<Instant>,
}

impl Arbiter {
    /// Arbiter over the real capture/effects/playback chains.
    pub fn new(state: Arc<dyn ControlState>) -> Self {
        Self::with_builders(
            state,
            Box::new(|snap: &Snapshot| {
                pipeline::effects_command(&snap.fx, &snap.capture_device, &snap.output_device)
            }),
            Box::new(|snap: &Snapshot| {
                pipeline::passthrough_command(&snap.capture_device, &snap.output_device)
            }),
        )
    }

    pub fn with_builders(
        state: Arc<dyn ControlState>,
        effects_builder: PipelineBuilder,
        passthrough_builder: PipelineBuilder,
    ) -> Self {
        Self {
            state,
            shared: Arc::new(ArbiterShared {
                slot: Mutex::new(None),
                suspended: AtomicBool::new(false),
            }),
            effects_builder,
            passthrough_builder,
            tick_interval: TICK_INTERVAL,
            backoff_until: None,
        }
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn handle(&self) -> ArbiterHandle {
        ArbiterHandle {
            shared: Arc::clone(&self.shared),
            state: Arc::clone(&self.state),
        }
    }

    /// Run until the shutdown channel closes or sends. Any pipeline alive at
    /// shutdown is stopped before returning.
    pub fn run(mut self, shutdown: Receiver<()>) {
        info!(target: "arbiter", "decision loop started");
        loop {
            match shutdown.recv_timeout(self.tick_interval) {
                Err(RecvTimeoutError::Timeout) => self.tick(),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        if let Some(running) = self.shared.slot.lock().unwrap().take() {
            info!(target: "arbiter", "shutdown, stopping {:?} pipeline", running.kind);
            running.process.stop();
        }
    }

    /// One evaluation of the decision rules. Safe to call repeatedly.
    pub fn tick(&mut self) {
        let snap = self.state.snapshot();
        let restart_requested = self.state.take_restart_flag();

        let mut slot = self.shared.slot.lock().unwrap();

        if self.shared.suspended.load(Ordering::SeqCst) {
            if let Some(running) = slot.take() {
                running.process.stop();
            }
            return;
        }

        // A pipeline that died on its own is cleared and retried on the
        // same backoff as a failed start.
        let died = slot
            .as_mut()
            .map(|running| !running.process.is_running())
            .unwrap_or(false);
        if died {
            let dead = slot.take().expect("slot checked above");
            warn!(
                target: "arbiter",
                "{:?} pipeline exited on its own: {}",
                dead.kind,
                dead.command()
            );
            self.backoff_until = Some(Instant::now() + START_BACKOFF);
        }

        let desired = desired_pipeline(&snap);

        let must_stop = match (slot.as_ref(), desired) {
            (Some(running), Some(kind)) => {
                running.kind != kind
                    || running.output_device != snap.output_device
                    || (kind == PipelineKind::Effects && restart_requested)
            }
            (Some(_), None) => true,
            (None, _) => false,
        };

        if must_stop {
            let running = slot.take().expect("must_stop implies occupied slot");
            info!(target: "arbiter", "stopping {:?} pipeline", running.kind);
            running.process.stop();
        }

        let Some(kind) = desired else {
            return;
        };
        if slot.is_some() {
            return;
        }
        if let Some(until) = self.backoff_until {
            if Instant::now() < until {
                return;
            }
            self.backoff_until = None;
        }
        // Re-check: a playback request may have suspended us while the stop
        // above was in flight.
        if self.shared.suspended.load(Ordering::SeqCst) {
            return;
        }

        let (builder, sink) = match kind {
            PipelineKind::Effects => (&self.effects_builder, OutputSink::Capture),
            PipelineKind::Passthrough => (&self.passthrough_builder, OutputSink::Discard),
        };
        let argv = builder(&snap);
        match ManagedProcess::spawn_checked(&argv, sink) {
            Ok(process) => {
                info!(
                    target: "arbiter",
                    "started {:?} pipeline on {} (pid {})",
                    kind,
                    snap.output_device,
                    process.pid()
                );
                *slot = Some(RunningPipeline {
                    kind,
                    output_device: snap.output_device,
                    process,
                });
            }
            Err(e) => {
                warn!(target: "arbiter", "failed to start {:?} pipeline: {}", kind, e);
                self.backoff_until = Some(Instant::now() + START_BACKOFF);
            }
        }
    }
}

impl RunningPipeline {
    fn command(&self) -> &str {
        self.process.command()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(running: bool, enabled: bool) -> Snapshot {
        let mut fx = EffectsParams::default();
        fx.enabled = enabled;
        Snapshot {
            sweep_running: running,
            fx,
            capture_device: "plughw:3,0".into(),
            output_device: "speaker".into(),
        }
    }

    #[test]
    fn nothing_runs_while_sweep_is_stopped() {
        assert_eq!(desired_pipeline(&snap(false, false)), None);
        assert_eq!(desired_pipeline(&snap(false, true)), None);
    }

    #[test]
    fn passthrough_when_effects_disabled() {
        assert_eq!(
            desired_pipeline(&snap(true, false)),
            Some(PipelineKind::Passthrough)
        );
    }

    #[test]
    fn effects_when_enabled_and_running() {
        assert_eq!(
            desired_pipeline(&snap(true, true)),
            Some(PipelineKind::Effects)
        );
    }
}

//! The sweepbox daemon: wire everything together and serve commands.
//!
//! Boot order matters here. The startup sound plays before the arbiter
//! thread exists, so the clip owns the audio device uncontested; only then
//! do the sweep, arbiter, LED, and simulation workers start, and finally the
//! TCP server takes over the main thread.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use log::{error, info, warn};

use sweepbox_audio::{Arbiter, Mixer, PlaybackPath};
use sweepbox_core::{BoxPaths, Dispatcher, LedDriver, LogSink, SharedState, SweepController, Tuner};
use sweepbox_net::{CommandHandler, CommandServer};
use sweepbox_types::{CommandError, Reply, Request};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5770";
/// The receiver's USB sound card.
const MIXER_CARD: u32 = 3;
/// Boot defaults: speaker at ~75%, capture locked where the receiver
/// sounds best.
const DEFAULT_SPEAKER_VOLUME: i32 = 28;
const DEFAULT_CAPTURE_LEVEL: i32 = 15;
const STARTUP_SOUND_TIMEOUT: Duration = Duration::from_secs(30);

/// Adapts the dispatcher to the server's handler trait.
struct DispatchHandler(Dispatcher);

impl CommandHandler for DispatchHandler {
    fn handle(&self, request: Request) -> Result<Reply, CommandError> {
        self.0.handle(request)
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    let listen = args
        .iter()
        .position(|a| a == "--listen")
        .and_then(|i| args.get(i + 1).cloned())
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

    init_logging(verbose);
    info!("sweepbox starting");

    let paths = BoxPaths::resolve();
    if let Err(e) = paths.ensure_dirs() {
        warn!("could not create data directories: {}", e);
    }
    let state = Arc::new(SharedState::load(paths.clone()));

    let tuner = Arc::new(Tuner::i2c_default());
    if tuner.probe() {
        info!("receiver detected");
    } else {
        warn!("receiver not found, sweeps will run without tuning");
    }

    let mixer = Mixer::new(MIXER_CARD);
    if let Err(e) = mixer.set_speaker_volume(DEFAULT_SPEAKER_VOLUME) {
        warn!("could not set speaker volume: {}", e);
    }
    if let Err(e) = mixer.set_capture_level(DEFAULT_CAPTURE_LEVEL) {
        warn!("could not set capture level: {}", e);
    }

    let mut shutdowns: Vec<Sender<()>> = Vec::new();
    let mut worker = |name: &'static str, f: Box<dyn FnOnce(crossbeam_channel::Receiver<()>) + Send>| {
        let (tx, rx) = crossbeam_channel::bounded(1);
        shutdowns.push(tx);
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || f(rx))
            .expect("spawn worker thread");
    };

    let led_driver = LedDriver::new(state.clone(), Box::new(LogSink));
    let leds = led_driver.handle();
    worker("led-driver", Box::new(move |rx| led_driver.run(rx)));

    let arbiter = Arbiter::new(state.clone());
    let arbiter_handle = arbiter.handle();
    let playback = Arc::new(PlaybackPath::new(arbiter_handle.clone(), paths.search_dirs()));

    // The startup clip plays before the arbiter loop exists, so nothing
    // contends for the device while it runs.
    let startup_sound = state.sweep().startup_sound.clone();
    if !startup_sound.is_empty() {
        info!("playing startup sound: {}", startup_sound);
        if let Err(e) = playback.play(&startup_sound, Some(STARTUP_SOUND_TIMEOUT)) {
            warn!("startup sound failed: {}", e);
        }
    }

    worker("arbiter", Box::new(move |rx| arbiter.run(rx)));

    let sweep = SweepController::new(state.clone(), tuner.clone(), leds.clone());
    worker("sweep", Box::new(move |rx| sweep.run(rx)));

    {
        let (state, playback, leds) = (state.clone(), playback.clone(), leds.clone());
        worker(
            "rempod-sim",
            Box::new(move |rx| sweepbox_core::sim::run_rempod(state, playback, leds, rx)),
        );
    }
    {
        let (state, playback, leds) = (state.clone(), playback.clone(), leds.clone());
        worker(
            "musicbox-sim",
            Box::new(move |rx| sweepbox_core::sim::run_musicbox(state, playback, leds, rx)),
        );
    }

    let dispatcher = Dispatcher::new(state, playback, arbiter_handle, mixer, leds, tuner);
    let server = CommandServer::bind(&listen)?;
    let result = server.serve(Arc::new(DispatchHandler(dispatcher)));

    // Dropping the senders tells every worker loop to wind down.
    if let Err(ref e) = result {
        error!("command server failed: {}", e);
    }
    drop(shutdowns);
    result
}

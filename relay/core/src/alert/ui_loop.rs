//! UI Event Loop
//!
//! One dedicated OS thread owns the renderer and every window transition.
//! Other threads hand it work by enqueueing idle callbacks on a bounded
//! channel; a ticker drives countdowns, pulses and subtitles.
//!
//! # Message Flow
//!
//! ```text
//!   request tasks ──try_send(callback)──▶ ┌──────────────┐
//!                                         │   UI thread  │──▶ Renderer
//!   crossbeam tick (33 ms) ─────────────▶ │  UiContext   │
//!   stop() ──quit (capacity 1)──────────▶ └──────┬───────┘
//!                                                │ lock (briefly)
//!                                                ▼
//!                                  Arc<Mutex<WindowCollection>>
//! ```
//!
//! The collection lock is taken for a single read or mutation at a time.
//! It is never held while calling the renderer.
//!
//! # Exit Path
//!
//! The quit channel is separate from the work queue, so a full queue never
//! holds up a stop request. On the way out the loop marks the collection
//! closed and retires every remaining window; callbacks still queued at
//! that point are dropped.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, tick, Receiver, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, error, info, info_span, warn};

use super::render::{Renderer, RendererFactory, WindowSpec};
use super::window::{
    humanize_age, progress_fraction, AlertId, Countdown, InactiveReason, WindowCollection,
    WindowState,
};
use super::AlertError;

/// Shared window collection
pub type SharedWindows = Arc<Mutex<WindowCollection>>;

/// Work executed on the UI thread
pub type IdleCallback = Box<dyn FnOnce(&mut UiContext) + Send + 'static>;

/// Timing knobs for the UI loop
#[derive(Clone, Debug)]
pub struct UiLoopConfig {
    /// Thread name
    pub name: String,
    /// Maximum pending callbacks
    pub queue_capacity: usize,
    /// Countdown refresh interval
    pub tick: Duration,
    /// Perpetual indicator interval
    pub pulse_interval: Duration,
    /// Subtitle refresh interval
    pub subtitle_interval: Duration,
    /// How long shutdown waits for the UI thread to exit
    pub shutdown_timeout: Duration,
}

impl Default for UiLoopConfig {
    fn default() -> Self {
        Self {
            name: "alert-ui".to_string(),
            queue_capacity: 256,
            tick: Duration::from_millis(33),
            pulse_interval: Duration::from_millis(80),
            subtitle_interval: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// UI Context
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct WindowTimers {
    last_pulse: Instant,
    last_subtitle: Instant,
}

/// State owned by the UI thread
///
/// Callbacks receive `&mut UiContext`; it is the only place window state
/// changes.
pub struct UiContext {
    renderer: Box<dyn Renderer>,
    windows: SharedWindows,
    timers: HashMap<AlertId, WindowTimers>,
    pulse_interval: Duration,
    subtitle_interval: Duration,
}

impl UiContext {
    fn new(renderer: Box<dyn Renderer>, windows: SharedWindows, config: &UiLoopConfig) -> Self {
        Self {
            renderer,
            windows,
            timers: HashMap::new(),
            pulse_interval: config.pulse_interval,
            subtitle_interval: config.subtitle_interval,
        }
    }

    fn state_of(&self, id: AlertId) -> Option<WindowState> {
        self.windows
            .lock()
            .iter()
            .find(|w| w.id == id)
            .map(|w| w.state)
    }

    /// Open the window described by `spec` and mark it active
    pub fn realize(&mut self, spec: &WindowSpec) {
        let id = spec.id;
        if self.state_of(id) != Some(WindowState::Created) {
            // Dismissed or shut down before it could be shown
            debug!(alert = %id, "Skipping realization of retired window");
            return;
        }

        match self.renderer.open(spec) {
            Ok(()) => {
                let now = Instant::now();
                let countdown = {
                    let mut windows = self.windows.lock();
                    windows.iter_mut().find(|w| w.id == id).map(|w| {
                        w.state = WindowState::Active;
                        w.created_at = Some(now);
                        w.countdown
                    })
                };
                let Some(countdown) = countdown else {
                    self.renderer.close(id);
                    return;
                };

                self.timers.insert(
                    id,
                    WindowTimers {
                        last_pulse: now,
                        last_subtitle: now,
                    },
                );
                if let Countdown::Timed(_) = countdown {
                    self.renderer.set_fraction(id, 1.0);
                }
                self.renderer.set_subtitle(id, &humanize_age(Duration::ZERO));
                debug!(alert = %id, "Alert window active");
            }
            Err(e) => {
                warn!(alert = %id, error = %e, "Failed to open alert window");
                {
                    let mut windows = self.windows.lock();
                    if let Some(window) = windows.iter_mut().find(|w| w.id == id) {
                        window.state = WindowState::Inactive(InactiveReason::RenderFailed);
                    }
                }
                self.sweep();
            }
        }
    }

    /// Retire a window
    ///
    /// Returns `false` if the window is unknown or already inactive. Only an
    /// active window has a renderer handle to close.
    pub fn deactivate(&mut self, id: AlertId, reason: InactiveReason) -> bool {
        let was_active = {
            let mut windows = self.windows.lock();
            let Some(window) = windows.iter_mut().find(|w| w.id == id) else {
                return false;
            };
            match window.state {
                WindowState::Inactive(_) => return false,
                WindowState::Active => {
                    window.state = WindowState::Inactive(reason);
                    true
                }
                WindowState::Created => {
                    window.state = WindowState::Inactive(reason);
                    false
                }
            }
        };

        if was_active {
            self.renderer.close(id);
        }
        self.timers.remove(&id);
        debug!(alert = %id, ?reason, "Alert window deactivated");

        self.sweep();
        true
    }

    /// Retire every window that is not already inactive
    pub fn deactivate_all(&mut self, reason: InactiveReason) -> usize {
        let ids: Vec<AlertId> = self
            .windows
            .lock()
            .iter()
            .filter(|w| !w.is_inactive())
            .map(|w| w.id)
            .collect();

        ids.into_iter()
            .filter(|id| self.deactivate(*id, reason))
            .count()
    }

    /// Drop every inactive window from the collection
    pub fn sweep(&mut self) -> usize {
        let removed = {
            let mut windows = self.windows.lock();
            let before = windows.len();
            windows.retain(|w| !w.is_inactive());
            before - windows.len()
        };
        if removed > 0 {
            debug!(removed, "Cleared inactive windows");
        }
        removed
    }

    fn on_tick(&mut self, now: Instant) {
        let active: Vec<(AlertId, Countdown, Instant, Option<Instant>)> = self
            .windows
            .lock()
            .iter()
            .filter(|w| w.is_active())
            .filter_map(|w| {
                w.created_at
                    .map(|created| (w.id, w.countdown, created, w.deadline()))
            })
            .collect();

        for (id, countdown, created, deadline) in active {
            let elapsed = now.saturating_duration_since(created);

            match countdown {
                Countdown::Timed(timeout) => {
                    if deadline.is_some_and(|at| now >= at) {
                        self.deactivate(id, InactiveReason::Expired);
                        continue;
                    }
                    self.renderer
                        .set_fraction(id, progress_fraction(elapsed, timeout));
                }
                Countdown::Perpetual => {
                    let pulse_due = self
                        .timers
                        .get(&id)
                        .is_some_and(|t| now.saturating_duration_since(t.last_pulse) >= self.pulse_interval);
                    if pulse_due {
                        self.renderer.pulse(id);
                        if let Some(timers) = self.timers.get_mut(&id) {
                            timers.last_pulse = now;
                        }
                    }
                }
            }

            let subtitle_due = self.timers.get(&id).is_some_and(|t| {
                now.saturating_duration_since(t.last_subtitle) >= self.subtitle_interval
            });
            if subtitle_due {
                self.renderer.set_subtitle(id, &humanize_age(elapsed));
                if let Some(timers) = self.timers.get_mut(&id) {
                    timers.last_subtitle = now;
                }
            }
        }
    }

    fn collect_dismissals(&mut self) {
        for id in self.renderer.take_dismissed() {
            info!(alert = %id, "Alert window closed by user");
            self.deactivate(id, InactiveReason::Dismissed);
        }
    }

    /// Refuse further windows, then retire the ones still tracked
    fn close(&mut self) -> usize {
        self.windows.lock().close();
        self.deactivate_all(InactiveReason::Shutdown)
    }
}

// =============================================================================
// UI Loop Handle
// =============================================================================

/// Handle to the UI thread
pub struct UiLoop {
    tx: Sender<IdleCallback>,
    quit: Sender<()>,
    thread: Mutex<Option<JoinHandle<()>>>,
    capacity: usize,
}

impl UiLoop {
    /// Start the UI thread
    ///
    /// The renderer is built by `factory` on the new thread. This call
    /// blocks until that construction finished, so it should run before
    /// the async runtime starts serving (or inside `spawn_blocking`).
    pub fn spawn(
        config: UiLoopConfig,
        windows: SharedWindows,
        factory: RendererFactory,
    ) -> Result<Self, AlertError> {
        let capacity = config.queue_capacity.max(1);
        let (tx, rx) = bounded::<IdleCallback>(capacity);
        let (quit_tx, quit_rx) = bounded::<()>(1);
        let (ready_tx, ready_rx) = bounded::<Result<(), AlertError>>(1);

        let thread = std::thread::Builder::new()
            .name(config.name.clone())
            .spawn(move || {
                let span = info_span!("ui_loop", thread = %config.name);
                let _guard = span.enter();

                let renderer = match factory() {
                    Ok(renderer) => renderer,
                    Err(e) => {
                        let _ = ready_tx.send(Err(AlertError::Renderer(e)));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                let ctx = UiContext::new(renderer, windows, &config);
                run(ctx, &rx, &quit_rx, config.tick);
            })
            .map_err(AlertError::Spawn)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(AlertError::ThreadPanicked);
            }
        }

        Ok(Self {
            tx,
            quit: quit_tx,
            thread: Mutex::new(Some(thread)),
            capacity,
        })
    }

    /// Enqueue a callback without blocking
    pub fn invoke<F>(&self, callback: F) -> Result<(), AlertError>
    where
        F: FnOnce(&mut UiContext) + Send + 'static,
    {
        self.tx
            .try_send(Box::new(callback))
            .map_err(|e| match e {
                TrySendError::Full(_) => AlertError::QueueFull {
                    capacity: self.capacity,
                },
                TrySendError::Disconnected(_) => AlertError::LoopStopped,
            })
    }

    /// Ask the loop to quit once the callback it is running returns
    ///
    /// Never blocks. Callbacks still queued are dropped. Returns the thread
    /// handle to join, or `None` if a previous call already took it.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let handle = self.thread.lock().take()?;
        match self.quit.try_send(()) {
            // Full means a quit request is already pending
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => debug!("UI loop already exited"),
        }
        Some(handle)
    }
}

fn quit_requested(quit: &Receiver<()>) -> bool {
    !matches!(quit.try_recv(), Err(TryRecvError::Empty))
}

fn run(mut ctx: UiContext, rx: &Receiver<IdleCallback>, quit: &Receiver<()>, interval: Duration) {
    info!("UI loop started");
    let ticker = tick(interval);

    // select! picks fairly among ready channels, so a pending quit is also
    // checked ahead of every wait
    while !quit_requested(quit) {
        select! {
            recv(quit) -> _ => break,
            recv(rx) -> msg => match msg {
                Ok(callback) => {
                    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| callback(&mut ctx)));
                    if outcome.is_err() {
                        error!("UI callback panicked");
                    }
                }
                Err(_) => break,
            },
            recv(ticker) -> at => {
                if let Ok(at) = at {
                    ctx.on_tick(at);
                }
            },
        }
        ctx.collect_dismissals();
    }

    let closed = ctx.close();
    let dropped = rx.len();
    if dropped > 0 {
        warn!(dropped, "Dropping queued UI callbacks");
    }
    info!(closed, "UI loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::render::{LogRenderer, RenderError, WindowStyle};
    use crate::alert::AlertWindow;

    fn spec_for(id: AlertId) -> WindowSpec {
        WindowSpec {
            id,
            message: "hello".to_string(),
            icon: "dialog-information".to_string(),
            perpetual: false,
            style: WindowStyle::default(),
        }
    }

    fn context_with(windows: &SharedWindows) -> UiContext {
        UiContext::new(
            Box::new(LogRenderer::new()),
            Arc::clone(windows),
            &UiLoopConfig::default(),
        )
    }

    fn push_window(windows: &SharedWindows, countdown: Countdown) -> AlertId {
        let id = AlertId::next();
        windows.lock().push(AlertWindow::new(
            id,
            "hello".to_string(),
            "dialog-information".to_string(),
            countdown,
        ));
        id
    }

    #[test]
    fn test_realize_activates_window() {
        let windows: SharedWindows = Arc::default();
        let mut ctx = context_with(&windows);
        let id = push_window(&windows, Countdown::Timed(Duration::from_secs(5)));

        ctx.realize(&spec_for(id));

        let snapshot = windows.lock().to_vec();
        assert_eq!(snapshot[0].state, WindowState::Active);
        assert!(snapshot[0].created_at.is_some());
    }

    #[test]
    fn test_deactivate_is_idempotent_and_sweeps() {
        let windows: SharedWindows = Arc::default();
        let mut ctx = context_with(&windows);
        let id = push_window(&windows, Countdown::Perpetual);
        ctx.realize(&spec_for(id));

        assert!(ctx.deactivate(id, InactiveReason::Dismissed));
        assert!(!ctx.deactivate(id, InactiveReason::Dismissed));
        assert!(windows.lock().is_empty());
    }

    #[test]
    fn test_dismiss_before_realize_skips_open() {
        let windows: SharedWindows = Arc::default();
        let mut ctx = context_with(&windows);
        let id = push_window(&windows, Countdown::Perpetual);

        assert!(ctx.deactivate(id, InactiveReason::Dismissed));
        ctx.realize(&spec_for(id));
        assert!(windows.lock().is_empty());
    }

    #[test]
    fn test_tick_expires_elapsed_windows() {
        let windows: SharedWindows = Arc::default();
        let mut ctx = context_with(&windows);
        let timed = push_window(&windows, Countdown::Timed(Duration::from_millis(10)));
        let perpetual = push_window(&windows, Countdown::Perpetual);
        ctx.realize(&spec_for(timed));
        ctx.realize(&spec_for(perpetual));

        ctx.on_tick(Instant::now() + Duration::from_secs(60));

        let snapshot = windows.lock().to_vec();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, perpetual);
    }

    #[test]
    fn test_spawn_reports_renderer_failure() {
        let factory: RendererFactory = Box::new(|| Err(RenderError("no display".to_string())));
        let result = UiLoop::spawn(UiLoopConfig::default(), Arc::default(), factory);
        assert!(matches!(result, Err(AlertError::Renderer(_))));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let ui = UiLoop::spawn(UiLoopConfig::default(), Arc::default(), LogRenderer::factory())
            .unwrap();
        assert!(ui.invoke(|_| {}).is_ok());

        let handle = ui.stop().unwrap();
        handle.join().unwrap();
        assert!(ui.stop().is_none());
        assert!(matches!(ui.invoke(|_| {}), Err(AlertError::LoopStopped)));
    }

    #[test]
    fn test_close_refuses_windows_and_retires_tracked_ones() {
        let windows: SharedWindows = Arc::default();
        let mut ctx = context_with(&windows);
        let shown = push_window(&windows, Countdown::Perpetual);
        ctx.realize(&spec_for(shown));
        push_window(&windows, Countdown::Perpetual);

        assert_eq!(ctx.close(), 2);

        let collection = windows.lock();
        assert!(collection.is_closed());
        assert!(collection.is_empty());
    }

    #[test]
    fn test_stop_with_full_queue_does_not_block() {
        let config = UiLoopConfig {
            queue_capacity: 1,
            ..UiLoopConfig::default()
        };
        let windows: SharedWindows = Arc::default();
        let ui = UiLoop::spawn(config, Arc::clone(&windows), LogRenderer::factory()).unwrap();

        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        ui.invoke(move |_| {
            let _ = entered_tx.send(());
            let _ = release_rx.recv();
        })
        .unwrap();
        entered_rx.recv().unwrap();

        let (ran_tx, ran_rx) = std::sync::mpsc::channel();
        ui.invoke(move |_| {
            let _ = ran_tx.send(());
        })
        .unwrap();
        assert!(matches!(ui.invoke(|_| {}), Err(AlertError::QueueFull { capacity: 1 })));

        let started = Instant::now();
        let handle = ui.stop().unwrap();
        assert!(started.elapsed() < Duration::from_millis(500));

        release_tx.send(()).unwrap();
        handle.join().unwrap();
        assert!(ran_rx.try_recv().is_err());
        assert!(windows.lock().is_closed());
    }
}

//! Async console runtime.
//!
//! [`LogConsole`] wraps the synchronous [`Console`] state machine behind a
//! driver task: the driver sleeps until the earliest armed timer deadline
//! and polls the machine; every mutation through the handle wakes it so the
//! sleep is recomputed. This keeps all rendering decisions in one writer
//! while producers append from anywhere.
//!
//! Suspension points live only here: timer sleeps, the drain barrier, and
//! the primary clipboard write.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::clipboard::ClipboardService;
use crate::config::ConsoleConfig;
use crate::console::Console;
use crate::line::LogLine;
use crate::store::KeyValueStore;
use crate::surface::{DisplaySurface, ScrollBehavior};

/// Interval at which the drain barrier re-checks the pending buffer.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(40);

/// Default settle time awaited after a jump to bottom.
const DEFAULT_SCROLL_WAIT: Duration = Duration::from_millis(400);

const EMPTY_COPY_WARNING: &str = "Console is empty - nothing to copy";
const COPY_CONFIRMATION: &str = "Console logs copied to clipboard";
const COPY_FAILURE_WARNING: &str = "Failed to copy console logs - please copy manually";

/// Options for [`LogConsole::scroll_to_bottom`].
#[derive(Debug, Clone, Copy)]
pub struct ScrollOptions {
    /// How the viewport moves.
    pub behavior: ScrollBehavior,
    /// How long to wait before resolving, so callers can sequence UI work
    /// after the scroll has visually finished.
    pub wait: Duration,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            behavior: ScrollBehavior::Smooth,
            wait: DEFAULT_SCROLL_WAIT,
        }
    }
}

/// Locks a mutex, recovering the data from a poisoned guard.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Async handle to a running console.
///
/// Created with [`LogConsole::spawn`] inside a tokio runtime. Dropping the
/// handle stops the driver task; [`LogConsole::detach`] tears the console
/// down explicitly, dropping any still-pending lines.
#[derive(Debug)]
pub struct LogConsole<S, K, C> {
    inner: Arc<Mutex<Console<S, K>>>,
    clipboard: C,
    wake: Arc<Notify>,
    cancel: CancellationToken,
    epoch: Instant,
}

impl<S, K, C> LogConsole<S, K, C>
where
    S: DisplaySurface + Send + 'static,
    K: KeyValueStore + Send + 'static,
    C: ClipboardService,
{
    /// Spawns the driver task and returns the handle.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(config: ConsoleConfig, store: K, clipboard: C) -> Self {
        let inner = Arc::new(Mutex::new(Console::new(config, store)));
        let wake = Arc::new(Notify::new());
        let cancel = CancellationToken::new();
        let epoch = Instant::now();
        tokio::spawn(drive(
            Arc::clone(&inner),
            Arc::clone(&wake),
            cancel.clone(),
            epoch,
        ));
        Self {
            inner,
            clipboard,
            wake,
            cancel,
            epoch,
        }
    }

    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Attaches a display surface, restoring persisted content first.
    pub fn attach(&self, surface: S) {
        let now = self.now();
        lock(&self.inner).attach(surface, now);
        self.wake.notify_one();
    }

    /// Tears the console down and returns the surface, if one was attached.
    ///
    /// Cancels every pending timer and drops buffered-but-unflushed lines.
    pub fn detach(&self) -> Option<S> {
        let surface = lock(&self.inner).detach();
        self.cancel.cancel();
        surface
    }

    /// Buffers one line for rendering.
    pub fn append(&self, text: impl Into<String>, style_class: Option<&str>) {
        let now = self.now();
        lock(&self.inner).append(text, style_class, now);
        self.wake.notify_one();
    }

    /// Buffers a sequence of lines for rendering.
    pub fn append_batch<I, T>(&self, lines: I, style_class: Option<&str>)
    where
        I: IntoIterator<Item = T>,
        T: Into<Option<String>>,
    {
        let now = self.now();
        lock(&self.inner).append_batch(lines, style_class, now);
        self.wake.notify_one();
    }

    /// Wipes the surface and deletes the persisted slot.
    pub fn clear_console(&self) {
        lock(&self.inner).clear_console();
    }

    /// Records a user scroll event for pin re-evaluation.
    pub fn note_user_scroll(&self) {
        let now = self.now();
        lock(&self.inner).note_user_scroll(now);
        self.wake.notify_one();
    }

    /// Jumps to the bottom and re-enables automatic scrolling, resolving
    /// after the configured wait. Resolves immediately when no surface is
    /// attached.
    pub async fn scroll_to_bottom(&self, options: ScrollOptions) {
        let had_surface = lock(&self.inner).scroll_to_bottom(options.behavior);
        if had_surface {
            tokio::time::sleep(options.wait).await;
        }
    }

    /// Drain barrier: resolves once the pending buffer is empty and no
    /// flush is executing, plus one scheduler tick.
    ///
    /// With no surface attached this waits until one arrives, since pending
    /// lines cannot drain without a surface.
    pub async fn wait_for_flush(&self) {
        loop {
            if lock(&self.inner).is_drained() {
                break;
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
        tokio::task::yield_now().await;
    }

    /// Copies the rendered text out through the clipboard capability.
    ///
    /// Tries the primary mechanism first, then the fallback; appends a
    /// confirmation or warning line describing the outcome. Returns `true`
    /// on success through either mechanism.
    pub async fn copy_logs(&self) -> bool {
        let text = lock(&self.inner).rendered_text().unwrap_or_default();
        if text.trim().is_empty() {
            self.push_feedback(EMPTY_COPY_WARNING, Some("warn"));
            return false;
        }

        match self.clipboard.write_primary(&text).await {
            Ok(()) => {
                self.push_feedback(COPY_CONFIRMATION, None);
                true
            }
            Err(primary_err) => {
                tracing::debug!(%primary_err, "primary clipboard write failed, trying fallback");
                match self.clipboard.write_fallback(&text) {
                    Ok(()) => {
                        self.push_feedback(COPY_CONFIRMATION, None);
                        true
                    }
                    Err(fallback_err) => {
                        tracing::warn!(%fallback_err, "clipboard fallback failed");
                        self.push_feedback(COPY_FAILURE_WARNING, Some("warn"));
                        // Dump the text so the user can copy it by hand.
                        self.push_feedback(&text, None);
                        false
                    }
                }
            }
        }
    }

    /// Snapshot of the pending (not yet rendered) lines.
    pub fn buffered_lines(&self) -> Vec<LogLine> {
        lock(&self.inner).buffered_lines()
    }

    /// True while automatic scrolling is suspended by a user scroll.
    pub fn is_user_scrolled_up(&self) -> bool {
        lock(&self.inner).is_user_scrolled_up()
    }

    /// Full rendered text of the attached surface.
    pub fn rendered_text(&self) -> Option<String> {
        lock(&self.inner).rendered_text()
    }

    /// Runs a closure against the attached surface, for presentation.
    pub fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> Option<R> {
        lock(&self.inner).surface().map(f)
    }

    /// Runs a closure against the attached surface mutably, for hosts
    /// feeding user scroll positions back in.
    pub fn with_surface_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        lock(&self.inner).surface_mut().map(f)
    }

    fn push_feedback(&self, text: &str, style_class: Option<&str>) {
        let now = self.now();
        lock(&self.inner).append(text, style_class, now);
        self.wake.notify_one();
    }
}

impl<S, K, C> Drop for LogConsole<S, K, C> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Driver loop: sleep until the earliest armed deadline, then poll.
async fn drive<S, K>(
    inner: Arc<Mutex<Console<S, K>>>,
    wake: Arc<Notify>,
    cancel: CancellationToken,
    epoch: Instant,
) where
    S: DisplaySurface + Send + 'static,
    K: KeyValueStore + Send + 'static,
{
    loop {
        let deadline = lock(&inner).next_deadline();
        tokio::select! {
            () = cancel.cancelled() => break,
            () = wake.notified() => {}
            () = sleep_until_deadline(epoch, deadline) => {
                let now = epoch.elapsed();
                lock(&inner).poll(now);
            }
        }
    }
}

/// Sleeps until `epoch + deadline`; pends forever when nothing is armed
/// (a wake or cancellation interrupts either way).
async fn sleep_until_deadline(epoch: Instant, deadline: Option<Duration>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(epoch + at).await,
        None => std::future::pending().await,
    }
}

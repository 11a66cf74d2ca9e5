//! Console state machine.
//!
//! Owns the pending line buffer, the timer slots, and the rendering,
//! scrolling, and persistence transitions. Everything here is synchronous
//! and driven by logical time: callers stamp each mutation with `now` and
//! fire due timers through [`Console::poll`]. The async driver in
//! [`crate::runtime`] supplies wall-clock time in production; tests advance
//! a plain counter.
//!
//! Timer discipline:
//! - flush: armed by appends, at most one armed or running at a time
//! - scroll: coalesced, one viewport update per tick regardless of flushes
//! - save: debounced, countdown restarts on every flush that rendered
//! - settle: debounced re-evaluation of the scroll pin after user scrolls
//! - jump: one-shot post-restore jump to bottom on the next tick

use std::collections::VecDeque;
use std::time::Duration;

use crate::config::ConsoleConfig;
use crate::line::{Entrance, LogLine, RenderedNode};
use crate::scroll::ScrollState;
use crate::store::KeyValueStore;
use crate::surface::{DisplaySurface, ScrollBehavior};

/// Delay between arming a flush and draining the next batch. Short enough
/// to feel live, long enough to batch bursty producers.
const FLUSH_DELAY: Duration = Duration::from_millis(50);

/// Quiet period after the last user scroll event before the pin latch is
/// re-evaluated.
const SCROLL_SETTLE_DELAY: Duration = Duration::from_millis(150);

/// Per-index entrance delay applied to restored lines.
const RESTORE_FADE_STRIDE: Duration = Duration::from_millis(40);

/// Restored content at or above this node count skips entrance animation.
const RESTORE_ANIMATE_MAX: usize = 15;

/// Deadline slots for the console's timers, in logical time.
#[derive(Debug, Clone, Default)]
struct Timers {
    flush_at: Option<Duration>,
    scroll_at: Option<Duration>,
    save_at: Option<Duration>,
    settle_at: Option<Duration>,
    jump_at: Option<Duration>,
}

/// Which timer slot fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Settle,
    Jump,
    Scroll,
    Flush,
    Save,
}

impl Timers {
    /// Arms the flush slot unless already armed (re-arming is a no-op).
    fn arm_flush(&mut self, at: Duration) {
        if self.flush_at.is_none() {
            self.flush_at = Some(at);
        }
    }

    /// Arms the scroll slot unless already armed (coalescing).
    fn arm_scroll(&mut self, at: Duration) {
        if self.scroll_at.is_none() {
            self.scroll_at = Some(at);
        }
    }

    /// Arms the save slot, restarting any running countdown (debounce).
    fn arm_save(&mut self, at: Duration) {
        self.save_at = Some(at);
    }

    /// Arms the settle slot, restarting any running countdown (debounce).
    fn arm_settle(&mut self, at: Duration) {
        self.settle_at = Some(at);
    }

    /// Arms the one-shot post-restore jump.
    fn arm_jump(&mut self, at: Duration) {
        self.jump_at = Some(at);
    }

    /// Cancels every slot.
    fn cancel_all(&mut self) {
        *self = Self::default();
    }

    /// Earliest armed slot; ties resolve in a fixed order so polling is
    /// deterministic (tick-zero slots before flush, save last).
    fn next(&self) -> Option<(TimerKind, Duration)> {
        [
            (TimerKind::Settle, self.settle_at),
            (TimerKind::Jump, self.jump_at),
            (TimerKind::Scroll, self.scroll_at),
            (TimerKind::Flush, self.flush_at),
            (TimerKind::Save, self.save_at),
        ]
        .into_iter()
        .filter_map(|(kind, at)| at.map(|at| (kind, at)))
        .min_by_key(|(_, at)| *at)
    }
}

/// The incremental log console.
///
/// Producers feed lines through [`Console::append`] and
/// [`Console::append_batch`]; a host drives rendering by polling timers and
/// owns presentation of the attached [`DisplaySurface`]. Rendered content is
/// persisted (debounced) to the injected [`KeyValueStore`] and restored when
/// a surface is attached.
#[derive(Debug)]
pub struct Console<S, K> {
    config: ConsoleConfig,
    store: K,
    surface: Option<S>,
    buffer: VecDeque<LogLine>,
    timers: Timers,
    scroll: ScrollState,
    is_flushing: bool,
    detached: bool,
}

impl<S: DisplaySurface, K: KeyValueStore> Console<S, K> {
    /// Creates a console with no surface attached.
    ///
    /// Lines may be appended immediately; they stay buffered (flush retries)
    /// until a surface arrives.
    pub fn new(config: ConsoleConfig, store: K) -> Self {
        let scroll = ScrollState::new(config.scroll_threshold);
        Self {
            config,
            store,
            surface: None,
            buffer: VecDeque::new(),
            timers: Timers::default(),
            scroll,
            is_flushing: false,
            detached: false,
        }
    }

    // ========================================================================
    // Producers
    // ========================================================================

    /// Buffers one line and arms a flush.
    ///
    /// Empty text is dropped. Appends after [`Console::detach`] are silently
    /// dropped; appending to a torn-down console is a caller error.
    pub fn append(&mut self, text: impl Into<String>, style_class: Option<&str>, now: Duration) {
        if self.detached {
            return;
        }
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.buffer.push_back(LogLine::new(text, style_class));
        self.schedule_flush(now);
    }

    /// Buffers a sequence of lines and arms a flush if any were added.
    ///
    /// `None` items are skipped silently; `Some` items are skipped when they
    /// are empty after trimming (the line itself is buffered untrimmed).
    pub fn append_batch<I, T>(&mut self, lines: I, style_class: Option<&str>, now: Duration)
    where
        I: IntoIterator<Item = T>,
        T: Into<Option<String>>,
    {
        if self.detached {
            return;
        }
        let mut added = false;
        for line in lines {
            let Some(line) = line.into() else { continue };
            if line.trim().is_empty() {
                continue;
            }
            self.buffer.push_back(LogLine::new(line, style_class));
            added = true;
        }
        if added {
            self.schedule_flush(now);
        }
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Arms the flush timer; a no-op while a flush is armed or running.
    fn schedule_flush(&mut self, now: Duration) {
        if self.is_flushing {
            return;
        }
        self.timers.arm_flush(now + FLUSH_DELAY);
    }

    /// Earliest armed deadline, for drivers that sleep between polls.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next().map(|(_, at)| at)
    }

    /// Fires every timer slot that is due at `now`.
    pub fn poll(&mut self, now: Duration) {
        if self.detached {
            return;
        }
        while let Some((kind, at)) = self.timers.next() {
            if at > now {
                break;
            }
            match kind {
                TimerKind::Settle => {
                    self.timers.settle_at = None;
                    self.fire_settle();
                }
                TimerKind::Jump => {
                    self.timers.jump_at = None;
                    self.fire_jump();
                }
                TimerKind::Scroll => {
                    self.timers.scroll_at = None;
                    self.fire_scroll();
                }
                TimerKind::Flush => {
                    self.timers.flush_at = None;
                    self.flush(now);
                }
                TimerKind::Save => {
                    self.timers.save_at = None;
                    self.save_logs();
                }
            }
        }
    }

    // ========================================================================
    // Flush cycle
    // ========================================================================

    /// Drains one batch from the buffer onto the surface.
    ///
    /// No-op while a flush is running or when nothing is pending. When no
    /// surface is attached the buffered lines are kept and the flush re-arms
    /// itself to retry.
    pub fn flush(&mut self, now: Duration) {
        if self.is_flushing || self.buffer.is_empty() {
            return;
        }
        if self.surface.is_none() {
            self.schedule_flush(now);
            return;
        }
        self.is_flushing = true;

        let take = self.buffer.len().min(self.config.batch_size.max(1));
        let batch: Vec<LogLine> = self.buffer.drain(..take).collect();

        let mut rendered = false;
        if let Some(surface) = self.surface.as_mut() {
            // Capture the pin before mutating: appending changes geometry.
            let was_at_bottom = self.scroll.is_at_bottom(surface.scroll_metrics());

            let regular = surface
                .nodes()
                .iter()
                .filter(|n| !n.is_progress_indicator())
                .count();
            let total = regular + batch.len();
            if total > self.config.max_lines {
                let excess = (total - self.config.max_lines).min(regular);
                surface.remove_oldest_regular_nodes(excess);
            }

            let nodes: Vec<RenderedNode> = batch
                .iter()
                .enumerate()
                .map(|(index, line)| RenderedNode::from_line(line, index))
                .collect();
            surface.append_nodes(nodes);
            rendered = true;

            if was_at_bottom && !self.scroll.user_scrolled_up() {
                self.timers.arm_scroll(now);
            }
        }
        if rendered {
            self.timers.arm_save(now + self.config.save_debounce());
        }

        self.is_flushing = false;
        if !self.buffer.is_empty() {
            self.schedule_flush(now);
        }
    }

    fn fire_scroll(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            let metrics = surface.scroll_metrics();
            surface.scroll_to(metrics.max_offset, ScrollBehavior::Instant);
        }
    }

    fn fire_jump(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            let metrics = surface.scroll_metrics();
            surface.scroll_to(metrics.max_offset, ScrollBehavior::Instant);
        }
        self.scroll.reset();
    }

    fn fire_settle(&mut self) {
        if let Some(surface) = self.surface.as_ref() {
            self.scroll.settle(surface.scroll_metrics());
        }
    }

    // ========================================================================
    // Scrolling
    // ========================================================================

    /// Records a user scroll event; the pin latch is re-evaluated once the
    /// scrolling settles.
    pub fn note_user_scroll(&mut self, now: Duration) {
        if self.detached {
            return;
        }
        self.timers.arm_settle(now + SCROLL_SETTLE_DELAY);
    }

    /// Jumps to the bottom and re-enables automatic scrolling.
    ///
    /// Returns `false` when no surface is attached (nothing moved and the
    /// latch is left alone, so a later attach restores the prior state).
    pub fn scroll_to_bottom(&mut self, behavior: ScrollBehavior) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        self.scroll.reset();
        let metrics = surface.scroll_metrics();
        surface.scroll_to(metrics.max_offset, behavior);
        true
    }

    /// True if the viewport is pinned to the bottom (trivially true with no
    /// surface attached).
    pub fn is_at_bottom(&self) -> bool {
        match self.surface.as_ref() {
            Some(surface) => self.scroll.is_at_bottom(surface.scroll_metrics()),
            None => true,
        }
    }

    /// True while automatic scrolling is suspended by a user scroll.
    pub fn is_user_scrolled_up(&self) -> bool {
        self.scroll.user_scrolled_up()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Persists the surface's rendered content to the durable slot.
    ///
    /// Best-effort: storage failures are logged and swallowed.
    pub fn save_logs(&mut self) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        let markup = surface.export_markup();
        if let Err(err) = self.store.set(&self.config.storage_key, &markup) {
            tracing::debug!(key = %self.config.storage_key, %err, "console save skipped");
        }
    }

    /// Restores persisted content onto the attached surface.
    ///
    /// Re-applies the eviction policy to the restored nodes (the slot may
    /// have been written under a larger `max_lines`) and re-persists when
    /// trimming occurred, self-healing over-sized stored logs. Small
    /// restored sets that fit the viewport fade in; anything larger appears
    /// immediately. The viewport jumps to the bottom on the next tick.
    pub fn load_logs(&mut self, now: Duration) {
        if self.surface.is_none() {
            return;
        }
        let stored = match self.store.get(&self.config.storage_key) {
            Ok(Some(stored)) if !stored.is_empty() => stored,
            Ok(_) => return,
            Err(err) => {
                tracing::debug!(key = %self.config.storage_key, %err, "console restore skipped");
                return;
            }
        };

        let mut trimmed = 0;
        if let Some(surface) = self.surface.as_mut() {
            surface.import_markup(&stored);

            let regular = surface
                .nodes()
                .iter()
                .filter(|n| !n.is_progress_indicator())
                .count();
            if regular > self.config.max_lines {
                trimmed = surface.remove_oldest_regular_nodes(regular - self.config.max_lines);
            }
        }
        if trimmed > 0 {
            tracing::debug!(trimmed, "restored console content exceeded cap");
            self.save_logs();
        }

        if let Some(surface) = self.surface.as_mut() {
            retag_restored(surface);
        }

        self.timers.arm_jump(now);
    }

    /// Wipes the surface and deletes the durable slot.
    pub fn clear_console(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.clear();
        }
        if let Err(err) = self.store.remove(&self.config.storage_key) {
            tracing::debug!(key = %self.config.storage_key, %err, "console clear left stored logs");
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Attaches a display surface, restoring persisted content first and
    /// then flushing anything buffered while detached.
    pub fn attach(&mut self, surface: S, now: Duration) {
        if self.detached {
            return;
        }
        self.surface = Some(surface);
        self.load_logs(now);
        if !self.buffer.is_empty() {
            self.schedule_flush(now);
        }
    }

    /// Takes the surface away without tearing the console down.
    ///
    /// Pending lines stay buffered; flushes re-arm until a surface returns.
    pub fn release_surface(&mut self) -> Option<S> {
        self.surface.take()
    }

    /// Tears the console down: cancels every timer and drops pending lines.
    ///
    /// Buffered-but-unflushed lines are lost; this is the accepted teardown
    /// edge. Later appends are silently dropped.
    pub fn detach(&mut self) -> Option<S> {
        self.detached = true;
        self.timers.cancel_all();
        self.buffer.clear();
        self.is_flushing = false;
        self.surface.take()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Snapshot of the pending (not yet rendered) lines, for diagnostics.
    pub fn buffered_lines(&self) -> Vec<LogLine> {
        self.buffer.iter().cloned().collect()
    }

    /// True when nothing is pending and no flush is executing.
    pub fn is_drained(&self) -> bool {
        self.buffer.is_empty() && !self.is_flushing
    }

    /// Attached surface, if any.
    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// Mutable access to the attached surface, for hosts feeding scroll
    /// positions back in.
    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    /// Full rendered text of the attached surface.
    pub fn rendered_text(&self) -> Option<String> {
        self.surface.as_ref().map(DisplaySurface::text_content)
    }

    /// Console configuration.
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }
}

/// Applies entrance animation to freshly restored nodes.
///
/// Restores of small content that fits the viewport fade in line by line;
/// larger restores appear immediately so hundreds of lines never animate.
fn retag_restored<S: DisplaySurface>(surface: &mut S) {
    let metrics = surface.scroll_metrics();
    if surface.nodes().len() >= RESTORE_ANIMATE_MAX || metrics.has_overflow() {
        return;
    }
    let nodes = surface
        .nodes()
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let mut node = node.clone();
            node.entrance = if node.is_progress_indicator() {
                Entrance::Immediate
            } else {
                Entrance::FadeIn {
                    delay: RESTORE_FADE_STRIDE * index as u32,
                }
            };
            node
        })
        .collect();
    surface.replace_nodes(nodes);
}

//! Sample-accurate event scheduling.
//!
//! [`EventQueue`] is a binary min-heap keyed by tick. [`Sequencer`] couples it
//! with a sampler: before every output sample it fires each callback whose
//! tick has come, so parameter changes land on exact sample boundaries.
//!
//! Events with equal ticks fire in no particular order. Events are one-shot;
//! a callback that wants to repeat schedules itself again.
//!
//! ```rust,ignore
//! fn pulse(seq: &mut Sequencer<Song>) {
//!     seq.state_mut().bank.oscillators[0].envelope.on();
//!     seq.schedule(10_000, pulse);
//! }
//!
//! let mut seq = Sequencer::with_capacity(song, 64);
//! seq.schedule(0, pulse);
//! seq.render(&mut buffer);
//! ```

use crate::frame::Signal;
use crate::sampler::Sampler;

const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
struct Entry<T> {
    t: u64,
    value: T,
}

/// Min-heap of values keyed by tick.
#[derive(Debug, Clone)]
pub struct EventQueue<T> {
    entries: Vec<Entry<T>>,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Pre-size the heap so inserts up to `capacity` never allocate.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, t: u64, value: T) {
        if self.entries.len() == self.entries.capacity() {
            // Grow to twice the new length
            self.entries.reserve_exact(self.entries.len() + 2);
        }
        self.entries.push(Entry { t, value });

        let mut i = self.entries.len() - 1;
        while i > 0 {
            let parent = (i - 1) >> 1;
            if self.entries[parent].t <= self.entries[i].t {
                break;
            }
            self.entries.swap(parent, i);
            i = parent;
        }
    }

    /// Tick of the earliest event.
    pub fn next_t(&self) -> Option<u64> {
        self.entries.first().map(|e| e.t)
    }

    /// Remove and return the earliest event.
    pub fn shift(&mut self) -> Option<T> {
        let last = self.entries.pop()?;
        if self.entries.is_empty() {
            return Some(last.value);
        }
        let root = std::mem::replace(&mut self.entries[0], last);

        let n = self.entries.len();
        let mut i = 0;
        loop {
            let left = (i << 1) + 1;
            let right = (i << 1) + 2;
            let mut smallest = i;
            if left < n && self.entries[left].t < self.entries[smallest].t {
                smallest = left;
            }
            if right < n && self.entries[right].t < self.entries[smallest].t {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.entries.swap(i, smallest);
            i = smallest;
        }

        Some(root.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A scheduled action. Receives the whole sequencer so it can reach the state
/// and schedule follow-up events.
pub type Callback<S> = fn(&mut Sequencer<S>);

/// Drives a sampler and fires scheduled callbacks on exact ticks.
pub struct Sequencer<S> {
    state: S,
    queue: EventQueue<Callback<S>>,
    now: u64,
}

impl<S> Sequencer<S> {
    pub fn new(state: S) -> Self {
        Self::with_capacity(state, DEFAULT_CAPACITY)
    }

    /// Pre-size the event queue so scheduling on the audio thread never
    /// allocates while fewer than `capacity` events are pending.
    pub fn with_capacity(state: S, capacity: usize) -> Self {
        Self {
            state,
            queue: EventQueue::with_capacity(capacity),
            now: 0,
        }
    }

    /// Fire `callback` `dt` ticks from now.
    pub fn schedule(&mut self, dt: u64, callback: Callback<S>) {
        self.queue.insert(self.now.saturating_add(dt), callback);
    }

    /// Fire `callback` at an absolute tick. Past ticks fire on the next dispatch.
    pub fn schedule_at(&mut self, tick: u64, callback: Callback<S>) {
        self.queue.insert(tick, callback);
    }

    /// Fire every callback that is due, including any a callback schedules
    /// for the current tick.
    pub fn dispatch(&mut self) {
        while let Some(t) = self.queue.next_t() {
            if t > self.now {
                break;
            }
            if let Some(callback) = self.queue.shift() {
                callback(self);
            }
        }
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Number of events waiting to fire.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }
}

impl<S: Sampler> Sequencer<S> {
    /// Fire due events, then produce one frame and advance the clock.
    #[inline]
    pub fn tick(&mut self) -> S::Frame {
        self.dispatch();
        let v = self.state.sample();
        self.now += 1;
        v
    }

    /// Fill `out`, sampling in runs between events.
    pub fn render(&mut self, out: &mut [S::Frame]) {
        let mut done = 0;
        while done < out.len() {
            self.dispatch();
            let remaining = out.len() - done;
            let run = match self.queue.next_t() {
                Some(t) => usize::try_from(t - self.now)
                    .unwrap_or(usize::MAX)
                    .min(remaining),
                None => remaining,
            };
            self.state.sample_into(&mut out[done..done + run]);
            self.now += run as u64;
            done += run;
        }
    }

    /// Fill an interleaved buffer of `channels` channels. Mono engines are
    /// copied into every channel.
    ///
    /// # Panics
    ///
    /// If `channels` is zero or `out` is not a whole number of frames.
    pub fn render_interleaved(&mut self, out: &mut [f32], channels: usize) {
        assert!(channels > 0, "interleaved output needs at least one channel");
        assert!(
            out.len() % channels == 0,
            "buffer of {} samples is not a whole number of {}-channel frames",
            out.len(),
            channels
        );
        for frame in out.chunks_exact_mut(channels) {
            self.tick().write_interleaved(frame);
        }
    }
}

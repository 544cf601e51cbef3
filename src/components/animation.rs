//! Timer-driven sprite animation.
//!
//! An [`Animation`] cycles the image shown by one shape through an ordered
//! list of frames at a fixed interval. Each playing animation owns one
//! background timer thread; the simulation tick never drives it, so frames
//! keep advancing while the world is paused.
//!
//! The timer thread only touches the shared [`FrameCursor`]. The shape itself
//! picks the frame up at draw time through [`Pattern::Animated`], so the shape
//! collection is never mutated off the main loop.
//!
//! # States
//!
//! `Idle -> Playing -> Finished | Stopped`
//!
//! - [`Animation::start`] is a no-op while playing. Starting a finished
//!   animation rewinds it; starting a stopped one resumes from its frame.
//! - [`Animation::stop`] signals the timer and joins it before returning, so
//!   no frame advances once it has returned.
//! - A non-looping animation freezes on its last frame, becomes `Finished`
//!   and invokes its finish callback exactly once.
//!
//! [`Pattern::Animated`]: crate::components::shape::Pattern::Animated

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::{debug, error, warn};

use crate::components::shape::ShapeId;

/// Interval used when an animation is created with a zero interval.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    Idle,
    Playing,
    Finished,
    Stopped,
}

impl AnimationState {
    fn to_u8(self) -> u8 {
        match self {
            AnimationState::Idle => 0,
            AnimationState::Playing => 1,
            AnimationState::Finished => 2,
            AnimationState::Stopped => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => AnimationState::Playing,
            2 => AnimationState::Finished,
            3 => AnimationState::Stopped,
            _ => AnimationState::Idle,
        }
    }
}

/// State shared between the owner and the timer thread.
struct Playback {
    frame: AtomicUsize,
    state: AtomicU8,
}

impl Playback {
    fn state(&self) -> AnimationState {
        AnimationState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: AnimationState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }
}

/// Read side of an animation, cheap to clone into a shape's pattern.
#[derive(Clone)]
pub struct FrameCursor {
    frames: Arc<[String]>,
    playback: Arc<Playback>,
}

impl FrameCursor {
    pub fn current_frame(&self) -> usize {
        self.playback.frame.load(Ordering::Acquire)
    }

    /// Texture key of the frame currently displayed.
    pub fn current_key(&self) -> Option<&str> {
        self.frames.get(self.current_frame()).map(String::as_str)
    }
}

impl fmt::Debug for FrameCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameCursor")
            .field("frame", &self.current_frame())
            .field("frames", &self.frames.len())
            .finish()
    }
}

/// Invoked from the timer thread with the animated shape.
pub type FinishCallback = Arc<dyn Fn(ShapeId) + Send + Sync>;

struct TimerTask {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct Animation {
    target: ShapeId,
    frames: Arc<[String]>,
    interval: Duration,
    looped: bool,
    playback: Arc<Playback>,
    on_finish: Option<FinishCallback>,
    task: Option<TimerTask>,
}

impl Animation {
    pub fn new<I, S>(target: ShapeId, interval: Duration, looped: bool, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let interval = if interval.is_zero() {
            DEFAULT_FRAME_INTERVAL
        } else {
            interval
        };
        Self {
            target,
            frames: frames.into_iter().map(Into::into).collect(),
            interval,
            looped,
            playback: Arc::new(Playback {
                frame: AtomicUsize::new(0),
                state: AtomicU8::new(AnimationState::Idle.to_u8()),
            }),
            on_finish: None,
            task: None,
        }
    }

    /// Set the callback run when a non-looping animation reaches its end.
    ///
    /// Takes effect on the next [`start`](Self::start).
    pub fn on_finish(&mut self, callback: impl Fn(ShapeId) + Send + Sync + 'static) -> &mut Self {
        self.on_finish = Some(Arc::new(callback));
        self
    }

    pub fn start(&mut self) -> &mut Self {
        if self.state() == AnimationState::Playing {
            return self;
        }
        if self.frames.is_empty() {
            warn!("Animation for {:?} has no frames; not starting", self.target);
            return self;
        }
        // A previous timer may still be unwinding after finishing.
        self.halt_timer();
        if self.state() == AnimationState::Finished {
            self.playback.frame.store(0, Ordering::Release);
        }
        self.playback.set_state(AnimationState::Playing);

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let timer = FrameTimer {
            stop_rx,
            playback: Arc::clone(&self.playback),
            frame_count: self.frames.len(),
            interval: self.interval,
            looped: self.looped,
            on_finish: self.on_finish.clone(),
            target: self.target,
        };
        match std::thread::Builder::new()
            .name("animation".to_string())
            .spawn(move || timer.run())
        {
            Ok(handle) => {
                debug!(
                    "Animation started for {:?} ({} frames, {:?})",
                    self.target,
                    self.frames.len(),
                    self.interval
                );
                self.task = Some(TimerTask { stop_tx, handle });
            }
            Err(e) => {
                error!("Failed to spawn animation timer: {}", e);
                self.playback.set_state(AnimationState::Stopped);
            }
        }
        self
    }

    /// Stop playback. Safe to call from any state.
    pub fn stop(&mut self) -> &mut Self {
        self.halt_timer();
        self.playback.set_state(AnimationState::Stopped);
        self
    }

    pub fn state(&self) -> AnimationState {
        self.playback.state()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == AnimationState::Playing
    }

    pub fn current_frame(&self) -> usize {
        self.playback.frame.load(Ordering::Acquire)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn target(&self) -> ShapeId {
        self.target
    }

    pub fn cursor(&self) -> FrameCursor {
        FrameCursor {
            frames: Arc::clone(&self.frames),
            playback: Arc::clone(&self.playback),
        }
    }

    /// Signal the timer thread and wait for it to exit.
    fn halt_timer(&mut self) {
        if let Some(task) = self.task.take() {
            // Capacity 1 and a single send per task: never blocks.
            let _ = task.stop_tx.try_send(());
            if task.handle.join().is_err() {
                error!("Animation timer for {:?} panicked", self.target);
            }
        }
    }
}

impl Drop for Animation {
    fn drop(&mut self) {
        self.halt_timer();
    }
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("target", &self.target)
            .field("frames", &self.frames.len())
            .field("interval", &self.interval)
            .field("looped", &self.looped)
            .field("state", &self.state())
            .field("frame", &self.current_frame())
            .finish()
    }
}

struct FrameTimer {
    stop_rx: Receiver<()>,
    playback: Arc<Playback>,
    frame_count: usize,
    interval: Duration,
    looped: bool,
    on_finish: Option<FinishCallback>,
    target: ShapeId,
}

impl FrameTimer {
    fn run(self) {
        let mut deadline = Instant::now() + self.interval;
        loop {
            match self.stop_rx.recv_deadline(deadline) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            }
            deadline += self.interval;

            let next = self.playback.frame.load(Ordering::Acquire) + 1;
            if next < self.frame_count {
                self.playback.frame.store(next, Ordering::Release);
            } else if self.looped {
                self.playback.frame.store(0, Ordering::Release);
            } else {
                self.playback.set_state(AnimationState::Finished);
                debug!("Animation finished for {:?}", self.target);
                if let Some(callback) = &self.on_finish {
                    callback(self.target);
                }
                return;
            }
        }
    }
}

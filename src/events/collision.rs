//! Collision callback context and deferred world commands.
//!
//! Collision callbacks run while the world is in the middle of a frame, so they
//! never get `&mut World`. Instead each callback receives a [`CollisionCtx`]:
//! read access to the current [`LevelContext`] plus a [`WorldCommands`] queue.
//! The world applies the queue once every callback of the tick has run.
//!
//! Callbacks fire once per contact and in no particular order, so the queue
//! folds repeated requests: the first level transition requested in a tick
//! wins, and a shape asking for the same sound from several contacts plays it
//! once. Different shapes triggering one sound still overlap.

use log::debug;

use crate::components::shape::ShapeId;
use crate::math::Vector2;
use crate::resources::levelcontext::LevelContext;

/// Level transition requested from a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelRequest {
    Next,
    Switch(usize),
}

/// Actions queued by collision callbacks, applied after the collision pass.
#[derive(Debug, Default)]
pub struct WorldCommands {
    pub(crate) sounds: Vec<String>,
    /// (requesting shape, sound) pairs already queued this tick.
    sound_requests: Vec<(Option<ShapeId>, String)>,
    source: Option<ShapeId>,
    pub(crate) level: Option<LevelRequest>,
    pub(crate) flags_set: Vec<String>,
    pub(crate) flags_cleared: Vec<String>,
    pub(crate) velocities: Vec<(ShapeId, Vector2)>,
}

impl WorldCommands {
    pub fn play_sound(&mut self, name: impl Into<String>) {
        let request = (self.source, name.into());
        if !self.sound_requests.contains(&request) {
            self.sounds.push(request.1.clone());
            self.sound_requests.push(request);
        }
    }

    pub fn next_level(&mut self) {
        self.request_level(LevelRequest::Next);
    }

    /// Out-of-range indices are reported in the log when the queue is applied.
    pub fn switch_to_level(&mut self, index: usize) {
        self.request_level(LevelRequest::Switch(index));
    }

    pub fn set_flag(&mut self, key: impl Into<String>) {
        self.flags_set.push(key.into());
    }

    pub fn clear_flag(&mut self, key: impl Into<String>) {
        self.flags_cleared.push(key.into());
    }

    /// Overwrite a shape's velocity after the collision pass.
    pub fn set_velocity(&mut self, shape: ShapeId, velocity: Vector2) {
        self.velocities.push((shape, velocity));
    }

    pub fn level_request(&self) -> Option<LevelRequest> {
        self.level
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
            && self.level.is_none()
            && self.flags_set.is_empty()
            && self.flags_cleared.is_empty()
            && self.velocities.is_empty()
    }

    fn request_level(&mut self, request: LevelRequest) {
        match self.level {
            None => self.level = Some(request),
            Some(pending) => debug!(
                "Level request {:?} ignored, {:?} already pending",
                request, pending
            ),
        }
    }
}

/// What a collision callback gets to work with.
pub struct CollisionCtx<'a> {
    this: ShapeId,
    context: &'a LevelContext,
    commands: &'a mut WorldCommands,
}

impl<'a> CollisionCtx<'a> {
    pub fn new(this: ShapeId, context: &'a LevelContext, commands: &'a mut WorldCommands) -> Self {
        commands.source = Some(this);
        Self {
            this,
            context,
            commands,
        }
    }

    /// The shape whose callback is running.
    pub fn this(&self) -> ShapeId {
        self.this
    }

    pub fn context(&self) -> &LevelContext {
        self.context
    }

    pub fn commands(&mut self) -> &mut WorldCommands {
        &mut *self.commands
    }

    /// True when `other` is the shape stored under `key` in the level context.
    pub fn is(&self, key: &str, other: ShapeId) -> bool {
        self.context.is_shape(key, other)
    }
}

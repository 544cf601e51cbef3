//! Simulation clock resource.
//!
//! The world is the single owner of simulation time. Only
//! [`World::tick`](crate::world::World::tick) advances it; animations and
//! audio playback run on their own clocks.

use bevy_ecs::prelude::Resource;

#[derive(Resource, Debug, Clone, Copy)]
pub struct WorldTime {
    /// Seconds of simulated time since the world was created.
    pub elapsed: f64,
    /// Scaled delta of the current tick, in seconds.
    pub delta: f64,
    pub time_scale: f64,
    /// Ticks run so far.
    pub frame_count: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: 0.0,
            delta: 0.0,
            time_scale: 1.0,
            frame_count: 0,
        }
    }
}

impl WorldTime {
    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Apply `time_scale` to the unscaled frame delta and advance the clock.
    pub fn advance(&mut self, dt: f64) {
        let scaled_dt = dt * self.time_scale;
        self.elapsed += scaled_dt;
        self.delta = scaled_dt;
        self.frame_count += 1;
    }
}

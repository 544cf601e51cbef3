//! The world: shapes, physics, levels, events and audio in one place.
//!
//! Shapes are stored as entities in a `bevy_ecs` world and simulated by a
//! schedule of systems. Everything around the simulation (the level state
//! machine, the event bus, audio, input) lives on [`World`] itself.
//!
//! # Frame
//!
//! [`World::tick`] runs, in order:
//! 1. advance the simulation clock;
//! 2. unless paused: movement (gravity, air resistance, velocity, limits),
//!    then the collision pass;
//! 3. collision callbacks, their queued commands, then `Collision` events;
//! 4. drain messages from the audio thread;
//! 5. the current level's `tick`.
//!
//! [`World::render`] clears to the background, draws every shape in
//! registration order and then calls the current level's `render`.
//!
//! # Level transitions
//!
//! Loading a level despawns every shape that is not [`Persistent`], replaces
//! the [`LevelContext`] (stopping its animations), builds the new level's map,
//! runs its `init` and finally emits [`Event::LevelChanged`].

use std::time::Duration;

use bevy_ecs::prelude::*;
use log::{debug, info, trace, warn};

use crate::components::animation::Animation;
use crate::components::draworder::DrawOrder;
use crate::components::persistent::Persistent;
use crate::components::shape::{Color, Pattern, Shape, ShapeId, ShapeProps};
use crate::error::{EngineError, Result};
use crate::events::bus::{Event, EventBus, EventKind};
use crate::events::collision::{CollisionCtx, LevelRequest, WorldCommands};
use crate::level::{Level, LoopData};
use crate::math::Vector2;
use crate::resources::assets::AssetSource;
use crate::resources::audio::{AudioManager, AudioPlayer};
use crate::resources::gameconfig::WorldConfig;
use crate::resources::input::{InputState, Key, MouseButton};
use crate::resources::levelcontext::LevelContext;
use crate::resources::worldtime::WorldTime;
use crate::systems::collision::{Contact, Contacts, collision_system};
use crate::systems::movement::movement_system;
use crate::systems::render::{Surface, render_pass};

/// Thickness of the walls installed by [`World::create_borders`].
pub const BORDER_THICKNESS: f64 = 50.0;
pub const BORDER_NAME: &str = "border";

pub struct World {
    ecs: bevy_ecs::world::World,
    update: Schedule,
    config: WorldConfig,
    levels: Vec<Level>,
    current: Option<usize>,
    context: LevelContext,
    events: EventBus,
    audio: AudioManager,
    input: InputState,
    next_draw_order: u64,
}

impl World {
    /// World with a headless audio thread.
    pub fn new(config: WorldConfig) -> Result<Self> {
        let audio = AudioManager::headless(config.sample_rate)?;
        Ok(Self::with_audio(config, audio))
    }

    pub fn with_audio(config: WorldConfig, audio: AudioManager) -> Self {
        let mut ecs = bevy_ecs::world::World::new();
        ecs.insert_resource(WorldTime::default().with_time_scale(1.0));
        ecs.insert_resource(config.physics());
        ecs.init_resource::<Contacts>();

        let mut update = Schedule::default();
        update.add_systems(movement_system);
        update.add_systems(collision_system.after(movement_system));

        info!(
            "World '{}' created ({}x{})",
            config.title, config.width, config.height
        );

        Self {
            ecs,
            update,
            config,
            levels: Vec::new(),
            current: None,
            context: LevelContext::default(),
            events: EventBus::default(),
            audio,
            input: InputState::default(),
            next_draw_order: 0,
        }
    }

    // ---------------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------------

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn width(&self) -> f64 {
        self.config.width
    }

    pub fn height(&self) -> f64 {
        self.config.height
    }

    pub fn background(&self) -> Color {
        self.config.background
    }

    pub fn set_background(&mut self, color: Color) {
        self.config.background = color;
    }

    pub fn gravity(&self) -> Vector2 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vector2) {
        self.config.gravity = gravity;
        self.sync_physics();
    }

    pub fn set_air_resistance(&mut self, air_resistance: f64) {
        self.config.air_resistance = air_resistance;
        self.sync_physics();
    }

    pub fn set_has_limits(&mut self, has_limits: bool) {
        self.config.has_limits = has_limits;
        self.sync_physics();
    }

    pub fn is_paused(&self) -> bool {
        self.config.paused
    }

    /// Paused worlds skip movement and collision. Level ticks, input events
    /// and animations keep running.
    pub fn set_paused(&mut self, paused: bool) {
        if self.config.paused != paused {
            debug!("World {}", if paused { "paused" } else { "resumed" });
        }
        self.config.paused = paused;
    }

    /// Size of one map cell in world units.
    pub fn cell_size(&self) -> (f64, f64) {
        (self.config.cell_width, self.config.cell_height)
    }

    pub fn time(&self) -> &WorldTime {
        self.ecs.resource::<WorldTime>()
    }

    fn sync_physics(&mut self) {
        self.ecs.insert_resource(self.config.physics());
    }

    // ---------------------------------------------------------------------
    // Shapes
    // ---------------------------------------------------------------------

    /// Add a shape to the world. Registering the same shape twice gives two
    /// independent shapes.
    pub fn register(&mut self, shape: Shape) -> ShapeId {
        let order = DrawOrder(self.next_draw_order);
        self.next_draw_order += 1;
        let entity = self.ecs.spawn((shape, order)).id();
        ShapeId::from_entity(entity)
    }

    /// Install four static walls just outside the world rectangle.
    ///
    /// Borders survive level transitions. Calling this again returns the
    /// existing borders.
    pub fn create_borders(&mut self) -> Vec<ShapeId> {
        let existing: Vec<ShapeId> = self
            .ecs
            .query_filtered::<(Entity, &Shape), With<Persistent>>()
            .iter(&self.ecs)
            .filter(|(_, shape)| shape.name.as_deref() == Some(BORDER_NAME))
            .map(|(entity, _)| ShapeId::from_entity(entity))
            .collect();
        if !existing.is_empty() {
            debug!("Borders already installed");
            return existing;
        }

        let (w, h, t) = (self.config.width, self.config.height, BORDER_THICKNESS);
        let walls = [
            (-t, -t, w + 2.0 * t, t),
            (-t, h, w + 2.0 * t, t),
            (-t, 0.0, t, h),
            (w, 0.0, t, h),
        ];
        walls
            .into_iter()
            .map(|(x, y, width, height)| {
                let shape = Shape::new(ShapeProps {
                    name: Some(BORDER_NAME.to_string()),
                    x,
                    y,
                    width,
                    height,
                    friction: 0.5,
                    is_body: true,
                    rotation_lock: true,
                    ..Default::default()
                });
                let id = self.register(shape);
                self.ecs.entity_mut(id.entity()).insert(Persistent);
                id
            })
            .collect()
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.ecs.get::<Shape>(id.entity())
    }

    pub fn shape_mut(&mut self, id: ShapeId) -> Option<Mut<'_, Shape>> {
        self.ecs.get_mut::<Shape>(id.entity())
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.shape(id).is_some()
    }

    /// All shapes in registration order.
    pub fn shape_ids(&self) -> Vec<ShapeId> {
        let Some(mut query) = self
            .ecs
            .try_query_filtered::<(Entity, &DrawOrder), With<Shape>>()
        else {
            return Vec::new();
        };
        let mut ids: Vec<(DrawOrder, Entity)> = query
            .iter(&self.ecs)
            .map(|(entity, order)| (*order, entity))
            .collect();
        ids.sort_by_key(|(order, _)| *order);
        ids.into_iter()
            .map(|(_, entity)| ShapeId::from_entity(entity))
            .collect()
    }

    pub fn shape_count(&self) -> usize {
        self.ecs
            .try_query::<&Shape>()
            .map_or(0, |mut query| query.iter(&self.ecs).count())
    }

    /// First registered shape with this name.
    pub fn find_by_name(&self, name: &str) -> Option<ShapeId> {
        self.find_all(|shape| shape.name.as_deref() == Some(name))
            .into_iter()
            .next()
    }

    pub fn find_all_by_name(&self, name: &str) -> Vec<ShapeId> {
        self.find_all(|shape| shape.name.as_deref() == Some(name))
    }

    pub fn find_all_by_tag(&self, tag: &str) -> Vec<ShapeId> {
        self.find_all(|shape| shape.tag.as_deref() == Some(tag))
    }

    fn find_all(&self, predicate: impl Fn(&Shape) -> bool) -> Vec<ShapeId> {
        let Some(mut query) = self.ecs.try_query::<(Entity, &Shape, &DrawOrder)>() else {
            return Vec::new();
        };
        let mut found: Vec<(DrawOrder, Entity)> = query
            .iter(&self.ecs)
            .filter(|(_, shape, _)| predicate(shape))
            .map(|(entity, _, order)| (*order, entity))
            .collect();
        found.sort_by_key(|(order, _)| *order);
        found
            .into_iter()
            .map(|(_, entity)| ShapeId::from_entity(entity))
            .collect()
    }

    /// Contacts found by the most recent collision pass.
    pub fn contacts(&self) -> &Contacts {
        self.ecs.resource::<Contacts>()
    }

    // ---------------------------------------------------------------------
    // Levels
    // ---------------------------------------------------------------------

    /// Append a level and return its index.
    pub fn add_level(&mut self, level: Level) -> usize {
        debug!("Added level {} '{}'", self.levels.len(), level.name);
        self.levels.push(level);
        self.levels.len() - 1
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn current_level(&self) -> Option<usize> {
        self.current
    }

    pub fn current_level_name(&self) -> Option<&str> {
        self.current
            .and_then(|index| self.levels.get(index))
            .map(|level| level.name.as_str())
    }

    /// Load the first level.
    pub fn start(&mut self) -> Result<()> {
        self.switch_to_level(0)
    }

    /// Load the level at `index`. Out-of-range indices leave the world
    /// untouched.
    pub fn switch_to_level(&mut self, index: usize) -> Result<()> {
        if index >= self.levels.len() {
            return Err(EngineError::OutOfRange {
                index,
                len: self.levels.len(),
            });
        }
        self.load_level(index);
        Ok(())
    }

    /// Advance to the following level. At the last level this does nothing
    /// and returns `false`. With no level loaded it loads the first one.
    pub fn next_level(&mut self) -> bool {
        let next = self.current.map_or(0, |index| index + 1);
        if next >= self.levels.len() {
            info!("No level after {:?}; staying", self.current);
            return false;
        }
        self.load_level(next);
        true
    }

    /// Reload the current level from scratch.
    pub fn restart_level(&mut self) -> bool {
        match self.current {
            Some(index) => {
                self.load_level(index);
                true
            }
            None => false,
        }
    }

    fn load_level(&mut self, index: usize) {
        let from = self.current;
        let level = self.levels[index].clone();
        info!("Loading level {} '{}' (from {:?})", index, level.name, from);

        self.clear_level_shapes();
        self.context = LevelContext::default();
        self.current = Some(index);

        let (cell_w, cell_h) = self.cell_size();
        for (row, col, symbol) in level.map.cells() {
            let position = Vector2::new(col as f64 * cell_w, row as f64 * cell_h);
            match level.items.get(symbol) {
                Some(factory) => factory(self, position, cell_w, cell_h),
                None => trace!("No map item for '{}' at row {} col {}", symbol, row, col),
            }
        }

        if let Some(init) = level.init_fn() {
            init(self);
        }

        self.emit(Event::LevelChanged { from, to: index });
    }

    fn clear_level_shapes(&mut self) {
        let doomed: Vec<Entity> = self
            .ecs
            .query_filtered::<Entity, (With<Shape>, Without<Persistent>)>()
            .iter(&self.ecs)
            .collect();
        debug!("Despawning {} level shapes", doomed.len());
        for entity in doomed {
            self.ecs.despawn(entity);
        }
        self.ecs.resource_mut::<Contacts>().clear();
    }

    /// State shared by the current level's callbacks.
    pub fn context(&self) -> &LevelContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut LevelContext {
        &mut self.context
    }

    // ---------------------------------------------------------------------
    // Frame
    // ---------------------------------------------------------------------

    /// Advance the world by `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        self.ecs.resource_mut::<WorldTime>().advance(dt.max(0.0));

        if !self.config.paused {
            self.update.run(&mut self.ecs);
            self.dispatch_contacts();
        }

        for message in self.audio.poll_messages() {
            trace!("audio: {:?}", message);
        }

        if let Some(tick) = self.current_level_ref().and_then(Level::tick_fn) {
            let time = *self.ecs.resource::<WorldTime>();
            let data = LoopData {
                delta: time.delta,
                elapsed: time.elapsed,
                frame: time.frame_count,
                input: self.input.clone(),
            };
            tick(self, &data);
        }

        self.ecs.clear_trackers();
    }

    pub fn render(&mut self, surface: &mut dyn Surface) {
        render_pass(&mut self.ecs, self.config.background, surface);
        if let Some(render) = self.current_level_ref().and_then(Level::render_fn) {
            render(self, surface);
        }
    }

    fn current_level_ref(&self) -> Option<&Level> {
        self.current.and_then(|index| self.levels.get(index))
    }

    /// Run collision callbacks for the last pass, apply what they queued and
    /// publish the contacts as events.
    fn dispatch_contacts(&mut self) {
        let contacts: Vec<Contact> = self.ecs.resource::<Contacts>().iter().copied().collect();
        if contacts.is_empty() {
            return;
        }

        let mut commands = WorldCommands::default();
        for contact in &contacts {
            for (this, other) in [(contact.a, contact.b), (contact.b, contact.a)] {
                let callback = self.shape(this).and_then(|shape| shape.on_collision().cloned());
                if let Some(callback) = callback {
                    let mut ctx = CollisionCtx::new(this, &self.context, &mut commands);
                    callback(&mut ctx, other);
                }
            }
        }
        if !commands.is_empty() {
            self.apply_commands(commands);
        }

        for contact in contacts {
            // A queued level change may have removed either shape.
            if self.contains(contact.a) && self.contains(contact.b) {
                self.emit(Event::Collision {
                    a: contact.a,
                    b: contact.b,
                });
            }
        }
    }

    fn apply_commands(&mut self, commands: WorldCommands) {
        let WorldCommands {
            sounds,
            level,
            flags_set,
            flags_cleared,
            velocities,
            ..
        } = commands;

        for (id, velocity) in velocities {
            if let Some(mut shape) = self.shape_mut(id) {
                shape.velocity = velocity;
            }
        }
        for key in flags_set {
            self.context.set_flag(key);
        }
        for key in flags_cleared {
            self.context.clear_flag(&key);
        }
        for name in sounds {
            if let Err(e) = self.play_sound(&name) {
                warn!("Collision sound '{}' not played: {}", name, e);
            }
        }
        match level {
            Some(LevelRequest::Next) => {
                self.next_level();
            }
            Some(LevelRequest::Switch(index)) => {
                if let Err(e) = self.switch_to_level(index) {
                    warn!("Level switch from collision ignored: {}", e);
                }
            }
            None => {}
        }
    }

    // ---------------------------------------------------------------------
    // Events and input
    // ---------------------------------------------------------------------

    /// Subscribe to every event of `kind`.
    pub fn on(
        &mut self,
        kind: EventKind,
        handler: impl Fn(&mut World, &Event) + Send + Sync + 'static,
    ) {
        self.events.on(kind, std::sync::Arc::new(handler));
    }

    /// Call every handler subscribed to this event's kind.
    pub fn emit(&mut self, event: Event) {
        for handler in self.events.handlers(event.kind()) {
            handler(self, &event);
        }
    }

    /// Feed the keys and mouse buttons held this frame. Emits key and mouse
    /// events for everything that changed since the previous call.
    pub fn set_input(
        &mut self,
        keys: impl IntoIterator<Item = Key>,
        buttons: impl IntoIterator<Item = MouseButton>,
        mouse_position: Vector2,
    ) {
        self.input.update(keys, buttons, mouse_position);

        let position = self.input.mouse_position;
        let mut events: Vec<Event> = Vec::new();
        events.extend(self.input.just_pressed_keys().map(|key| Event::KeyDown { key }));
        events.extend(self.input.just_released_keys().map(|key| Event::KeyUp { key }));
        events.extend(
            self.input
                .just_pressed_buttons()
                .map(|button| Event::MouseDown { button, position }),
        );
        events.extend(
            self.input
                .just_released_buttons()
                .map(|button| Event::MouseUp { button, position }),
        );
        for event in events {
            self.emit(event);
        }
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.input.is_key_down(key)
    }

    // ---------------------------------------------------------------------
    // Audio
    // ---------------------------------------------------------------------

    pub fn load_sound(&self, name: &str, source: &dyn AssetSource, path: &str) -> Result<()> {
        self.audio.load_sound(name, source, path)
    }

    pub fn load_music(&self, name: &str, source: &dyn AssetSource, path: &str) -> Result<()> {
        self.audio.load_music(name, source, path)
    }

    pub fn play_sound(&self, name: &str) -> Result<()> {
        self.audio.play_sound(name)
    }

    pub fn play_music(&self, name: &str, looped: bool) -> Result<()> {
        self.audio.play_music(name, looped)
    }

    pub fn stop_music(&self, name: &str) {
        self.audio.stop_music(name);
    }

    pub fn create_test_tone(&self, name: &str, frequency: f64, duration: Duration) {
        self.audio.create_test_tone(name, frequency, duration);
    }

    pub fn audio(&self) -> &AudioManager {
        &self.audio
    }

    /// Play handle that can be moved to other threads.
    pub fn audio_player(&self) -> AudioPlayer {
        self.audio.player()
    }

    // ---------------------------------------------------------------------
    // Animation
    // ---------------------------------------------------------------------

    /// Show `animation` on its target shape, start it, and hand it to the
    /// level context so it stops when the level is torn down.
    ///
    /// Returns the animation's index in the context.
    pub fn play_animation(&mut self, mut animation: Animation) -> Result<usize> {
        let target = animation.target();
        let cursor = animation.cursor();
        {
            let mut shape = self
                .shape_mut(target)
                .ok_or_else(|| EngineError::NotFound(format!("shape {:?}", target)))?;
            shape.pattern = Pattern::Animated(cursor);
        }
        animation.start();
        Ok(self.context.add_animation(animation))
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("title", &self.config.title)
            .field("levels", &self.levels.len())
            .field("current", &self.current)
            .field("paused", &self.config.paused)
            .field("audio", &self.audio)
            .finish()
    }
}

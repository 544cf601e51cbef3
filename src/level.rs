//! Levels: tile maps plus lifecycle callbacks.
//!
//! A [`Level`] is a template. Loading it into a [`World`] parses its [`Map`]
//! row by row, calling the [`MapItems`] factory registered for each
//! character, then runs its `init` callback. While the level is current its
//! `tick` runs once per frame and its `render` draws on top of the shapes.
//!
//! Levels keep no state of their own. Anything a level needs to remember
//! between callbacks (the player shape, counters, flags) goes into the
//! world's [`LevelContext`](crate::resources::levelcontext::LevelContext),
//! which is replaced on every transition.

use std::sync::Arc;

use log::warn;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::math::Vector2;
use crate::resources::input::InputState;
use crate::systems::render::Surface;
use crate::world::World;

/// Builds whatever a map character stands for. Called with the cell's
/// top-left world position and the cell width and height.
pub type MapFactory = Arc<dyn Fn(&mut World, Vector2, f64, f64) + Send + Sync>;
pub type InitFn = Arc<dyn Fn(&mut World) + Send + Sync>;
pub type TickFn = Arc<dyn Fn(&mut World, &LoopData) + Send + Sync>;
pub type RenderFn = Arc<dyn Fn(&World, &mut dyn Surface) + Send + Sync>;

/// Per-tick data handed to a level's `tick` callback.
#[derive(Debug, Clone, Default)]
pub struct LoopData {
    /// Seconds since the previous tick.
    pub delta: f64,
    /// Seconds of simulated time so far.
    pub elapsed: f64,
    pub frame: u64,
    pub input: InputState,
}

/// Symbol table from map characters to factories.
#[derive(Clone, Default)]
pub struct MapItems {
    factories: FxHashMap<char, MapFactory>,
}

impl MapItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for `symbol`, replacing any previous one.
    pub fn insert(
        &mut self,
        symbol: char,
        factory: impl Fn(&mut World, Vector2, f64, f64) + Send + Sync + 'static,
    ) {
        self.factories.insert(symbol, Arc::new(factory));
    }

    pub fn get(&self, symbol: char) -> Option<&MapFactory> {
        self.factories.get(&symbol)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for MapItems {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut symbols: Vec<char> = self.factories.keys().copied().collect();
        symbols.sort_unstable();
        f.debug_struct("MapItems").field("symbols", &symbols).finish()
    }
}

/// Rows of map characters, top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Map {
    rows: Vec<String>,
}

impl Map {
    pub fn new<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows: Vec<String> = rows.into_iter().map(Into::into).collect();
        if let Some(first) = rows.first() {
            let width = first.chars().count();
            if rows.iter().any(|row| row.chars().count() != width) {
                warn!("Map rows have different widths; short rows are treated as empty space");
            }
        }
        Self { rows }
    }

    /// Parse a JSON array of row strings.
    pub fn from_json(text: &str) -> Result<Self> {
        let rows: Vec<String> = serde_json::from_str(text)
            .map_err(|e| EngineError::Decode(format!("invalid map: {}", e)))?;
        Ok(Self::new(rows))
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Widest row, in characters.
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.chars().count())
            .max()
            .unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Every non-space character as `(row, column, symbol)`, top to bottom
    /// and left to right.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, char)> + '_ {
        self.rows.iter().enumerate().flat_map(|(row, line)| {
            line.chars()
                .enumerate()
                .filter(|(_, symbol)| *symbol != ' ')
                .map(move |(col, symbol)| (row, col, symbol))
        })
    }
}

#[derive(Clone, Default)]
pub struct Level {
    pub name: String,
    pub map: Map,
    pub items: MapItems,
    init: Option<InitFn>,
    tick: Option<TickFn>,
    render: Option<RenderFn>,
}

impl Level {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_map(mut self, map: Map) -> Self {
        self.map = map;
        self
    }

    pub fn with_item(
        mut self,
        symbol: char,
        factory: impl Fn(&mut World, Vector2, f64, f64) + Send + Sync + 'static,
    ) -> Self {
        self.items.insert(symbol, factory);
        self
    }

    pub fn with_items(mut self, items: MapItems) -> Self {
        self.items = items;
        self
    }

    /// Runs after the map has been built.
    pub fn on_init(mut self, init: impl Fn(&mut World) + Send + Sync + 'static) -> Self {
        self.init = Some(Arc::new(init));
        self
    }

    pub fn on_tick(mut self, tick: impl Fn(&mut World, &LoopData) + Send + Sync + 'static) -> Self {
        self.tick = Some(Arc::new(tick));
        self
    }

    pub fn on_render(
        mut self,
        render: impl Fn(&World, &mut dyn Surface) + Send + Sync + 'static,
    ) -> Self {
        self.render = Some(Arc::new(render));
        self
    }

    pub fn init_fn(&self) -> Option<InitFn> {
        self.init.clone()
    }

    pub fn tick_fn(&self) -> Option<TickFn> {
        self.tick.clone()
    }

    pub fn render_fn(&self) -> Option<RenderFn> {
        self.render.clone()
    }
}

impl std::fmt::Debug for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Level")
            .field("name", &self.name)
            .field("map", &(self.map.width(), self.map.height()))
            .field("items", &self.items)
            .field("init", &self.init.is_some())
            .field("tick", &self.tick.is_some())
            .field("render", &self.render.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_skip_spaces_in_reading_order() {
        let map = Map::new(["# @", " o "]);
        let cells: Vec<_> = map.cells().collect();
        assert_eq!(cells, vec![(0, 0, '#'), (0, 2, '@'), (1, 1, 'o')]);
        assert_eq!(map.width(), 3);
        assert_eq!(map.height(), 2);
    }

    #[test]
    fn test_map_from_json() {
        let map = Map::from_json(r####"["###", "#@#", "###"]"####).unwrap();
        assert_eq!(map.rows().len(), 3);
        assert_eq!(map.cells().count(), 9);
        assert!(matches!(
            Map::from_json(r#"{"rows": 3}"#),
            Err(EngineError::Decode(_))
        ));
    }

    #[test]
    fn test_level_builder() {
        let level = Level::new("one")
            .with_map(Map::new(["#"]))
            .with_item('#', |_, _, _, _| {})
            .on_init(|_| {});
        assert_eq!(level.name, "one");
        assert_eq!(level.items.len(), 1);
        assert!(level.items.get('#').is_some());
        assert!(level.items.get('x').is_none());
        assert!(level.init_fn().is_some());
        assert!(level.tick_fn().is_none());
    }
}

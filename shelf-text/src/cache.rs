//! Glyph directory: character → rectangle in the atlas.
//!
//! Entries are never removed. A surface resize keeps existing pixels at
//! their coordinates, so every stored rectangle stays valid for the life
//! of the atlas.

use rustc_hash::FxHashMap;

use crate::quad::GlyphRect;

#[derive(Clone, Debug, Default)]
pub struct GlyphCache {
    entries: FxHashMap<char, GlyphRect>,
}

impl GlyphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, c: char) -> Option<GlyphRect> {
        self.entries.get(&c).copied()
    }

    pub fn contains(&self, c: char) -> bool {
        self.entries.contains_key(&c)
    }

    /// Record a placement. Keys are unique: the first placement wins.
    pub fn insert(&mut self, c: char, rect: GlyphRect) -> GlyphRect {
        *self.entries.entry(c).or_insert(rect)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, GlyphRect)> + '_ {
        self.entries.iter().map(|(&c, &r)| (c, r))
    }
}

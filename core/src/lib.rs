use core::ops::Index;
use serde::{Deserialize, Serialize};

pub use card::*;
pub use engine::*;
pub use error::*;
pub use generator::*;
pub use store::*;
pub use types::*;

mod card;
mod engine;
mod error;
mod generator;
mod store;
mod types;

/// Normalized settings for one round: board side length and difficulty level.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundConfig {
    grid_size: GridSize,
    level: Level,
}

impl RoundConfig {
    pub const MIN_GRID: GridSize = 2;
    pub const MAX_GRID: GridSize = 10;
    pub const MIN_LEVEL: Level = 1;
    pub const MAX_LEVEL: Level = 5;

    pub const fn new_unchecked(grid_size: GridSize, level: Level) -> Self {
        Self { grid_size, level }
    }

    /// Clamps `grid_size` to `[2, 10]` and rounds it up to the nearest even
    /// number, clamps `level` to `[1, 5]`. Never fails.
    pub fn new(grid_size: GridSize, level: Level) -> Self {
        let mut grid_size = grid_size.clamp(Self::MIN_GRID, Self::MAX_GRID);
        if grid_size % 2 != 0 {
            grid_size += 1;
        }
        let level = level.clamp(Self::MIN_LEVEL, Self::MAX_LEVEL);
        Self::new_unchecked(grid_size, level)
    }

    pub const fn grid_size(&self) -> GridSize {
        self.grid_size
    }

    pub const fn level(&self) -> Level {
        self.level
    }

    pub const fn total_cards(&self) -> CardCount {
        square(self.grid_size)
    }

    pub const fn pair_count(&self) -> CardCount {
        (self.total_cards() + 1) / 2
    }

    /// Move budget for the round, shrinking by 10% per level above 1.
    pub fn max_moves(&self) -> MoveCount {
        let level_factor = 1.0 - f64::from(self.level - 1) * 0.1;
        (f64::from(self.total_cards()) * 1.5 * level_factor).ceil() as MoveCount
    }
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self::new_unchecked(4, 1)
    }
}

/// Ordered card layout for one round, indexed by [`CardId`].
///
/// Invariant on generated boards: every value present appears exactly twice.
/// [`Board::from_values`] leaves upholding that to the caller; the engine
/// tolerates unpaired boards, they just cannot be won.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    cards: Vec<Card>,
}

impl Board {
    /// Builds a board from explicit pair values, assigning ids by position.
    pub fn from_values(values: impl IntoIterator<Item = CardValue>) -> Self {
        let cards = values
            .into_iter()
            .enumerate()
            .map(|(id, value)| Card {
                id: id as CardId,
                value,
            })
            .collect();
        Self { cards }
    }

    pub fn len(&self) -> CardCount {
        self.cards.len() as CardCount
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, id: CardId) -> bool {
        usize::from(id) < self.cards.len()
    }

    pub fn get(&self, id: CardId) -> Option<Card> {
        self.cards.get(usize::from(id)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Card> + '_ {
        self.cards.iter().copied()
    }

    /// Whether every value on the board appears exactly twice.
    pub fn is_fully_paired(&self) -> bool {
        use std::collections::BTreeMap;

        let mut counts: BTreeMap<CardValue, u32> = BTreeMap::new();
        for card in &self.cards {
            *counts.entry(card.value).or_default() += 1;
        }
        counts.values().all(|&count| count == 2)
    }
}

impl Index<CardId> for Board {
    type Output = Card;

    fn index(&self, id: CardId) -> &Self::Output {
        &self.cards[usize::from(id)]
    }
}

use serde::{Deserialize, Serialize};

use crate::types::{CardId, CardValue};

/// One card in the layout: a stable position id and the pair value it hides.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub value: CardValue,
}

/// Player-visible face of a single card.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CardFace {
    Down,
    Up,
    Solved,
}

impl CardFace {
    /// Whether the card value is currently visible to the player.
    pub const fn is_visible(self) -> bool {
        matches!(self, Self::Up | Self::Solved)
    }

    pub const fn is_solved(self) -> bool {
        matches!(self, Self::Solved)
    }
}

impl Default for CardFace {
    fn default() -> Self {
        Self::Down
    }
}

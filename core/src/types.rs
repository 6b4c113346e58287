/// Board side length in cards.
pub type GridSize = u8;

/// Difficulty level, 1 (lenient move budget) to 5 (tight move budget).
pub type Level = u8;

/// 0-based card position, unique and stable for the duration of a round.
pub type CardId = u16;

/// Pair identity shared by exactly two cards on a board.
pub type CardValue = u8;

/// Count type for cards on a board.
pub type CardCount = u16;

/// Count of completed two-card reveal attempts.
pub type MoveCount = u16;

/// Round score; higher is better.
pub type Score = u32;

pub const fn square(side: GridSize) -> CardCount {
    let side = side as CardCount;
    side.saturating_mul(side)
}

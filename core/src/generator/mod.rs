use crate::*;
pub use random::*;

mod random;

/// Produces the card layout for a fresh round.
pub trait BoardGenerator {
    fn generate(self, config: RoundConfig) -> Board;
}

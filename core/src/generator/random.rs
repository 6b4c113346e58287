use super::*;

/// Generation strategy that duplicates the value sequence `1..=pair_count` and
/// applies a uniform Fisher-Yates shuffle.
///
/// A comparator-based sort-by-random shuffle is statistically biased, so the
/// shuffle goes through `rand` instead.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShuffledBoardGenerator {
    seed: u64,
}

impl ShuffledBoardGenerator {
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl BoardGenerator for ShuffledBoardGenerator {
    fn generate(self, config: RoundConfig) -> Board {
        use rand::prelude::*;

        let total = config.total_cards();
        let pair_count = config.pair_count();

        let mut values: Vec<CardValue> = (1..=pair_count)
            .map(|value| value as CardValue)
            .flat_map(|value| [value, value])
            .collect();

        let mut rng = SmallRng::seed_from_u64(self.seed);
        values.shuffle(&mut rng);
        values.truncate(total.into());

        let board = Board::from_values(values);

        // double check the pairing invariant
        if !board.is_fully_paired() {
            log::warn!(
                "generated board is not fully paired, total: {}, pairs: {}",
                total,
                pair_count
            );
        }
        board
    }
}

use std::collections::BTreeSet;
use std::time::Duration;

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::*;

/// How long a mismatched pair is nominally held face-up before the timing
/// collaborator calls [`GameEngine::resolve_mismatch`]. The engine never
/// schedules this itself; it only exposes the locked state.
pub const MISMATCH_HOLD: Duration = Duration::from_millis(1000);

/// Valid transitions:
/// - InProgress -> Won
/// - InProgress -> Lost
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// Round is being played
    InProgress,
    /// Every pair was found within the move budget
    Won,
    /// Move budget exhausted with pairs still hidden
    Lost,
}

impl Outcome {
    /// Indicates the round has ended and no moves are accepted anymore
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }

    pub const fn is_won(self) -> bool {
        matches!(self, Self::Won)
    }
}

impl Default for Outcome {
    fn default() -> Self {
        Self::InProgress
    }
}

/// Outcome of revealing a card
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RevealOutcome {
    /// Input was dropped: locked, round over, invalid id, or a repeat click
    NoChange,
    /// First card of a turn went face-up; presentation maps this to its
    /// click feedback
    Flipped,
    /// Second card completed a pair
    Matched,
    /// Second card did not match; the engine is locked until
    /// [`GameEngine::resolve_mismatch`] runs
    Mismatched,
    /// This move completed the last pair within the budget
    Won,
    /// This move exhausted the move budget
    Lost,
}

impl RevealOutcome {
    /// Whether this outcome could have caused an update to the board view
    pub const fn has_update(self) -> bool {
        use RevealOutcome::*;
        match self {
            NoChange => false,
            Flipped => true,
            Matched => true,
            Mismatched => true,
            Won => true,
            Lost => true,
        }
    }
}

/// Outcome of clearing the mismatch hold
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ResolveOutcome {
    NoChange,
    Cleared,
}

impl ResolveOutcome {
    pub const fn has_update(self) -> bool {
        matches!(self, Self::Cleared)
    }
}

/// The spec-visible reveal set: empty, one card face-up, or two mismatched
/// cards held face-up while input is locked.
#[derive(Copy, Clone, Debug, PartialEq)]
enum FlipState {
    None,
    One(CardId),
    Mismatch(CardId, CardId),
}

impl FlipState {
    const fn involves(self, id: CardId) -> bool {
        match self {
            Self::None => false,
            Self::One(a) => a == id,
            Self::Mismatch(a, b) => a == id || b == id,
        }
    }
}

/// Score for a won round: the percentage of the move budget left unspent,
/// scaled by ten and rounded.
pub fn efficiency_score(max_moves: MoveCount, move_count: MoveCount) -> Score {
    if max_moves == 0 {
        return 0;
    }
    let spare = f64::from(max_moves.saturating_sub(move_count));
    let efficiency = (spare / f64::from(max_moves) * 100.0).max(0.0);
    (efficiency * 10.0).round() as Score
}

/// Single-round game state machine plus best-score tracking.
///
/// All transitions are synchronous; the only externally-driven step is
/// [`GameEngine::resolve_mismatch`], which the embedding timing collaborator
/// must invoke once per [`RevealOutcome::Mismatched`], nominally after
/// [`MISMATCH_HOLD`]. Reveals arriving during the hold are dropped, never
/// queued. There is no way to abort a hold early; it always resolves through
/// the external timer.
#[derive(Clone, Debug)]
pub struct GameEngine<S = MemoryScoreStore> {
    config: RoundConfig,
    board: Board,
    flips: FlipState,
    solved: BTreeSet<CardId>,
    move_count: MoveCount,
    outcome: Outcome,
    score: Score,
    best_score: Score,
    rng: SmallRng,
    store: S,
}

impl<S: ScoreStore> GameEngine<S> {
    /// Builds an engine, loads the persisted best score (degrading to 0 on
    /// storage failure), and starts the first round.
    pub fn new(config: RoundConfig, seed: u64, store: S) -> Self {
        let mut engine = Self::bare(config, seed, store);
        engine.start();
        engine
    }

    /// Builds an engine over an explicit first board, for replays and
    /// deterministic setups. Later rounds reshuffle from `seed`.
    pub fn with_board(config: RoundConfig, board: Board, seed: u64, store: S) -> Self {
        let mut engine = Self::bare(config, seed, store);
        engine.board = board;
        engine
    }

    fn bare(config: RoundConfig, seed: u64, store: S) -> Self {
        let best_score = store.load().unwrap_or_else(|err| {
            log::warn!("could not load best score, starting from 0: {err}");
            0
        });
        Self {
            config,
            board: Board::from_values([]),
            flips: FlipState::None,
            solved: BTreeSet::new(),
            move_count: 0,
            outcome: Outcome::InProgress,
            score: 0,
            best_score,
            rng: SmallRng::seed_from_u64(seed),
            store,
        }
    }

    /// Replaces the configuration (clamped via [`RoundConfig::new`]) and
    /// starts a fresh round. Never fails.
    pub fn configure(&mut self, grid_size: GridSize, level: Level) {
        self.config = RoundConfig::new(grid_size, level);
        self.start();
    }

    /// Discards the current round and deals a freshly shuffled board.
    pub fn start(&mut self) {
        let seed: u64 = self.rng.random();
        self.board = ShuffledBoardGenerator::new(seed).generate(self.config);
        self.flips = FlipState::None;
        self.solved.clear();
        self.move_count = 0;
        self.outcome = Outcome::InProgress;
        self.score = 0;
        log::debug!(
            "new round: {size}x{size} grid, level {level}, {moves} moves allowed",
            size = self.config.grid_size(),
            level = self.config.level(),
            moves = self.max_moves(),
        );
    }

    /// Same as [`GameEngine::start`] with the configuration unchanged.
    pub fn reset(&mut self) {
        self.start();
    }

    /// Turns the card at `id` face-up.
    ///
    /// Silently ignored while the mismatch hold is active, after the round
    /// ended, for out-of-range or already-solved ids, and for a repeat click
    /// on the sole face-up card. A second distinct card costs one move and is
    /// evaluated immediately.
    pub fn reveal(&mut self, id: CardId) -> RevealOutcome {
        use RevealOutcome::*;

        if self.outcome.is_final() || !self.board.contains(id) || self.solved.contains(&id) {
            return NoChange;
        }

        match self.flips {
            // input during the mismatch hold is dropped, never queued
            FlipState::Mismatch(..) => NoChange,
            FlipState::None => {
                self.flips = FlipState::One(id);
                log::trace!("card {id} flipped");
                Flipped
            }
            FlipState::One(first) if first == id => NoChange,
            FlipState::One(first) => {
                self.move_count += 1;
                if self.board[first].value == self.board[id].value {
                    self.flips = FlipState::None;
                    self.solved.insert(first);
                    self.solved.insert(id);
                    log::debug!("cards {first} and {id} matched on move {}", self.move_count);
                    self.check_outcome();
                    match self.outcome {
                        Outcome::Won => Won,
                        Outcome::Lost => Lost,
                        Outcome::InProgress => Matched,
                    }
                } else {
                    self.flips = FlipState::Mismatch(first, id);
                    log::debug!(
                        "cards {first} and {id} mismatched on move {}",
                        self.move_count
                    );
                    self.check_outcome();
                    if self.outcome.is_final() { Lost } else { Mismatched }
                }
            }
        }
    }

    /// Clears the mismatch hold and unlocks input.
    ///
    /// Invoked by the timing collaborator once per mismatch, after the
    /// nominal [`MISMATCH_HOLD`] delay. Idempotent, and still clears when the
    /// round was lost during the hold.
    pub fn resolve_mismatch(&mut self) -> ResolveOutcome {
        match self.flips {
            FlipState::Mismatch(a, b) => {
                self.flips = FlipState::None;
                log::trace!("mismatch hold cleared for cards {a} and {b}");
                self.check_outcome();
                ResolveOutcome::Cleared
            }
            _ => ResolveOutcome::NoChange,
        }
    }

    /// Post-condition check run after every change to the solved set or move
    /// count. The solved check runs first so a round that completes its last
    /// pair on the final allowed move counts as a win.
    fn check_outcome(&mut self) {
        if self.outcome.is_final() {
            return;
        }

        if !self.board.is_empty() && self.solved.len() == usize::from(self.board.len()) {
            self.outcome = Outcome::Won;
            self.score = efficiency_score(self.max_moves(), self.move_count);
            log::debug!("round won in {} moves, score {}", self.move_count, self.score);
            if self.score > self.best_score {
                self.best_score = self.score;
                if let Err(err) = self.store.save(self.best_score) {
                    log::warn!("could not persist best score {}: {err}", self.best_score);
                }
            }
        } else if self.move_count >= self.max_moves() {
            self.outcome = Outcome::Lost;
            log::debug!("move budget of {} exhausted, round lost", self.max_moves());
        }
    }

    pub const fn config(&self) -> RoundConfig {
        self.config
    }

    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Whether a mismatch hold is active and input is being dropped.
    pub const fn is_locked(&self) -> bool {
        matches!(self.flips, FlipState::Mismatch(..))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub const fn move_count(&self) -> MoveCount {
        self.move_count
    }

    pub fn max_moves(&self) -> MoveCount {
        self.config.max_moves()
    }

    pub fn moves_left(&self) -> MoveCount {
        self.max_moves().saturating_sub(self.move_count)
    }

    /// Score of the current round; non-zero only once it has been won.
    pub const fn score(&self) -> Score {
        self.score
    }

    pub const fn best_score(&self) -> Score {
        self.best_score
    }

    pub fn solved_count(&self) -> CardCount {
        self.solved.len() as CardCount
    }

    pub fn card_at(&self, id: CardId) -> Option<Card> {
        self.board.get(id)
    }

    /// Player-visible face of the card at `id`.
    pub fn face_at(&self, id: CardId) -> CardFace {
        if self.solved.contains(&id) {
            CardFace::Solved
        } else if self.flips.involves(id) {
            CardFace::Up
        } else {
            CardFace::Down
        }
    }

    /// Board view for the presentation layer, in position order.
    pub fn cards(&self) -> impl Iterator<Item = (Card, CardFace)> + '_ {
        self.board.iter().map(|card| (card, self.face_at(card.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    fn engine_2x2(level: Level) -> GameEngine {
        // board: ids 0,1 share value 1; ids 2,3 share value 2
        GameEngine::with_board(
            RoundConfig::new_unchecked(2, level),
            Board::from_values([1, 1, 2, 2]),
            7,
            MemoryScoreStore::default(),
        )
    }

    /// Ids grouped into matching pairs, for driving generated boards.
    fn value_pairs<S: ScoreStore>(engine: &GameEngine<S>) -> Vec<(CardId, CardId)> {
        use std::collections::BTreeMap;

        let mut groups: BTreeMap<CardValue, Vec<CardId>> = BTreeMap::new();
        for card in engine.board().iter() {
            groups.entry(card.value).or_default().push(card.id);
        }
        groups.values().map(|ids| (ids[0], ids[1])).collect()
    }

    fn mismatch_once(engine: &mut GameEngine) {
        assert_eq!(engine.reveal(0), RevealOutcome::Flipped);
        let outcome = engine.reveal(2);
        assert!(matches!(
            outcome,
            RevealOutcome::Mismatched | RevealOutcome::Lost
        ));
        engine.resolve_mismatch();
    }

    #[test]
    fn first_flip_turns_one_card_up() {
        let mut engine = engine_2x2(1);

        assert_eq!(engine.reveal(0), RevealOutcome::Flipped);
        assert_eq!(engine.face_at(0), CardFace::Up);
        assert_eq!(engine.move_count(), 0);
        assert!(!engine.is_locked());
    }

    #[test]
    fn reclicking_the_sole_flipped_card_is_a_no_op() {
        let mut engine = engine_2x2(1);

        engine.reveal(0);
        assert_eq!(engine.reveal(0), RevealOutcome::NoChange);
        assert_eq!(engine.move_count(), 0);
        assert_eq!(engine.face_at(0), CardFace::Up);
    }

    #[test]
    fn out_of_range_id_is_dropped() {
        let mut engine = engine_2x2(1);

        assert_eq!(engine.reveal(42), RevealOutcome::NoChange);
        assert_eq!(engine.move_count(), 0);
    }

    #[test]
    fn matching_pair_moves_both_cards_to_solved() {
        let mut engine = engine_2x2(1);

        engine.reveal(0);
        assert_eq!(engine.reveal(1), RevealOutcome::Matched);

        assert_eq!(engine.move_count(), 1);
        assert_eq!(engine.face_at(0), CardFace::Solved);
        assert_eq!(engine.face_at(1), CardFace::Solved);
        assert_eq!(engine.solved_count(), 2);
        assert!(!engine.is_locked());
        // solved cards no longer respond
        assert_eq!(engine.reveal(0), RevealOutcome::NoChange);
    }

    #[test]
    fn mismatch_locks_input_until_resolved() {
        let mut engine = engine_2x2(1);

        engine.reveal(0);
        assert_eq!(engine.reveal(2), RevealOutcome::Mismatched);

        assert!(engine.is_locked());
        assert_eq!(engine.move_count(), 1);
        assert_eq!(engine.face_at(0), CardFace::Up);
        assert_eq!(engine.face_at(2), CardFace::Up);
        // reveals during the hold are dropped, not queued
        assert_eq!(engine.reveal(3), RevealOutcome::NoChange);
        assert_eq!(engine.face_at(3), CardFace::Down);

        assert_eq!(engine.resolve_mismatch(), ResolveOutcome::Cleared);
        assert!(!engine.is_locked());
        assert_eq!(engine.face_at(0), CardFace::Down);
        assert_eq!(engine.face_at(2), CardFace::Down);
        assert_eq!(engine.solved_count(), 0);
        // a second resolve is a no-op
        assert_eq!(engine.resolve_mismatch(), ResolveOutcome::NoChange);
    }

    #[test]
    fn winning_on_the_final_allowed_move_is_a_win() {
        // 2x2 at level 1 has a budget of 6 moves
        let mut engine = engine_2x2(1);
        assert_eq!(engine.max_moves(), 6);

        for _ in 0..4 {
            mismatch_once(&mut engine);
        }
        assert_eq!(engine.move_count(), 4);

        engine.reveal(0);
        assert_eq!(engine.reveal(1), RevealOutcome::Matched);
        engine.reveal(2);
        // move 6 both exhausts the budget and completes the board
        assert_eq!(engine.reveal(3), RevealOutcome::Won);
        assert_eq!(engine.outcome(), Outcome::Won);
        assert_eq!(engine.moves_left(), 0);
        assert_eq!(engine.score(), 0);
    }

    #[test]
    fn exhausting_the_budget_loses_with_zero_score() {
        let mut engine = engine_2x2(1);

        for _ in 0..5 {
            mismatch_once(&mut engine);
        }
        engine.reveal(0);
        assert_eq!(engine.reveal(2), RevealOutcome::Lost);

        assert_eq!(engine.outcome(), Outcome::Lost);
        assert_eq!(engine.score(), 0);
        // the final mismatch hold still resolves through the timer
        assert!(engine.is_locked());
        assert_eq!(engine.resolve_mismatch(), ResolveOutcome::Cleared);
        // and the finished round ignores further input
        assert_eq!(engine.reveal(0), RevealOutcome::NoChange);
    }

    #[test]
    fn score_formula_matches_the_budget_share() {
        assert_eq!(efficiency_score(20, 5), 750);
        assert_eq!(efficiency_score(20, 20), 0);
        assert_eq!(efficiency_score(20, 0), 1000);
        assert_eq!(efficiency_score(6, 2), 667);
        assert_eq!(efficiency_score(0, 0), 0);
    }

    #[test]
    fn best_score_only_moves_upward() {
        let mut engine = engine_2x2(1);

        // perfect play: 2 moves out of 6 -> round((4/6)*100*10) = 667
        engine.reveal(0);
        engine.reveal(1);
        engine.reveal(2);
        assert_eq!(engine.reveal(3), RevealOutcome::Won);
        assert_eq!(engine.score(), 667);
        assert_eq!(engine.best_score(), 667);

        // a sloppier win must not lower the record
        engine.reset();
        let pairs = value_pairs(&engine);
        for _ in 0..3 {
            let (a, _) = pairs[0];
            let (b, _) = pairs[1];
            engine.reveal(a);
            engine.reveal(b);
            engine.resolve_mismatch();
        }
        for (a, b) in pairs {
            engine.reveal(a);
            engine.reveal(b);
        }
        assert_eq!(engine.outcome(), Outcome::Won);
        assert!(engine.score() < 667);
        assert_eq!(engine.best_score(), 667);
    }

    #[test]
    fn generated_rounds_can_be_played_to_a_win() {
        let mut engine = GameEngine::new(RoundConfig::new(4, 3), 42, MemoryScoreStore::default());

        for (a, b) in value_pairs(&engine) {
            engine.reveal(a);
            let outcome = engine.reveal(b);
            // the last pair reports the win instead of a plain match
            assert!(matches!(
                outcome,
                RevealOutcome::Matched | RevealOutcome::Won
            ));
        }
        assert_eq!(engine.outcome(), Outcome::Won);
        assert_eq!(engine.move_count(), engine.config().pair_count());
    }

    #[test]
    fn configure_normalizes_and_redeals() {
        let mut engine = GameEngine::new(RoundConfig::default(), 1, MemoryScoreStore::default());

        engine.configure(3, 2);
        assert_eq!(engine.config().grid_size(), 4);
        assert_eq!(engine.board().len(), 16);

        engine.configure(11, 1);
        assert_eq!(engine.config().grid_size(), 10);
        assert_eq!(engine.board().len(), 100);

        engine.configure(1, 5);
        assert_eq!(engine.config().grid_size(), 2);
        assert_eq!(engine.board().len(), 4);
    }

    #[test]
    fn reset_deals_an_independently_shuffled_valid_board() {
        let mut engine = GameEngine::new(RoundConfig::new(6, 1), 5, MemoryScoreStore::default());

        engine.reveal(0);
        engine.reset();
        assert_eq!(engine.move_count(), 0);
        assert_eq!(engine.outcome(), Outcome::InProgress);
        assert_eq!(engine.solved_count(), 0);
        assert!(engine.board().is_fully_paired());

        engine.reset();
        assert!(engine.board().is_fully_paired());
        assert_eq!(engine.board().len(), 36);
    }

    #[test]
    fn engine_keeps_playing_when_the_store_fails() {
        struct BrokenStore;

        impl ScoreStore for BrokenStore {
            fn load(&self) -> crate::Result<Score> {
                Err(StoreError::Io(std::io::Error::other("no disk")))
            }

            fn save(&mut self, _best: Score) -> crate::Result<()> {
                Err(StoreError::Io(std::io::Error::other("no disk")))
            }
        }

        let mut engine = GameEngine::with_board(
            RoundConfig::new_unchecked(2, 1),
            Board::from_values([1, 1, 2, 2]),
            7,
            BrokenStore,
        );
        assert_eq!(engine.best_score(), 0);

        engine.reveal(0);
        engine.reveal(1);
        engine.reveal(2);
        assert_eq!(engine.reveal(3), RevealOutcome::Won);
        // the record survives in memory even though the write failed
        assert_eq!(engine.best_score(), 667);
    }
}

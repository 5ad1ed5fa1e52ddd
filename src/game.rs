//! Nim rules engine
//!
//! Pure game state: five piles and the turn indicator. No I/O.

use crate::error::MoveError;
use crate::types::{ClientId, PlayerNumber};

/// Number of piles on the board
pub const PILE_COUNT: usize = 5;

/// Starting stone count of each pile
pub const INITIAL_PILES: [u32; PILE_COUNT] = [1, 3, 5, 7, 9];

/// One Nim match
///
/// Piles only ever shrink. The game is over once every pile is empty.
#[derive(Debug, Clone)]
pub struct Game {
    /// Connection identities, indexed by `PlayerNumber::index`
    pub players: [ClientId; 2],
    piles: [u32; PILE_COUNT],
    turn: PlayerNumber,
}

impl Game {
    /// Create a game with the standard starting board; player one moves first
    pub fn new(p1: ClientId, p2: ClientId) -> Self {
        Self {
            players: [p1, p2],
            piles: INITIAL_PILES,
            turn: PlayerNumber::One,
        }
    }

    pub fn turn(&self) -> PlayerNumber {
        self.turn
    }

    #[cfg(test)]
    pub fn piles(&self) -> &[u32; PILE_COUNT] {
        &self.piles
    }

    /// Reject a move from anyone but the turn holder
    pub fn check_turn(&self, acting: PlayerNumber) -> Result<(), MoveError> {
        if acting == self.turn {
            Ok(())
        } else {
            Err(MoveError::Impatient)
        }
    }

    /// Validate and apply a move
    ///
    /// Does not flip the turn; the session does that after a successful move.
    pub fn apply_move(
        &mut self,
        acting: PlayerNumber,
        pile: i64,
        quantity: i64,
    ) -> Result<(), MoveError> {
        self.check_turn(acting)?;

        let index = usize::try_from(pile)
            .ok()
            .filter(|&i| i < PILE_COUNT)
            .ok_or(MoveError::PileIndex(pile))?;

        let remaining = self.piles[index];
        let taken = u32::try_from(quantity)
            .ok()
            .filter(|&q| q > 0 && q <= remaining)
            .ok_or(MoveError::Quantity(quantity))?;

        self.piles[index] = remaining - taken;
        Ok(())
    }

    pub fn advance_turn(&mut self) {
        self.turn = self.turn.other();
    }

    /// True once every pile is empty
    pub fn is_over(&self) -> bool {
        self.stones_left() == 0
    }

    /// Winner by the last-move rule: the player opposite the current turn
    ///
    /// Only meaningful after the emptying move has flipped the turn.
    pub fn winner(&self) -> PlayerNumber {
        self.turn.other()
    }

    /// Space-separated pile counts, pile 0 first
    pub fn board(&self) -> String {
        self.piles
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn stones_left(&self) -> u32 {
        self.piles.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_game() -> Game {
        Game::new(ClientId::new(), ClientId::new())
    }

    #[test]
    fn test_game_creation() {
        let game = new_game();
        assert_eq!(game.board(), "1 3 5 7 9");
        assert_eq!(game.turn(), PlayerNumber::One);
        assert_eq!(game.stones_left(), 25);
        assert!(!game.is_over());
    }

    #[test]
    fn test_first_legal_move() {
        let mut game = new_game();
        assert!(game.apply_move(PlayerNumber::One, 0, 1).is_ok());
        assert_eq!(game.board(), "0 3 5 7 9");

        game.advance_turn();
        assert_eq!(game.turn(), PlayerNumber::Two);
    }

    #[test]
    fn test_quantity_exceeding_pile() {
        let mut game = new_game();
        assert_eq!(
            game.apply_move(PlayerNumber::One, 0, 5),
            Err(MoveError::Quantity(5))
        );
        assert_eq!(game.board(), "1 3 5 7 9");
        assert_eq!(game.turn(), PlayerNumber::One);
    }

    #[test]
    fn test_rejections_leave_state_unchanged() {
        let mut game = new_game();
        assert_eq!(
            game.apply_move(PlayerNumber::Two, 1, 1),
            Err(MoveError::Impatient)
        );
        assert_eq!(
            game.apply_move(PlayerNumber::One, 5, 1),
            Err(MoveError::PileIndex(5))
        );
        assert_eq!(
            game.apply_move(PlayerNumber::One, -1, 1),
            Err(MoveError::PileIndex(-1))
        );
        assert_eq!(
            game.apply_move(PlayerNumber::One, 2, 0),
            Err(MoveError::Quantity(0))
        );
        assert_eq!(
            game.apply_move(PlayerNumber::One, 2, -3),
            Err(MoveError::Quantity(-3))
        );
        assert_eq!(game.board(), "1 3 5 7 9");
        assert_eq!(game.turn(), PlayerNumber::One);
    }

    #[test]
    fn test_turn_checked_before_pile() {
        let game = new_game();
        assert_eq!(game.check_turn(PlayerNumber::Two), Err(MoveError::Impatient));
        assert_eq!(game.check_turn(PlayerNumber::One), Ok(()));
    }

    #[test]
    fn test_piles_shrink_until_over() {
        let mut game = new_game();
        let mut previous = *game.piles();
        let mut stones = game.stones_left();

        // Take one stone at a time from the first non-empty pile.
        while !game.is_over() {
            let pile = game.piles().iter().position(|&p| p > 0).unwrap();
            let mover = game.turn();
            game.apply_move(mover, pile as i64, 1).unwrap();

            for (now, before) in game.piles().iter().zip(previous.iter()) {
                assert!(now <= before);
            }
            assert!(game.stones_left() < stones);

            previous = *game.piles();
            stones = game.stones_left();
            game.advance_turn();
            assert_eq!(game.turn(), mover.other());
        }

        assert_eq!(game.stones_left(), 0);
        assert_eq!(game.board(), "0 0 0 0 0");
    }

    #[test]
    fn test_every_move_from_several_boards() {
        let mut boards = vec![new_game()];
        for moves in [
            &[(0, 1)][..],
            &[(2, 3), (4, 9)][..],
            &[(0, 1), (1, 3), (2, 4), (3, 7)][..],
        ] {
            let mut game = new_game();
            for &(pile, quantity) in moves {
                let mover = game.turn();
                game.apply_move(mover, pile, quantity).unwrap();
                game.advance_turn();
            }
            boards.push(game);
        }

        for start in &boards {
            let mover = start.turn();
            for pile in -2..=PILE_COUNT as i64 + 1 {
                for quantity in -2..=11 {
                    // The player off turn is refused whatever the move.
                    let mut game = start.clone();
                    assert_eq!(
                        game.apply_move(mover.other(), pile, quantity),
                        Err(MoveError::Impatient)
                    );
                    assert_eq!(game.piles(), start.piles());

                    let result = game.apply_move(mover, pile, quantity);

                    let target = usize::try_from(pile).ok().filter(|&i| i < PILE_COUNT);
                    match target {
                        None => assert_eq!(result, Err(MoveError::PileIndex(pile))),
                        Some(i) if quantity < 1 || quantity > i64::from(start.piles()[i]) => {
                            assert_eq!(result, Err(MoveError::Quantity(quantity)));
                        }
                        Some(i) => {
                            assert_eq!(result, Ok(()));
                            let mut expected = *start.piles();
                            expected[i] -= quantity as u32;
                            assert_eq!(game.piles(), &expected);
                            assert_eq!(
                                game.stones_left(),
                                start.stones_left() - quantity as u32
                            );
                        }
                    }
                    if result.is_err() {
                        assert_eq!(game.piles(), start.piles());
                    }
                    assert_eq!(game.turn(), mover);
                }
            }
        }
    }

    #[test]
    fn test_player_two_takes_last_stone() {
        let mut game = new_game();
        // Empty everything but pile 4, then let player two finish it.
        for (pile, count) in [(0, 1), (1, 3), (2, 5), (3, 7)] {
            let mover = game.turn();
            game.apply_move(mover, pile, count).unwrap();
            game.advance_turn();
        }
        game.apply_move(PlayerNumber::One, 4, 8).unwrap();
        game.advance_turn();
        game.apply_move(PlayerNumber::Two, 4, 1).unwrap();
        game.advance_turn();

        assert!(game.is_over());
        assert_eq!(game.winner(), PlayerNumber::Two);
        assert_eq!(game.board(), "0 0 0 0 0");
    }
}

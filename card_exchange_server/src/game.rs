// Game orchestrator.
//
// `Game` owns every connected `Player`, the pile, and the server's RNG, and
// drives one game through its phases:
//
//  1. parameters and player names
//  2. first-player search (random single-card draws, round-robin, until a
//     Jack shows up)
//  3. suit selection by the first player
//  4. turn order (first player gets ordinal 1, the rest keep their order)
//  5. suit broadcast
//  6. the real deal: the pile is rebuilt from fresh decks, so the cards drawn
//     during the search are discarded along with their holders' hands
//  7. initial hands log
//  8. concurrent play, one thread per player, through a `RoundCoordinator`
//  9. final hands log and scoring
// 10. teardown: `GAME_OVER` plus the result tag to every player; an aborted
//     game still ends this way, with `YOU_LOSE` for everyone
//
// The search deal in phase 2 and the real deal in phase 6 are deliberately
// separate; only the first player and the suit survive the search.
//
// A player whose exchange fails at any phase forfeits (see `player.rs`) and
// the game carries on with the others. Failures that leave no sensible game
// (no first player, the first player unable to pick a suit, everyone
// forfeited, a pile capacity violation) end the game with a `GameError`.

use std::io;
use std::sync::Arc;
use std::thread;

use card_exchange_prng::CardRng;
use card_exchange_protocol::{
    CapacityError, Card, CardCollection, GameResult, ProtocolError, Rank, Suit, hand_score,
};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::GameConfig;
use crate::coordinator::{RoundCoordinator, TurnEvent, TurnOrdinal};
use crate::log::GameLog;
use crate::player::Player;

/// Drawing a card of this rank during the search makes its holder first.
pub const FIRST_PLAYER_RANK: Rank = Rank::Jack;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("failed to accept players: {0}")]
    Accept(#[source] io::Error),

    #[error("no first player: no Jack was drawn")]
    NoFirstPlayer,

    #[error("first player {player} could not choose a suit: {source}")]
    SuitSelection {
        player: String,
        source: ProtocolError,
    },

    #[error("{player} already plays turn {existing}")]
    TurnAlreadyAssigned {
        player: String,
        existing: TurnOrdinal,
    },

    #[error("{0} has no turn assigned")]
    TurnNotAssigned(String),

    #[error("pile capacity violated: {0}")]
    Capacity(#[from] CapacityError),

    #[error("every player forfeited")]
    AllPlayersForfeited,

    #[error("a player worker panicked")]
    WorkerPanicked,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Index into `GameReport::standings`.
    Winner(usize),
    Tied,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Standing {
    pub name: String,
    pub turn: TurnOrdinal,
    /// `None` for a forfeited player.
    pub score: Option<u32>,
    pub hand: Vec<Card>,
    pub forfeited: bool,
}

#[derive(Clone, Debug)]
pub struct GameReport {
    pub outcome: Outcome,
    /// In turn order.
    pub standings: Vec<Standing>,
    pub first_player: String,
    pub selected_suit: Suit,
    /// Pile size left over after the real deal.
    pub pile_after_deal: usize,
    pub turn_log: Vec<TurnEvent>,
}

impl GameReport {
    pub fn winner(&self) -> Option<&Standing> {
        match self.outcome {
            Outcome::Winner(index) => self.standings.get(index),
            Outcome::Tied => None,
        }
    }
}

pub struct Game {
    config: GameConfig,
    players: Vec<Player>,
    pile: CardCollection,
    rng: CardRng,
    log: Arc<GameLog>,
}

impl Game {
    /// A game over already-connected players, in accept order.
    pub fn new(config: GameConfig, players: Vec<Player>, rng: CardRng, log: Arc<GameLog>) -> Self {
        Self {
            config,
            players,
            pile: CardCollection::with_capacity_limit(config.pile_capacity()),
            rng,
            log,
        }
    }

    pub fn run(mut self) -> Result<GameReport, GameError> {
        let result = self.run_phases();
        if let Err(e) = &result {
            error!(error = %e, "game aborted");
            self.announce(None);
        }
        for player in &self.players {
            player.disconnect();
        }
        self.log.flush();
        result
    }

    fn run_phases(&mut self) -> Result<GameReport, GameError> {
        self.log_parameters();
        self.collect_names();

        self.pile.add_decks(self.config.decks as usize)?;
        self.pile.shuffle(&mut self.rng);
        let first = self.determine_first_player().ok_or(GameError::NoFirstPlayer)?;
        let first_player = self.players[first].name().to_string();
        let suit = self.select_suit(first)?;

        self.order_turns(first)?;
        self.broadcast_suit(suit);
        self.deal()?;
        let pile_after_deal = self.pile.len();

        self.log.heading("INITIAL HANDS");
        self.log.blank();
        self.log_hands();

        let turn_log = self.play()?;

        self.log.heading("FINAL HANDS");
        self.log.blank();
        let hands = self.log_hands();

        let scores: Vec<Option<u32>> = hands
            .iter()
            .map(|hand| hand.as_ref().map(|cards| hand_score(cards, suit)))
            .collect();
        let outcome = decide_outcome(&scores).ok_or(GameError::AllPlayersForfeited)?;
        self.log_scores(&scores, outcome);
        self.announce(Some(outcome));

        let standings = self
            .players
            .iter()
            .zip(hands)
            .zip(&scores)
            .zip(TurnOrdinal::all(self.config.players))
            .map(|(((player, hand), score), ordinal)| Standing {
                name: player.name().to_string(),
                turn: player.turn().unwrap_or(ordinal),
                score: *score,
                hand: hand.unwrap_or_default(),
                forfeited: !player.is_active(),
            })
            .collect();

        Ok(GameReport {
            outcome,
            standings,
            first_player,
            selected_suit: suit,
            pile_after_deal,
            turn_log,
        })
    }

    fn log_parameters(&self) {
        self.log.heading("GAME PARAMETERS");
        self.log.blank();
        self.log.line(format_args!("--Number of decks: {}", self.config.decks));
        self.log.line(format_args!("--Number of players: {}", self.config.players));
    }

    fn collect_names(&mut self) {
        for player in &mut self.players {
            if let Some(name) = player.exchange("name", |conn| conn.name()) {
                player.set_name(name);
            }
        }
        self.log.line("\n--PLAYER NAMES:");
        for player in &self.players {
            info!(player = player.name(), seat = player.seat(), "player joined");
            self.log.line(format_args!("----{}", player.name()));
        }
    }

    /// Deal single random cards round-robin to the active players until a
    /// `FIRST_PLAYER_RANK` card is drawn. Returns the index of its holder.
    fn determine_first_player(&mut self) -> Option<usize> {
        let active: Vec<usize> = (0..self.players.len())
            .filter(|&i| self.players[i].is_active())
            .collect();
        if active.is_empty() {
            return None;
        }

        let limit = self.config.deal_count() * self.players.len();
        let mut drawn = Vec::new();
        while drawn.len() < limit {
            let Some(card) = self.pile.draw_random(&mut self.rng) else {
                break;
            };
            drawn.push(card);
            if card.rank == FIRST_PLAYER_RANK {
                break;
            }
        }

        self.log.line("\n--DETERMINING FIRST PLAYER:");
        for (i, card) in drawn.iter().enumerate() {
            let holder = &self.players[active[i % active.len()]];
            self.log.line(format_args!("----{card} dealt to {}", holder.name()));
        }

        let first = active[first_to_draw(&drawn, active.len())?];
        let name = self.players[first].name();
        info!(player = name, draws = drawn.len(), "first player determined");
        self.log.line(format_args!("\n--FIRST PLAYER: {name}"));
        Some(first)
    }

    fn select_suit(&mut self, first: usize) -> Result<Suit, GameError> {
        let player = &mut self.players[first];
        match player.notify_regardless(|conn| conn.choose_suit()) {
            Ok(suit) => {
                info!(player = player.name(), %suit, "suit selected");
                self.log.line(format_args!("--SELECTED SUIT: {suit}\n"));
                Ok(suit)
            }
            Err(source) => {
                player.forfeit(format_args!("suit selection: {source}"));
                Err(GameError::SuitSelection {
                    player: player.name().to_string(),
                    source,
                })
            }
        }
    }

    fn order_turns(&mut self, first: usize) -> Result<(), GameError> {
        let first = self.players.remove(first);
        self.players.insert(0, first);
        let ordinals = TurnOrdinal::all(self.config.players);
        for (player, ordinal) in self.players.iter_mut().zip(ordinals) {
            player.assign_turn(ordinal)?;
        }

        self.log.heading("ORDER OF TURNS");
        self.log.blank();
        for player in &self.players {
            if let Some(turn) = player.turn() {
                self.log.line(format_args!("----{turn} -> {}", player.name()));
            }
        }
        self.log.blank();
        Ok(())
    }

    fn broadcast_suit(&mut self, suit: Suit) {
        for player in &mut self.players {
            player.exchange("suit broadcast", |conn| conn.send_suit(suit));
        }
    }

    /// Rebuild the pile from fresh decks and deal `deal_count` cards to every
    /// player. Cards for forfeited players are discarded.
    fn deal(&mut self) -> Result<(), GameError> {
        self.pile.clear();
        self.pile.add_decks(self.config.decks as usize)?;
        self.pile.shuffle(&mut self.rng);

        for _ in 0..self.config.deal_count() {
            for player in &mut self.players {
                let Some(card) = self.pile.draw_random(&mut self.rng) else {
                    break;
                };
                player.exchange("deal", |conn| conn.give_card(card));
            }
        }
        info!(
            per_player = self.config.deal_count(),
            left_in_pile = self.pile.len(),
            "cards dealt"
        );
        Ok(())
    }

    /// Log every player's hand and return it (`None` for forfeited players).
    fn log_hands(&mut self) -> Vec<Option<Vec<Card>>> {
        let mut hands = Vec::with_capacity(self.players.len());
        for player in &mut self.players {
            let size = player.exchange("hand size", |conn| conn.hand_size());
            let hand = player.exchange("hand", |conn| conn.hand());
            match (size, &hand) {
                (Some(size), Some(cards)) => {
                    self.log
                        .line(format_args!("--{}'s hand ({size}):", player.name()));
                    self.log.cards(cards);
                    self.log.blank();
                }
                _ => {
                    self.log.line(format_args!("--{} forfeited", player.name()));
                    self.log.blank();
                }
            }
            hands.push(hand);
        }
        hands
    }

    /// Run both rounds on one thread per player. Returns the coordinator's
    /// event log once every worker has finished.
    fn play(&mut self) -> Result<Vec<TurnEvent>, GameError> {
        let pile = std::mem::take(&mut self.pile);
        let coordinator = Arc::new(RoundCoordinator::new(self.config.players, pile));

        let handles: Vec<_> = self
            .players
            .drain(..)
            .map(|mut player| {
                let coordinator = Arc::clone(&coordinator);
                let log = Arc::clone(&self.log);
                thread::spawn(move || {
                    let result = player.play(&coordinator, &log);
                    (player, result)
                })
            })
            .collect();

        let mut fatal = None;
        let mut panicked = false;
        for handle in handles {
            match handle.join() {
                Ok((player, result)) => {
                    if let Err(e) = result {
                        fatal = fatal.or(Some(e));
                    }
                    self.players.push(player);
                }
                Err(_) => panicked = true,
            }
        }

        if panicked {
            return Err(GameError::WorkerPanicked);
        }
        if let Some(e) = fatal {
            return Err(e);
        }
        info!(pile = coordinator.pile_len(), "both rounds complete");
        Ok(coordinator.turn_log())
    }

    fn log_scores(&self, scores: &[Option<u32>], outcome: Outcome) {
        self.log.heading("PLAYER SCORES");
        self.log.blank();
        for (player, score) in self.players.iter().zip(scores) {
            match score {
                Some(score) => self
                    .log
                    .line(format_args!("----{}'s score is {score}", player.name())),
                None => self.log.line(format_args!("----{} forfeited", player.name())),
            }
        }
        match outcome {
            Outcome::Winner(index) => {
                let name = self.players[index].name();
                info!(winner = name, "game won");
                self.log.line(format_args!("\n--WINNER: {name}"));
            }
            Outcome::Tied => {
                info!("game tied");
                self.log.line("\n--GAME IS TIED");
            }
        }
    }

    /// Send every player `GAME_OVER` and its result. `None` means the game
    /// was aborted and nobody won.
    fn announce(&mut self, outcome: Option<Outcome>) {
        for (i, player) in self.players.iter_mut().enumerate() {
            let result = match outcome {
                _ if !player.is_active() => GameResult::Lose,
                Some(Outcome::Tied) => GameResult::Tied,
                Some(Outcome::Winner(winner)) if winner == i => GameResult::Win,
                Some(Outcome::Winner(_)) | None => GameResult::Lose,
            };
            if let Err(e) = player.notify_regardless(|conn| conn.finish(result)) {
                warn!(player = player.name(), error = %e, "could not deliver result");
            }
        }
    }
}

/// Position, among `seats` players dealt round-robin, of whoever drew the
/// first `FIRST_PLAYER_RANK` card in `draws`.
pub fn first_to_draw(draws: &[Card], seats: usize) -> Option<usize> {
    if seats == 0 {
        return None;
    }
    draws
        .iter()
        .position(|card| card.rank == FIRST_PLAYER_RANK)
        .map(|draw| draw % seats)
}

/// The unique top scorer wins; a shared top score is a tie. Forfeited
/// players (`None`) are not considered. `None` if nobody was scored.
pub fn decide_outcome(scores: &[Option<u32>]) -> Option<Outcome> {
    let best = scores.iter().flatten().max()?;
    let mut leaders = scores
        .iter()
        .enumerate()
        .filter(|(_, score)| score.as_ref() == Some(best))
        .map(|(i, _)| i);
    match (leaders.next(), leaders.next()) {
        (Some(winner), None) => Some(Outcome::Winner(winner)),
        _ => Some(Outcome::Tied),
    }
}

#[cfg(test)]
mod tests {
    use std::net::{TcpListener, TcpStream};

    use super::*;
    use crate::connection::PlayerConnection;

    fn card(suit: Suit, rank: Rank) -> Card {
        Card::new(suit, rank)
    }

    /// `count` players with placeholder names; the client ends are returned
    /// so the connections stay open.
    fn seated(count: usize) -> (Vec<Player>, Vec<TcpStream>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut players = Vec::new();
        let mut clients = Vec::new();
        for seat in 0..count {
            clients.push(TcpStream::connect(addr).unwrap());
            let (stream, _) = listener.accept().unwrap();
            players.push(Player::new(seat, PlayerConnection::new(stream).unwrap()));
        }
        (players, clients)
    }

    /// Zero-based draw on which the first Jack comes out of `pile` with `seed`.
    fn jack_draw(pile: &[Card], seed: u64) -> usize {
        let mut pile = CardCollection::from(pile.to_vec());
        let mut rng = CardRng::new(seed);
        std::iter::from_fn(|| pile.draw_random(&mut rng))
            .position(|card| card.rank == FIRST_PLAYER_RANK)
            .unwrap()
    }

    /// Run the first-player search over `pile`. Returns the first player's
    /// seat and the game log.
    fn search(
        seed: u64,
        decks: u32,
        players: usize,
        forfeited: &[usize],
        pile: &[Card],
    ) -> (Option<usize>, String) {
        let (mut seats, _clients) = seated(players);
        for &seat in forfeited {
            seats[seat].forfeit("client went away");
        }
        let (log, buffer) = GameLog::in_memory();
        let config = GameConfig::new(decks, players as u32).unwrap();
        let mut game = Game::new(config, seats, CardRng::new(seed), Arc::new(log));
        game.pile = CardCollection::from(pile.to_vec());
        let first = game.determine_first_player();
        (first, buffer.contents())
    }

    #[test]
    fn jack_on_third_combined_draw_makes_first_seat_first() {
        // Two decks, two players: draws alternate player-1, player-2, player-1.
        let pile = [
            card(Suit::Hearts, Rank::Four),
            card(Suit::Spades, Rank::Ace),
            card(Suit::Clubs, Rank::Jack),
        ];
        let seed = (0..).find(|&seed| jack_draw(&pile, seed) == 2).unwrap();
        let (first, log) = search(seed, 2, 2, &[], &pile);

        assert_eq!(first, Some(0));
        assert_eq!(log.matches("dealt to player-1").count(), 2);
        assert_eq!(log.matches("dealt to player-2").count(), 1);
        assert!(log.contains("----Jack of Clubs dealt to player-1"));
        assert!(log.contains("--FIRST PLAYER: player-1"));
    }

    #[test]
    fn search_deals_only_to_active_players() {
        let pile = [card(Suit::Hearts, Rank::Two), card(Suit::Clubs, Rank::Jack)];
        for seed in 0..8 {
            // Seat 1 forfeited, so the second draw goes to seat 2.
            let expected = match jack_draw(&pile, seed) {
                0 => 0,
                _ => 2,
            };
            let (first, log) = search(seed, 1, 3, &[1], &pile);
            assert_eq!(first, Some(expected), "seed {seed}");
            assert!(!log.contains("dealt to player-2"));
        }
    }

    #[test]
    fn search_without_a_jack_finds_nobody() {
        let pile = [card(Suit::Hearts, Rank::Two), card(Suit::Spades, Rank::King)];
        let (first, log) = search(3, 1, 2, &[], &pile);
        assert_eq!(first, None);
        assert_eq!(log.matches(" dealt to ").count(), 2);
        assert!(!log.contains("--FIRST PLAYER:"));
    }

    #[test]
    fn jack_on_third_draw_goes_to_first_seat() {
        // Two players: draws alternate A, B, A, ...
        let draws = [
            card(Suit::Hearts, Rank::Four),
            card(Suit::Spades, Rank::Ace),
            card(Suit::Clubs, Rank::Jack),
        ];
        assert_eq!(first_to_draw(&draws, 2), Some(0));
    }

    #[test]
    fn jack_goes_to_whoever_drew_it() {
        let draws = [
            card(Suit::Hearts, Rank::Four),
            card(Suit::Diamonds, Rank::Jack),
            card(Suit::Clubs, Rank::Jack),
        ];
        assert_eq!(first_to_draw(&draws, 3), Some(1));
        assert_eq!(first_to_draw(&draws[..1], 3), None);
        assert_eq!(first_to_draw(&draws, 0), None);
    }

    #[test]
    fn hand_score_doubles_selected_suit() {
        let hand = [
            card(Suit::Hearts, Rank::Ten),
            card(Suit::Spades, Rank::Ace),
            card(Suit::Hearts, Rank::Jack),
        ];
        assert_eq!(hand_score(&hand, Suit::Hearts), 2 * 10 + 14 + 2 * 11);
        assert_eq!(hand_score(&hand, Suit::Clubs), 10 + 14 + 11);
        assert_eq!(hand_score(&[], Suit::Clubs), 0);
    }

    #[test]
    fn unique_top_score_wins() {
        assert_eq!(
            decide_outcome(&[Some(40), Some(55), Some(12)]),
            Some(Outcome::Winner(1))
        );
    }

    #[test]
    fn shared_top_score_is_a_tie() {
        assert_eq!(decide_outcome(&[Some(55), Some(30), Some(55)]), Some(Outcome::Tied));
        // A tie below the top score does not matter.
        assert_eq!(
            decide_outcome(&[Some(30), Some(30), Some(55)]),
            Some(Outcome::Winner(2))
        );
    }

    #[test]
    fn forfeited_players_are_not_scored() {
        assert_eq!(decide_outcome(&[None, Some(3)]), Some(Outcome::Winner(1)));
        assert_eq!(decide_outcome(&[None, None]), None);
    }

    #[test]
    fn report_names_the_winner() {
        let standing = |name: &str, score| Standing {
            name: name.into(),
            turn: TurnOrdinal::FIRST,
            score: Some(score),
            hand: Vec::new(),
            forfeited: false,
        };
        let mut report = GameReport {
            outcome: Outcome::Winner(1),
            standings: vec![standing("Ada", 10), standing("Grace", 20)],
            first_player: "Ada".into(),
            selected_suit: Suit::Spades,
            pile_after_deal: 0,
            turn_log: Vec::new(),
        };
        assert_eq!(report.winner().map(|s| s.name.as_str()), Some("Grace"));
        report.outcome = Outcome::Tied;
        assert!(report.winner().is_none());
    }
}

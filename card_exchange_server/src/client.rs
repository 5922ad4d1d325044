// Player side of the protocol.
//
// `ClientResponder` is the state machine that answers one server's commands.
// It holds the hand (always present, possibly empty), the selected suit once
// `RECEIVE_SUIT` has arrived, and the latest pile snapshot, replaced wholesale
// by every `RECEIVE_CARD_COLLECTION`. Which cards to surrender or draw is
// decided here, never by the server:
//
// - random dump: uniformly random cards from the hand;
// - strategic dump: the lowest-scoring cards in the hand, one at a time;
// - strategic draw: the highest-scoring cards in the pile snapshot.
//
// A command whose preconditions are not met (no suit yet, no pile yet, not
// enough cards) fails with a `ResponderError` and leaves the state untouched.
//
// `PlayerClient` is the blocking network loop around a responder: read a
// command, answer it if the tag expects an answer (`Refused` when the
// responder fails), and stop after `GAME_OVER` and its result tag.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use card_exchange_prng::CardRng;
use card_exchange_protocol::{
    CapacityError, Card, CardCollection, Command, CommandTag, GameResult, ProtocolError, Response,
    Suit, recv, send,
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponderError {
    #[error("hand is empty")]
    EmptyHand,

    #[error("no suit has been selected yet")]
    SuitNotReceived,

    #[error("no pile has been received yet")]
    PileNotReceived,

    #[error("asked for {requested} cards, only {available} available")]
    NotEnoughCards { requested: usize, available: usize },

    #[error("{0} is only expected right after GAME_OVER")]
    UnexpectedResult(CommandTag),

    #[error(transparent)]
    Capacity(#[from] CapacityError),
}

pub struct ClientResponder {
    name: String,
    hand: CardCollection,
    pile: Option<CardCollection>,
    selected_suit: Option<Suit>,
    rng: CardRng,
}

impl ClientResponder {
    pub fn new(name: impl Into<String>, rng: CardRng) -> Self {
        Self {
            name: name.into(),
            hand: CardCollection::new(),
            pile: None,
            selected_suit: None,
            rng,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hand(&self) -> &CardCollection {
        &self.hand
    }

    pub fn selected_suit(&self) -> Option<Suit> {
        self.selected_suit
    }

    /// Apply one command. Requests yield `Some(response)`, notifications
    /// yield `None`.
    pub fn handle(&mut self, command: Command) -> Result<Option<Response>, ResponderError> {
        let response = match command {
            Command::SendName => Response::Name(self.name.clone()),
            Command::SendSuit => Response::Suit(self.choose_suit()),
            Command::SendHand => Response::Cards(self.hand.to_vec()),
            Command::SendHandSize => Response::HandSize(self.hand.len() as u32),
            Command::SendCardsRandomlyHand { count } => {
                Response::Cards(self.dump_randomly(count as usize)?)
            }
            Command::SendCardsStrategicallyHand { count } => {
                Response::Cards(self.dump_strategically(count as usize)?)
            }
            Command::SendCardsStrategicallyPile { count } => {
                Response::Cards(self.draw_from_pile(count as usize)?)
            }
            Command::SortHand => {
                self.hand.sort();
                return Ok(None);
            }
            Command::ReceiveCard { card } => {
                self.hand.add_card(card)?;
                return Ok(None);
            }
            Command::ReceiveCardCollection { cards } => {
                self.pile = Some(CardCollection::from(cards));
                return Ok(None);
            }
            Command::ReceiveSuit { suit } => {
                self.selected_suit = Some(suit);
                return Ok(None);
            }
            Command::GameOver => return Ok(None),
            Command::YouWin | Command::YouLose | Command::GameTied => {
                return Err(ResponderError::UnexpectedResult(command.tag()));
            }
        };
        Ok(Some(response))
    }

    fn choose_suit(&mut self) -> Suit {
        let index = self.rng.index(Suit::ALL.len()).unwrap_or_default();
        Suit::ALL[index]
    }

    fn check_hand(&self, requested: usize) -> Result<(), ResponderError> {
        if self.hand.is_empty() && requested > 0 {
            return Err(ResponderError::EmptyHand);
        }
        if requested > self.hand.len() {
            return Err(ResponderError::NotEnoughCards {
                requested,
                available: self.hand.len(),
            });
        }
        Ok(())
    }

    fn dump_randomly(&mut self, count: usize) -> Result<Vec<Card>, ResponderError> {
        self.check_hand(count)?;
        Ok((0..count)
            .filter_map(|_| self.hand.draw_random(&mut self.rng))
            .collect())
    }

    fn dump_strategically(&mut self, count: usize) -> Result<Vec<Card>, ResponderError> {
        let suit = self.selected_suit.ok_or(ResponderError::SuitNotReceived)?;
        self.check_hand(count)?;
        Ok((0..count)
            .filter_map(|_| self.hand.draw_min_score(suit))
            .collect())
    }

    fn draw_from_pile(&mut self, count: usize) -> Result<Vec<Card>, ResponderError> {
        let suit = self.selected_suit.ok_or(ResponderError::SuitNotReceived)?;
        let pile = self.pile.as_mut().ok_or(ResponderError::PileNotReceived)?;
        if count > pile.len() {
            return Err(ResponderError::NotEnoughCards {
                requested: count,
                available: pile.len(),
            });
        }
        let drawn: Vec<Card> = (0..count)
            .filter_map(|_| pile.draw_max_score(suit))
            .collect();
        self.hand.add_cards(&drawn)?;
        Ok(drawn)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("expected a result after GAME_OVER, got {0}")]
    MissingResult(CommandTag),
}

/// What a player learns at the end of a game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSummary {
    pub result: GameResult,
    pub hand: Vec<Card>,
    pub selected_suit: Option<Suit>,
}

/// A connected player answering one server until the game ends.
pub struct PlayerClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    responder: ClientResponder,
}

impl PlayerClient {
    /// Connect to a game server. `seed` fixes the player's own choices;
    /// `None` seeds from the clock.
    pub fn connect(
        addr: impl ToSocketAddrs,
        name: &str,
        seed: Option<u64>,
    ) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true).ok();
        let reader = BufReader::new(stream.try_clone()?);
        let rng = match seed {
            Some(seed) => CardRng::new(seed),
            None => CardRng::from_entropy(),
        };
        Ok(Self {
            reader,
            writer: BufWriter::new(stream),
            responder: ClientResponder::new(name, rng),
        })
    }

    /// Answer commands until the game is over.
    pub fn run(mut self) -> Result<GameSummary, ClientError> {
        loop {
            let command: Command = recv(&mut self.reader)?;
            let tag = command.tag();
            debug!(player = self.responder.name(), %tag, "command");

            if tag == CommandTag::GameOver {
                let last: Command = recv(&mut self.reader)?;
                let result = last
                    .as_result()
                    .ok_or_else(|| ClientError::MissingResult(last.tag()))?;
                info!(player = self.responder.name(), %result, "game over");
                return Ok(GameSummary {
                    result,
                    hand: self.responder.hand().to_vec(),
                    selected_suit: self.responder.selected_suit(),
                });
            }

            match self.responder.handle(command) {
                Ok(Some(response)) => send(&mut self.writer, &response)?,
                Ok(None) => {}
                Err(e) if tag.expects_response() => {
                    warn!(player = self.responder.name(), %tag, error = %e, "refusing request");
                    send(
                        &mut self.writer,
                        &Response::Refused {
                            reason: e.to_string(),
                        },
                    )?;
                }
                Err(e) => {
                    warn!(player = self.responder.name(), %tag, error = %e, "ignoring notification");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use card_exchange_protocol::Rank;

    use super::*;

    fn card(suit: Suit, rank: Rank) -> Card {
        Card::new(suit, rank)
    }

    fn responder_with(hand: &[Card]) -> ClientResponder {
        let mut responder = ClientResponder::new("Ada", CardRng::new(7));
        for &c in hand {
            responder.handle(Command::ReceiveCard { card: c }).unwrap();
        }
        responder
    }

    fn cards(response: Option<Response>) -> Vec<Card> {
        match response {
            Some(Response::Cards(cards)) => cards,
            other => panic!("expected cards, got {other:?}"),
        }
    }

    #[test]
    fn answers_name_and_hand_size() {
        let mut responder = responder_with(&[card(Suit::Clubs, Rank::Two)]);
        assert_eq!(
            responder.handle(Command::SendName).unwrap(),
            Some(Response::Name("Ada".into()))
        );
        assert_eq!(
            responder.handle(Command::SendHandSize).unwrap(),
            Some(Response::HandSize(1))
        );
    }

    #[test]
    fn suit_choice_is_deterministic_per_seed() {
        let mut a = ClientResponder::new("a", CardRng::new(99));
        let mut b = ClientResponder::new("b", CardRng::new(99));
        assert_eq!(
            a.handle(Command::SendSuit).unwrap(),
            b.handle(Command::SendSuit).unwrap()
        );
    }

    #[test]
    fn strategic_dump_needs_a_suit() {
        let mut responder = responder_with(&[card(Suit::Clubs, Rank::Two)]);
        let err = responder
            .handle(Command::SendCardsStrategicallyHand { count: 1 })
            .unwrap_err();
        assert_eq!(err, ResponderError::SuitNotReceived);
        assert_eq!(responder.hand().len(), 1);
    }

    #[test]
    fn strategic_dump_gives_up_lowest_scores() {
        let mut responder = responder_with(&[
            card(Suit::Hearts, Rank::Two),
            card(Suit::Spades, Rank::Three),
            card(Suit::Clubs, Rank::King),
            card(Suit::Spades, Rank::Four),
        ]);
        responder
            .handle(Command::ReceiveSuit { suit: Suit::Hearts })
            .unwrap();
        // Hearts doubles the Two to 4, which ties the plain Four; the earlier
        // card (the Two of Hearts) goes first.
        let dumped = cards(
            responder
                .handle(Command::SendCardsStrategicallyHand { count: 2 })
                .unwrap(),
        );
        assert_eq!(
            dumped,
            vec![card(Suit::Spades, Rank::Three), card(Suit::Hearts, Rank::Two)]
        );
        assert_eq!(responder.hand().len(), 2);
    }

    #[test]
    fn pile_draw_needs_a_snapshot() {
        let mut responder = responder_with(&[]);
        responder
            .handle(Command::ReceiveSuit { suit: Suit::Spades })
            .unwrap();
        let err = responder
            .handle(Command::SendCardsStrategicallyPile { count: 2 })
            .unwrap_err();
        assert_eq!(err, ResponderError::PileNotReceived);
    }

    #[test]
    fn pile_draw_takes_highest_scores_into_hand() {
        let mut responder = responder_with(&[]);
        responder
            .handle(Command::ReceiveSuit { suit: Suit::Diamonds })
            .unwrap();
        responder
            .handle(Command::ReceiveCardCollection {
                cards: vec![
                    card(Suit::Spades, Rank::Ace),
                    card(Suit::Diamonds, Rank::Eight),
                    card(Suit::Clubs, Rank::Two),
                ],
            })
            .unwrap();
        let drawn = cards(
            responder
                .handle(Command::SendCardsStrategicallyPile { count: 2 })
                .unwrap(),
        );
        assert_eq!(
            drawn,
            vec![card(Suit::Diamonds, Rank::Eight), card(Suit::Spades, Rank::Ace)]
        );
        assert_eq!(responder.hand().as_slice(), drawn.as_slice());
    }

    #[test]
    fn new_snapshot_replaces_the_old_one() {
        let mut responder = responder_with(&[]);
        responder
            .handle(Command::ReceiveSuit { suit: Suit::Clubs })
            .unwrap();
        for pile in [
            vec![card(Suit::Hearts, Rank::Ace), card(Suit::Hearts, Rank::King)],
            vec![card(Suit::Clubs, Rank::Five)],
        ] {
            responder
                .handle(Command::ReceiveCardCollection { cards: pile })
                .unwrap();
        }
        let err = responder
            .handle(Command::SendCardsStrategicallyPile { count: 2 })
            .unwrap_err();
        assert_eq!(
            err,
            ResponderError::NotEnoughCards {
                requested: 2,
                available: 1
            }
        );
    }

    #[test]
    fn dumps_refuse_empty_or_short_hands() {
        let mut responder = responder_with(&[]);
        assert_eq!(
            responder
                .handle(Command::SendCardsRandomlyHand { count: 1 })
                .unwrap_err(),
            ResponderError::EmptyHand
        );

        let mut responder = responder_with(&[card(Suit::Hearts, Rank::Six)]);
        assert_eq!(
            responder
                .handle(Command::SendCardsRandomlyHand { count: 3 })
                .unwrap_err(),
            ResponderError::NotEnoughCards {
                requested: 3,
                available: 1
            }
        );
        assert_eq!(
            cards(
                responder
                    .handle(Command::SendCardsRandomlyHand { count: 1 })
                    .unwrap()
            ),
            vec![card(Suit::Hearts, Rank::Six)]
        );
        assert!(responder.hand().is_empty());
    }

    #[test]
    fn sort_orders_by_suit_then_rank() {
        let mut responder = responder_with(&[
            card(Suit::Spades, Rank::Two),
            card(Suit::Hearts, Rank::Three),
            card(Suit::Hearts, Rank::Queen),
        ]);
        assert_eq!(responder.handle(Command::SortHand).unwrap(), None);
        assert_eq!(
            responder.hand().as_slice(),
            &[
                card(Suit::Hearts, Rank::Queen),
                card(Suit::Hearts, Rank::Three),
                card(Suit::Spades, Rank::Two),
            ]
        );
    }

    #[test]
    fn result_tags_outside_game_over_are_errors() {
        let mut responder = responder_with(&[]);
        assert_eq!(
            responder.handle(Command::YouWin).unwrap_err(),
            ResponderError::UnexpectedResult(CommandTag::YouWin)
        );
        assert_eq!(responder.handle(Command::GameOver).unwrap(), None);
    }
}

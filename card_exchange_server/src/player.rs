// Player worker: one per connected client.
//
// A `Player` owns its connection, its name, and its turn ordinal (assigned
// once by the game). During play each player runs `play` on its own thread:
//
//   round 1 turn -> round-1 barrier -> round 2 turn
//
// Turns are taken through the player's `Seat` at the shared
// `RoundCoordinator`, so the pile is only touched while holding a
// `TurnGuard`, and a worker that panics still gives up its remaining slots.
//
// Forfeits: any protocol failure (I/O, bad response, refusal) or an illegal
// draw marks the player forfeited. A forfeited player still takes its turn
// slots and still reaches the barrier, passing immediately, so the others are
// never left waiting on it. A pile capacity violation is not a forfeit; it is
// returned to the game as a fatal error once the player has released its
// remaining turn and barrier slots.

use card_exchange_protocol::{CapacityError, Card, ProtocolError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::connection::PlayerConnection;
use crate::coordinator::{Round, RoundCoordinator, TurnGuard, TurnOrdinal};
use crate::game::GameError;
use crate::log::GameLog;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerStatus {
    Active,
    Forfeited { reason: String },
}

/// Why a single turn failed.
#[derive(Debug, Error)]
enum TurnError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("drew cards that are not in the pile: {0:?}")]
    IllegalDraw(Vec<Card>),

    #[error(transparent)]
    Capacity(#[from] CapacityError),
}

pub struct Player {
    seat: usize,
    name: String,
    turn: Option<TurnOrdinal>,
    status: PlayerStatus,
    conn: PlayerConnection,
}

impl Player {
    /// A freshly connected player. `seat` is the zero-based accept order and
    /// only serves as the placeholder name until the client reports its own.
    pub fn new(seat: usize, conn: PlayerConnection) -> Self {
        Self {
            seat,
            name: format!("player-{}", seat + 1),
            turn: None,
            status: PlayerStatus::Active,
            conn,
        }
    }

    pub fn seat(&self) -> usize {
        self.seat
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn turn(&self) -> Option<TurnOrdinal> {
        self.turn
    }

    pub fn assign_turn(&mut self, ordinal: TurnOrdinal) -> Result<(), GameError> {
        if let Some(existing) = self.turn {
            return Err(GameError::TurnAlreadyAssigned {
                player: self.name.clone(),
                existing,
            });
        }
        self.turn = Some(ordinal);
        Ok(())
    }

    pub fn status(&self) -> &PlayerStatus {
        &self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }

    pub fn forfeit(&mut self, reason: impl std::fmt::Display) {
        if self.is_active() {
            warn!(player = %self.name, %reason, "player forfeits");
            self.status = PlayerStatus::Forfeited {
                reason: reason.to_string(),
            };
        }
    }

    /// Run one exchange with the client if the player is still active.
    /// A failed exchange forfeits the player and yields `None`.
    pub fn exchange<T>(
        &mut self,
        what: &str,
        f: impl FnOnce(&mut PlayerConnection) -> Result<T, ProtocolError>,
    ) -> Option<T> {
        if !self.is_active() {
            return None;
        }
        match f(&mut self.conn) {
            Ok(value) => Some(value),
            Err(e) => {
                self.forfeit(format_args!("{what}: {e}"));
                None
            }
        }
    }

    /// Best-effort exchange that ignores forfeit status and never forfeits;
    /// used for the final result notification.
    pub fn notify_regardless<T>(
        &mut self,
        f: impl FnOnce(&mut PlayerConnection) -> Result<T, ProtocolError>,
    ) -> Result<T, ProtocolError> {
        f(&mut self.conn)
    }

    pub fn disconnect(&self) {
        self.conn.shutdown();
    }

    /// Take both turns. Returns a fatal pile capacity error, if one occurred,
    /// after every turn slot and the barrier have been released.
    pub fn play(&mut self, coordinator: &RoundCoordinator, log: &GameLog) -> Result<(), GameError> {
        let turn = self.turn.ok_or_else(|| GameError::TurnNotAssigned(self.name.clone()))?;
        let mut seat = coordinator.seat(turn);
        let mut fatal = None;

        for round in [Round::One, Round::Two] {
            {
                let mut guard = seat.take_turn(round);
                if self.is_active() && fatal.is_none() {
                    debug!(player = %self.name, %round, ordinal = %turn, "turn started");
                    let result = match round {
                        Round::One => self.first_turn(&mut guard, log),
                        Round::Two => self.second_turn(&mut guard, log),
                    };
                    match result {
                        Ok(()) => {}
                        Err(TurnError::Capacity(e)) => fatal = Some(e),
                        Err(e) => self.forfeit(format_args!("{round}: {e}")),
                    }
                }
            }
            if round == Round::One {
                seat.arrive_at_barrier();
            }
        }

        match fatal {
            Some(e) => Err(GameError::Capacity(e)),
            None => {
                info!(player = %self.name, forfeited = !self.is_active(), "finished both rounds");
                Ok(())
            }
        }
    }

    fn first_turn(&mut self, guard: &mut TurnGuard<'_>, log: &GameLog) -> Result<(), TurnError> {
        let count = Round::One.exchange_count();
        log.heading(format_args!("{}'s first turn", self.name));

        self.conn.sort_hand()?;
        self.log_hand(log, "before first turn")?;

        let dumped = self.conn.dump_strategically(count)?;
        log.line("--Following five cards dumped into pile:");
        log.cards(&dumped);
        log.line("--Pile before dumping:");
        log.cards(guard.pile());
        guard.pile_mut().add_cards(&dumped)?;
        log.line("--Pile after dumping:");
        log.cards(guard.pile());

        self.conn.sort_hand()?;
        self.log_hand(log, "after first turn")?;
        log.blank();
        Ok(())
    }

    fn second_turn(&mut self, guard: &mut TurnGuard<'_>, log: &GameLog) -> Result<(), TurnError> {
        let count = Round::Two.exchange_count();
        log.heading(format_args!("{}'s second turn", self.name));
        self.log_hand(log, "before second turn")?;

        let dumped = self.conn.dump_strategically(count)?;
        log.line("--Following two cards dumped into pile:");
        log.cards(&dumped);
        log.line("--Pile before dumping:");
        log.cards(guard.pile());
        guard.pile_mut().add_cards(&dumped)?;
        log.line("--Pile after dumping:");
        log.cards(guard.pile());

        self.conn.send_pile(guard.pile().as_slice())?;
        let drawn = self.conn.draw_from_pile(count)?;
        if !guard.pile_mut().remove_cards(&drawn) {
            return Err(TurnError::IllegalDraw(drawn));
        }
        log.line("--Cards drawn from the pile:");
        log.cards(&drawn);
        log.line("--Pile after drawing cards:");
        log.cards(guard.pile());

        self.conn.sort_hand()?;
        self.log_hand(log, "after second turn")?;
        log.blank();
        Ok(())
    }

    fn log_hand(&mut self, log: &GameLog, when: &str) -> Result<(), ProtocolError> {
        let size = self.conn.hand_size()?;
        let hand = self.conn.hand()?;
        log.line(format_args!("\n--{}'s hand {when} ({size})", self.name));
        log.cards(&hand);
        Ok(())
    }
}

// Round coordination shared by every player worker.
//
// One `RoundCoordinator` is built by the game for the play phase and shared
// as `Arc<RoundCoordinator>`. It owns:
// - the pile, inside `Mutex<Table>` together with one current-turn counter
//   per round;
// - one `Condvar` per round, so a finished turn only wakes workers waiting
//   in that round;
// - a `Barrier` of size N between round 1 and round 2.
//
// A worker reaches the pile only through the `TurnGuard` returned by
// `await_turn`, and `await_turn` returns only once the round's counter equals
// the worker's ordinal. Every wake re-checks that exact predicate
// (`Condvar::wait_while`). Dropping the guard advances the counter (N wraps
// to 1) and wakes the round, whether or not the turn's exchange succeeded.
//
// Workers go through a `Seat`, which tracks which of the worker's turn slots
// and barrier arrival are still owed. A seat dropped with slots outstanding
// (a worker thread unwinding from a panic) passes those turns and arrives at
// the barrier on the worker's behalf, so the rest of the table keeps moving
// and the game can report the panic.
//
// Every transition is appended to an event log (`turn_log`) so tests and the
// final report can check ordering after the fact. The log index is the
// logical timestamp.

use std::fmt;
use std::sync::{Barrier, Condvar, Mutex, MutexGuard, PoisonError};

use card_exchange_protocol::CardCollection;
use serde::Serialize;

/// One-based position in the turn order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TurnOrdinal(u32);

impl TurnOrdinal {
    pub const FIRST: TurnOrdinal = TurnOrdinal(1);

    /// `None` for zero; ordinals start at 1.
    pub fn new(value: u32) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    /// Ordinals `1..=players`, in turn order.
    pub fn all(players: u32) -> impl Iterator<Item = TurnOrdinal> {
        (1..=players).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The ordinal after this one among `players`, wrapping N to 1.
    pub fn next(self, players: u32) -> Self {
        if self.0 >= players {
            Self::FIRST
        } else {
            Self(self.0 + 1)
        }
    }
}

impl fmt::Display for TurnOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Round {
    One,
    Two,
}

impl Round {
    fn index(self) -> usize {
        match self {
            Round::One => 0,
            Round::Two => 1,
        }
    }

    /// Cards each player dumps onto the pile (and, in round 2, draws back).
    pub fn exchange_count(self) -> u32 {
        match self {
            Round::One => 5,
            Round::Two => 2,
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Round::One => f.write_str("round 1"),
            Round::Two => f.write_str("round 2"),
        }
    }
}

/// A recorded coordinator transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TurnEvent {
    /// The worker arrived before its turn and blocked.
    Waiting { round: Round, ordinal: TurnOrdinal },
    Started {
        round: Round,
        ordinal: TurnOrdinal,
        pile_len: usize,
    },
    Finished {
        round: Round,
        ordinal: TurnOrdinal,
        pile_len: usize,
    },
    /// The last worker reached the round-1 barrier.
    BarrierReleased { pile_len: usize },
}

struct Table {
    pile: CardCollection,
    current: [TurnOrdinal; 2],
    arrived: u32,
    events: Vec<TurnEvent>,
}

pub struct RoundCoordinator {
    players: u32,
    table: Mutex<Table>,
    wake: [Condvar; 2],
    barrier: Barrier,
}

impl RoundCoordinator {
    pub fn new(players: u32, pile: CardCollection) -> Self {
        Self {
            players,
            table: Mutex::new(Table {
                pile,
                current: [TurnOrdinal::FIRST; 2],
                arrived: 0,
                events: Vec::new(),
            }),
            wake: [Condvar::new(), Condvar::new()],
            barrier: Barrier::new(players as usize),
        }
    }

    /// The turn slots and barrier arrival owed by the worker at `ordinal`.
    pub fn seat(&self, ordinal: TurnOrdinal) -> Seat<'_> {
        Seat {
            coordinator: self,
            ordinal,
            turns_taken: 0,
            arrived: false,
        }
    }

    /// Block until it is `ordinal`'s turn in `round`, then hand out the pile.
    pub fn await_turn(&self, round: Round, ordinal: TurnOrdinal) -> TurnGuard<'_> {
        debug_assert!(ordinal.get() <= self.players, "ordinal {ordinal} out of range");
        let idx = round.index();
        let mut table = self.lock();
        if table.current[idx] != ordinal {
            table.events.push(TurnEvent::Waiting { round, ordinal });
        }
        // A poisoned wait returns early, so the predicate is checked again.
        while table.current[idx] != ordinal {
            table = self.wake[idx]
                .wait_while(table, |t| t.current[idx] != ordinal)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let pile_len = table.pile.len();
        table.events.push(TurnEvent::Started {
            round,
            ordinal,
            pile_len,
        });
        TurnGuard {
            coordinator: self,
            table,
            round,
            ordinal,
        }
    }

    /// The round-1 barrier. Returns once all N workers have called it.
    pub fn await_round_one_complete(&self) {
        {
            let mut table = self.lock();
            table.arrived += 1;
            if table.arrived == self.players {
                let pile_len = table.pile.len();
                table.events.push(TurnEvent::BarrierReleased { pile_len });
            }
        }
        self.barrier.wait();
    }

    pub fn pile_len(&self) -> usize {
        self.lock().pile.len()
    }

    pub fn turn_log(&self) -> Vec<TurnEvent> {
        self.lock().events.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive access to the pile for the duration of one turn.
pub struct TurnGuard<'a> {
    coordinator: &'a RoundCoordinator,
    table: MutexGuard<'a, Table>,
    round: Round,
    ordinal: TurnOrdinal,
}

impl TurnGuard<'_> {
    pub fn ordinal(&self) -> TurnOrdinal {
        self.ordinal
    }

    pub fn pile(&self) -> &CardCollection {
        &self.table.pile
    }

    pub fn pile_mut(&mut self) -> &mut CardCollection {
        &mut self.table.pile
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        let idx = self.round.index();
        let pile_len = self.table.pile.len();
        self.table.events.push(TurnEvent::Finished {
            round: self.round,
            ordinal: self.ordinal,
            pile_len,
        });
        self.table.current[idx] = self.ordinal.next(self.coordinator.players);
        self.coordinator.wake[idx].notify_all();
    }
}

/// One worker's place at the table. Use `take_turn(Round::One)`,
/// `arrive_at_barrier()`, then `take_turn(Round::Two)`.
pub struct Seat<'a> {
    coordinator: &'a RoundCoordinator,
    ordinal: TurnOrdinal,
    turns_taken: usize,
    arrived: bool,
}

impl<'a> Seat<'a> {
    pub fn take_turn(&mut self, round: Round) -> TurnGuard<'a> {
        debug_assert_eq!(round.index(), self.turns_taken, "{round} taken out of order");
        let guard = self.coordinator.await_turn(round, self.ordinal);
        self.turns_taken += 1;
        guard
    }

    pub fn arrive_at_barrier(&mut self) {
        self.arrived = true;
        self.coordinator.await_round_one_complete();
    }
}

impl Drop for Seat<'_> {
    fn drop(&mut self) {
        if self.turns_taken == 0 {
            drop(self.take_turn(Round::One));
        }
        if !self.arrived {
            self.arrive_at_barrier();
        }
        if self.turns_taken == 1 {
            drop(self.take_turn(Round::Two));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use card_exchange_protocol::{Card, Rank, Suit};

    use super::*;

    fn ordinal(n: u32) -> TurnOrdinal {
        TurnOrdinal::new(n).unwrap()
    }

    fn started(log: &[TurnEvent], round: Round) -> Vec<u32> {
        log.iter()
            .filter_map(|e| match e {
                TurnEvent::Started {
                    round: r, ordinal, ..
                } if *r == round => Some(ordinal.get()),
                _ => None,
            })
            .collect()
    }

    /// Run both rounds with threads spawned in `spawn_order`; each turn adds
    /// the round's exchange count to the pile.
    fn play(spawn_order: &[u32]) -> (Arc<RoundCoordinator>, usize) {
        let players = spawn_order.len() as u32;
        let coordinator = Arc::new(RoundCoordinator::new(players, CardCollection::new()));
        let handles: Vec<_> = spawn_order
            .iter()
            .map(|&n| {
                let coordinator = Arc::clone(&coordinator);
                thread::spawn(move || {
                    let card = Card::new(Suit::Clubs, Rank::Two);
                    let mut seat = coordinator.seat(ordinal(n));
                    for round in [Round::One, Round::Two] {
                        {
                            let mut turn = seat.take_turn(round);
                            for _ in 0..round.exchange_count() {
                                turn.pile_mut().add_card(card).unwrap();
                            }
                        }
                        if round == Round::One {
                            seat.arrive_at_barrier();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let pile_len = coordinator.pile_len();
        (coordinator, pile_len)
    }

    #[test]
    fn ordinal_wraps() {
        assert_eq!(TurnOrdinal::new(0), None);
        assert_eq!(ordinal(1).next(3), ordinal(2));
        assert_eq!(ordinal(3).next(3), ordinal(1));
        let all: Vec<u32> = TurnOrdinal::all(3).map(TurnOrdinal::get).collect();
        assert_eq!(all, vec![1, 2, 3]);
    }

    #[test]
    fn turns_follow_ordinal_order() {
        let (coordinator, pile_len) = play(&[3, 1, 4, 2]);
        let log = coordinator.turn_log();
        assert_eq!(started(&log, Round::One), vec![1, 2, 3, 4]);
        assert_eq!(started(&log, Round::Two), vec![1, 2, 3, 4]);
        assert_eq!(pile_len, 4 * 5 + 4 * 2);
    }

    #[test]
    fn round_two_waits_for_the_barrier() {
        let (coordinator, _) = play(&[2, 1, 3]);
        let log = coordinator.turn_log();
        let barrier = log
            .iter()
            .position(|e| matches!(e, TurnEvent::BarrierReleased { .. }))
            .unwrap();
        for (i, event) in log.iter().enumerate() {
            match event {
                TurnEvent::Finished {
                    round: Round::One, ..
                } => assert!(i < barrier),
                TurnEvent::Started {
                    round: Round::Two, ..
                } => assert!(i > barrier),
                _ => {}
            }
        }
    }

    #[test]
    fn barrier_sees_every_round_one_dump() {
        let (coordinator, _) = play(&[4, 3, 2, 1]);
        let released = coordinator.turn_log().into_iter().find_map(|e| match e {
            TurnEvent::BarrierReleased { pile_len } => Some(pile_len),
            _ => None,
        });
        assert_eq!(released, Some(20));
    }

    #[test]
    fn first_ordinal_never_waits() {
        let coordinator = RoundCoordinator::new(2, CardCollection::new());
        drop(coordinator.await_turn(Round::One, ordinal(1)));
        drop(coordinator.await_turn(Round::One, ordinal(2)));
        // Wrapped back to the first player.
        drop(coordinator.await_turn(Round::One, ordinal(1)));
        assert!(
            !coordinator
                .turn_log()
                .iter()
                .any(|e| matches!(e, TurnEvent::Waiting { .. }))
        );
    }

    #[test]
    fn guard_releases_on_early_exit() {
        let coordinator = Arc::new(RoundCoordinator::new(2, CardCollection::new()));
        let second = {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                let turn = coordinator.await_turn(Round::Two, ordinal(2));
                turn.ordinal()
            })
        };
        let failed_turn = || -> Result<(), &'static str> {
            let _turn = coordinator.await_turn(Round::Two, ordinal(1));
            Err("client hung up")
        };
        assert!(failed_turn().is_err());
        assert_eq!(second.join().unwrap(), ordinal(2));
    }

    #[test]
    fn panicking_worker_gives_up_its_remaining_slots() {
        let coordinator = Arc::new(RoundCoordinator::new(2, CardCollection::new()));
        let crashed = {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                let mut seat = coordinator.seat(ordinal(1));
                let _turn = seat.take_turn(Round::One);
                panic!("worker bug");
            })
        };
        let survivor = {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                let mut seat = coordinator.seat(ordinal(2));
                drop(seat.take_turn(Round::One));
                seat.arrive_at_barrier();
                drop(seat.take_turn(Round::Two));
            })
        };

        assert!(crashed.join().is_err());
        survivor.join().unwrap();
        let log = coordinator.turn_log();
        assert_eq!(started(&log, Round::One), vec![1, 2]);
        assert_eq!(started(&log, Round::Two), vec![1, 2]);
        assert!(log.iter().any(|e| matches!(e, TurnEvent::BarrierReleased { .. })));
    }
}

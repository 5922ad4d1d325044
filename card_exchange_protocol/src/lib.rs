// card_exchange_protocol: wire protocol and card types for the card exchange
// game.
//
// This crate is shared by the server (`card_exchange_server`'s player
// workers) and by the players (`card_exchange_server::client`). It has no
// networking of its own beyond `Read`/`Write` framing and no knowledge of
// turns or rounds.
//
// Module overview:
// - `types.rs`:       `Suit`, `Rank`, `Card`, `GameResult`; scoring and hand order.
// - `collection.rs`:  `CardCollection` (hands and the pile) with the capacity
//                     invariant and strategic max/min selection.
// - `message.rs`:     The closed command vocabulary (`CommandTag`, `Command`)
//                     and `Response`.
// - `framing.rs`:     4-byte big-endian length prefix, then payload.
// - `codec.rs`:       Versioned JSON envelope over the framing.
// - `error.rs`:       `ProtocolError`.
//
// Design decisions:
// - **JSON payloads.** Readable in packet captures and trivially versioned.
//   Piles are the largest payload and stay small.
// - **No async runtime.** Plain `std::io::Read`/`Write`, matching the
//   blocking, strictly request/response exchange the game needs.

pub mod codec;
pub mod collection;
pub mod error;
pub mod framing;
pub mod message;
pub mod types;

pub use codec::{PROTOCOL_VERSION, recv, send};
pub use collection::{CapacityError, CardCollection, hand_score, standard_deck};
pub use error::ProtocolError;
pub use framing::{MAX_FRAME_SIZE, read_frame, write_frame};
pub use message::{Command, CommandTag, Response};
pub use types::{Card, DECK_SIZE, GameResult, Rank, Suit};

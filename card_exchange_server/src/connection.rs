// Worker side of the protocol: one blocking connection to one client.
//
// `PlayerConnection` wraps the TCP stream in a buffered reader/writer pair
// and exposes one typed method per exchange the game uses. Each method
// writes a single command and, when the tag expects an answer, blocks until
// the response arrives. Nothing is pipelined.
//
// Response checking happens here so callers see only well-typed values:
// a `Refused` answer becomes `ProtocolError::Refused`, a response of the
// wrong kind becomes `UnexpectedResponse`, and a card-returning request
// answered with the wrong number of cards becomes `CardCount`.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpStream};

use card_exchange_protocol::{
    Card, Command, CommandTag, GameResult, ProtocolError, Response, Suit, recv, send,
};
use tracing::trace;

pub struct PlayerConnection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    peer: Option<SocketAddr>,
}

impl PlayerConnection {
    pub fn new(stream: TcpStream) -> std::io::Result<Self> {
        let peer = stream.peer_addr().ok();
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            reader,
            writer: BufWriter::new(stream),
            peer,
        })
    }

    /// Send a command that has no response.
    pub fn notify(&mut self, command: Command) -> Result<(), ProtocolError> {
        debug_assert!(!command.tag().expects_response());
        trace!(peer = ?self.peer, tag = %command.tag(), "notify");
        send(&mut self.writer, &command)
    }

    /// Send a request and wait for its response.
    pub fn request(&mut self, command: Command) -> Result<Response, ProtocolError> {
        debug_assert!(command.tag().expects_response());
        let tag = command.tag();
        trace!(peer = ?self.peer, %tag, "request");
        send(&mut self.writer, &command)?;
        match recv(&mut self.reader)? {
            Response::Refused { reason } => Err(ProtocolError::Refused {
                command: tag,
                reason,
            }),
            response => Ok(response),
        }
    }

    pub fn name(&mut self) -> Result<String, ProtocolError> {
        match self.request(Command::SendName)? {
            Response::Name(name) => Ok(name),
            other => Err(unexpected(CommandTag::SendName, &other)),
        }
    }

    pub fn choose_suit(&mut self) -> Result<Suit, ProtocolError> {
        match self.request(Command::SendSuit)? {
            Response::Suit(suit) => Ok(suit),
            other => Err(unexpected(CommandTag::SendSuit, &other)),
        }
    }

    pub fn hand(&mut self) -> Result<Vec<Card>, ProtocolError> {
        match self.request(Command::SendHand)? {
            Response::Cards(cards) => Ok(cards),
            other => Err(unexpected(CommandTag::SendHand, &other)),
        }
    }

    pub fn hand_size(&mut self) -> Result<u32, ProtocolError> {
        match self.request(Command::SendHandSize)? {
            Response::HandSize(size) => Ok(size),
            other => Err(unexpected(CommandTag::SendHandSize, &other)),
        }
    }

    pub fn sort_hand(&mut self) -> Result<(), ProtocolError> {
        self.notify(Command::SortHand)
    }

    /// The client picks `count` cards from its hand by its own policy.
    pub fn dump_strategically(&mut self, count: u32) -> Result<Vec<Card>, ProtocolError> {
        self.request_cards(Command::SendCardsStrategicallyHand { count })
    }

    /// The client picks `count` cards from its last pile snapshot.
    pub fn draw_from_pile(&mut self, count: u32) -> Result<Vec<Card>, ProtocolError> {
        self.request_cards(Command::SendCardsStrategicallyPile { count })
    }

    pub fn give_card(&mut self, card: Card) -> Result<(), ProtocolError> {
        self.notify(Command::ReceiveCard { card })
    }

    pub fn send_pile(&mut self, cards: &[Card]) -> Result<(), ProtocolError> {
        self.notify(Command::ReceiveCardCollection {
            cards: cards.to_vec(),
        })
    }

    pub fn send_suit(&mut self, suit: Suit) -> Result<(), ProtocolError> {
        self.notify(Command::ReceiveSuit { suit })
    }

    /// `GAME_OVER` followed by the result tag.
    pub fn finish(&mut self, result: GameResult) -> Result<(), ProtocolError> {
        self.notify(Command::GameOver)?;
        self.notify(Command::for_result(result))
    }

    pub fn shutdown(&self) {
        if let Err(e) = self.writer.get_ref().shutdown(Shutdown::Both) {
            trace!(peer = ?self.peer, error = %e, "shutdown failed");
        }
    }

    fn request_cards(&mut self, command: Command) -> Result<Vec<Card>, ProtocolError> {
        let tag = command.tag();
        let expected = command.count().unwrap_or_default() as usize;
        match self.request(command)? {
            Response::Cards(cards) if cards.len() == expected => Ok(cards),
            Response::Cards(cards) => Err(ProtocolError::CardCount {
                command: tag,
                expected,
                actual: cards.len(),
            }),
            other => Err(unexpected(tag, &other)),
        }
    }
}

fn unexpected(command: CommandTag, response: &Response) -> ProtocolError {
    ProtocolError::UnexpectedResponse {
        command,
        response: response.kind(),
    }
}

// Protocol messages between a server-side player worker and its client.
//
// The vocabulary is closed: `CommandTag` lists the fifteen tags and nothing
// else exists. `Command` is the tag plus whatever data travels with it (a
// count for the three card-returning requests, a card, a collection, or a
// suit for the three `RECEIVE_*` notifications). `Response` is the single
// payload a client sends back for a request; which variant is legal is fixed
// by the tag (`CommandTag::expects_response` / the worker's typed helpers in
// `card_exchange_server::connection`).
//
// The worker always initiates and the client never does. Exactly one request
// is outstanding per connection: the worker writes a command and, if the tag
// expects a response, blocks reading it before sending anything else.
//
// Serde representation: externally tagged with the tag name, so a request
// reads as the tag followed by its count, e.g.
// `{"SEND_CARDS_STRATEGICALLY_HAND":{"count":5}}`, and bare tags are strings
// like `"SORT_HAND"`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Card, GameResult, Suit};

/// The closed set of command tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandTag {
    SendName,
    SendSuit,
    SendHand,
    SendHandSize,
    SortHand,
    SendCardsRandomlyHand,
    SendCardsStrategicallyHand,
    SendCardsStrategicallyPile,
    ReceiveCard,
    ReceiveCardCollection,
    ReceiveSuit,
    GameOver,
    YouWin,
    YouLose,
    GameTied,
}

impl CommandTag {
    pub const ALL: [CommandTag; 15] = [
        CommandTag::SendName,
        CommandTag::SendSuit,
        CommandTag::SendHand,
        CommandTag::SendHandSize,
        CommandTag::SortHand,
        CommandTag::SendCardsRandomlyHand,
        CommandTag::SendCardsStrategicallyHand,
        CommandTag::SendCardsStrategicallyPile,
        CommandTag::ReceiveCard,
        CommandTag::ReceiveCardCollection,
        CommandTag::ReceiveSuit,
        CommandTag::GameOver,
        CommandTag::YouWin,
        CommandTag::YouLose,
        CommandTag::GameTied,
    ];

    /// Whether the client must answer this tag with a `Response`.
    pub fn expects_response(self) -> bool {
        matches!(
            self,
            CommandTag::SendName
                | CommandTag::SendSuit
                | CommandTag::SendHand
                | CommandTag::SendHandSize
                | CommandTag::SendCardsRandomlyHand
                | CommandTag::SendCardsStrategicallyHand
                | CommandTag::SendCardsStrategicallyPile
        )
    }

    /// Whether the tag carries a count.
    pub fn takes_count(self) -> bool {
        matches!(
            self,
            CommandTag::SendCardsRandomlyHand
                | CommandTag::SendCardsStrategicallyHand
                | CommandTag::SendCardsStrategicallyPile
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandTag::SendName => "SEND_NAME",
            CommandTag::SendSuit => "SEND_SUIT",
            CommandTag::SendHand => "SEND_HAND",
            CommandTag::SendHandSize => "SEND_HAND_SIZE",
            CommandTag::SortHand => "SORT_HAND",
            CommandTag::SendCardsRandomlyHand => "SEND_CARDS_RANDOMLY_HAND",
            CommandTag::SendCardsStrategicallyHand => "SEND_CARDS_STRATEGICALLY_HAND",
            CommandTag::SendCardsStrategicallyPile => "SEND_CARDS_STRATEGICALLY_PILE",
            CommandTag::ReceiveCard => "RECEIVE_CARD",
            CommandTag::ReceiveCardCollection => "RECEIVE_CARD_COLLECTION",
            CommandTag::ReceiveSuit => "RECEIVE_SUIT",
            CommandTag::GameOver => "GAME_OVER",
            CommandTag::YouWin => "YOU_WIN",
            CommandTag::YouLose => "YOU_LOSE",
            CommandTag::GameTied => "GAME_TIED",
        }
    }
}

impl fmt::Display for CommandTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command sent by a player worker to its client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    SendName,
    SendSuit,
    SendHand,
    SendHandSize,
    SortHand,
    SendCardsRandomlyHand { count: u32 },
    SendCardsStrategicallyHand { count: u32 },
    SendCardsStrategicallyPile { count: u32 },
    ReceiveCard { card: Card },
    ReceiveCardCollection { cards: Vec<Card> },
    ReceiveSuit { suit: Suit },
    GameOver,
    YouWin,
    YouLose,
    GameTied,
}

impl Command {
    pub fn tag(&self) -> CommandTag {
        match self {
            Command::SendName => CommandTag::SendName,
            Command::SendSuit => CommandTag::SendSuit,
            Command::SendHand => CommandTag::SendHand,
            Command::SendHandSize => CommandTag::SendHandSize,
            Command::SortHand => CommandTag::SortHand,
            Command::SendCardsRandomlyHand { .. } => CommandTag::SendCardsRandomlyHand,
            Command::SendCardsStrategicallyHand { .. } => CommandTag::SendCardsStrategicallyHand,
            Command::SendCardsStrategicallyPile { .. } => CommandTag::SendCardsStrategicallyPile,
            Command::ReceiveCard { .. } => CommandTag::ReceiveCard,
            Command::ReceiveCardCollection { .. } => CommandTag::ReceiveCardCollection,
            Command::ReceiveSuit { .. } => CommandTag::ReceiveSuit,
            Command::GameOver => CommandTag::GameOver,
            Command::YouWin => CommandTag::YouWin,
            Command::YouLose => CommandTag::YouLose,
            Command::GameTied => CommandTag::GameTied,
        }
    }

    /// The count carried by a card-returning request, if any.
    pub fn count(&self) -> Option<u32> {
        match self {
            Command::SendCardsRandomlyHand { count }
            | Command::SendCardsStrategicallyHand { count }
            | Command::SendCardsStrategicallyPile { count } => Some(*count),
            _ => None,
        }
    }

    /// The result tag that follows `GAME_OVER` for `result`.
    pub fn for_result(result: GameResult) -> Self {
        match result {
            GameResult::Win => Command::YouWin,
            GameResult::Lose => Command::YouLose,
            GameResult::Tied => Command::GameTied,
        }
    }

    /// Inverse of `for_result`: `None` for anything but the three result tags.
    pub fn as_result(&self) -> Option<GameResult> {
        match self {
            Command::YouWin => Some(GameResult::Win),
            Command::YouLose => Some(GameResult::Lose),
            Command::GameTied => Some(GameResult::Tied),
            _ => None,
        }
    }
}

/// A client's answer to a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    /// Answer to `SEND_NAME`.
    Name(String),
    /// Answer to `SEND_SUIT`.
    Suit(Suit),
    /// Answer to `SEND_HAND_SIZE`.
    HandSize(u32),
    /// Answer to `SEND_HAND` and the three card-returning requests.
    Cards(Vec<Card>),
    /// The client could not satisfy the request in its current state.
    Refused { reason: String },
}

impl Response {
    /// Short variant name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Name(_) => "NAME",
            Response::Suit(_) => "SUIT",
            Response::HandSize(_) => "HAND_SIZE",
            Response::Cards(_) => "CARDS",
            Response::Refused { .. } => "REFUSED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rank;

    #[test]
    fn every_command_maps_to_its_tag() {
        let card = Card::new(Suit::Spades, Rank::Four);
        let commands = [
            Command::SendName,
            Command::SendSuit,
            Command::SendHand,
            Command::SendHandSize,
            Command::SortHand,
            Command::SendCardsRandomlyHand { count: 1 },
            Command::SendCardsStrategicallyHand { count: 5 },
            Command::SendCardsStrategicallyPile { count: 2 },
            Command::ReceiveCard { card },
            Command::ReceiveCardCollection { cards: vec![card] },
            Command::ReceiveSuit { suit: Suit::Clubs },
            Command::GameOver,
            Command::YouWin,
            Command::YouLose,
            Command::GameTied,
        ];
        let tags: Vec<CommandTag> = commands.iter().map(Command::tag).collect();
        assert_eq!(tags, CommandTag::ALL.to_vec());
        for command in &commands {
            assert_eq!(command.count().is_some(), command.tag().takes_count());
        }
    }

    #[test]
    fn bare_tag_serializes_as_tag_name() {
        let json = serde_json::to_string(&Command::SortHand).unwrap();
        assert_eq!(json, r#""SORT_HAND""#);
        for tag in CommandTag::ALL {
            let json = serde_json::to_string(&tag).unwrap();
            assert_eq!(json, format!("\"{}\"", tag.as_str()));
        }
    }

    #[test]
    fn count_follows_tag_on_the_wire() {
        let json =
            serde_json::to_string(&Command::SendCardsStrategicallyHand { count: 5 }).unwrap();
        assert_eq!(json, r#"{"SEND_CARDS_STRATEGICALLY_HAND":{"count":5}}"#);
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back.count(), Some(5));
    }

    #[test]
    fn only_requests_expect_responses() {
        let requests: Vec<CommandTag> = CommandTag::ALL
            .into_iter()
            .filter(|t| t.expects_response())
            .collect();
        assert_eq!(requests.len(), 7);
        assert!(!CommandTag::SortHand.expects_response());
        assert!(!CommandTag::ReceiveCardCollection.expects_response());
        assert!(!CommandTag::GameOver.expects_response());
    }

    #[test]
    fn result_tags_map_both_ways() {
        for result in [GameResult::Win, GameResult::Lose, GameResult::Tied] {
            assert_eq!(Command::for_result(result).as_result(), Some(result));
        }
        assert_eq!(Command::GameOver.as_result(), None);
    }
}

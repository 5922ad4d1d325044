// Ordered multiset of cards used for hands and the shared pile.
//
// A `CardCollection` keeps cards in insertion order (which matters: strategic
// max/min selection breaks ties by position) and may carry a capacity. When a
// capacity is set, every insertion is checked up front and rejected whole with
// `CapacityError` if it would overflow; the collection is never partially
// filled or silently truncated. The server's pile is built with a capacity of
// `decks × DECK_SIZE`; hands and client-side pile snapshots are unlimited.
//
// On the wire a collection is just `Vec<Card>`; use `as_slice()`/`to_vec()` to
// send and `From<Vec<Card>>` to receive.
//
// Removal of a multiset (`remove_cards`) is all-or-nothing and counts
// duplicates, since multi-deck games hold several copies of the same card.

use card_exchange_prng::CardRng;
use thiserror::Error;

use crate::types::{Card, DECK_SIZE, Rank, Suit};

/// Insertion rejected because it would exceed the collection's capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("adding {adding} cards to a collection of {current} exceeds its capacity of {capacity}")]
pub struct CapacityError {
    pub current: usize,
    pub adding: usize,
    pub capacity: usize,
}

/// One standard 52-card deck, suit by suit, ranks ascending.
pub fn standard_deck() -> impl Iterator<Item = Card> {
    Suit::ALL
        .into_iter()
        .flat_map(|suit| Rank::ALL.into_iter().map(move |rank| Card::new(suit, rank)))
}

/// Sum of the cards' scores for `selected` (see `Card::score`).
pub fn hand_score(cards: &[Card], selected: Suit) -> u32 {
    cards.iter().map(|card| card.score(selected)).sum()
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CardCollection {
    cards: Vec<Card>,
    capacity: Option<usize>,
}

impl CardCollection {
    /// An empty, unlimited collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty collection that refuses to grow past `capacity` cards.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            cards: Vec::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    pub fn capacity_limit(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Card> {
        self.cards.iter()
    }

    pub fn as_slice(&self) -> &[Card] {
        &self.cards
    }

    pub fn to_vec(&self) -> Vec<Card> {
        self.cards.clone()
    }

    pub fn add_card(&mut self, card: Card) -> Result<(), CapacityError> {
        self.check_room(1)?;
        self.cards.push(card);
        Ok(())
    }

    pub fn add_cards(&mut self, cards: &[Card]) -> Result<(), CapacityError> {
        self.check_room(cards.len())?;
        self.cards.extend_from_slice(cards);
        Ok(())
    }

    /// Append `count` fresh standard decks.
    pub fn add_decks(&mut self, count: usize) -> Result<(), CapacityError> {
        self.check_room(count * DECK_SIZE)?;
        for _ in 0..count {
            self.cards.extend(standard_deck());
        }
        Ok(())
    }

    pub fn shuffle(&mut self, rng: &mut CardRng) {
        rng.shuffle(&mut self.cards);
    }

    /// Remove and return a uniformly random card.
    pub fn draw_random(&mut self, rng: &mut CardRng) -> Option<Card> {
        let index = rng.index(self.cards.len())?;
        Some(self.cards.remove(index))
    }

    /// Remove and return the highest-scoring card for `selected`. The first
    /// card reaching the maximum wins ties.
    pub fn draw_max_score(&mut self, selected: Suit) -> Option<Card> {
        let mut best: Option<(usize, u32)> = None;
        for (i, card) in self.cards.iter().enumerate() {
            let score = card.score(selected);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        best.map(|(i, _)| self.cards.remove(i))
    }

    /// Remove and return the lowest-scoring card for `selected`. The first
    /// card reaching the minimum wins ties.
    pub fn draw_min_score(&mut self, selected: Suit) -> Option<Card> {
        let mut best: Option<(usize, u32)> = None;
        for (i, card) in self.cards.iter().enumerate() {
            let score = card.score(selected);
            if best.is_none_or(|(_, s)| score < s) {
                best = Some((i, score));
            }
        }
        best.map(|(i, _)| self.cards.remove(i))
    }

    /// Remove the first occurrence of `card`. Returns whether it was present.
    pub fn remove_card(&mut self, card: &Card) -> bool {
        match self.cards.iter().position(|c| c == card) {
            Some(i) => {
                self.cards.remove(i);
                true
            }
            None => false,
        }
    }

    /// Remove every card of `cards` (counting duplicates). If any of them is
    /// missing nothing is removed and `false` is returned.
    pub fn remove_cards(&mut self, cards: &[Card]) -> bool {
        if !self.has_cards(cards) {
            return false;
        }
        for card in cards {
            self.remove_card(card);
        }
        true
    }

    /// Multiset containment: each card in `cards` must be present at least as
    /// many times as it appears there.
    pub fn has_cards(&self, cards: &[Card]) -> bool {
        let mut remaining = self.cards.clone();
        cards.iter().all(|card| match remaining.iter().position(|c| c == card) {
            Some(i) => {
                remaining.swap_remove(i);
                true
            }
            None => false,
        })
    }

    /// Sort into hand order (suit, then rank descending).
    pub fn sort(&mut self) {
        self.cards.sort();
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    /// Total score of the collection for `selected`.
    pub fn score(&self, selected: Suit) -> u32 {
        hand_score(&self.cards, selected)
    }

    fn check_room(&self, adding: usize) -> Result<(), CapacityError> {
        match self.capacity {
            Some(capacity) if self.cards.len() + adding > capacity => Err(CapacityError {
                current: self.cards.len(),
                adding,
                capacity,
            }),
            _ => Ok(()),
        }
    }
}

impl From<Vec<Card>> for CardCollection {
    fn from(cards: Vec<Card>) -> Self {
        Self {
            cards,
            capacity: None,
        }
    }
}

impl<'a> IntoIterator for &'a CardCollection {
    type Item = &'a Card;
    type IntoIter = std::slice::Iter<'a, Card>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.iter()
    }
}

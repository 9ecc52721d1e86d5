use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::levels::Mode;
use crate::engine::symbol_unlock::{self, Symbol, UNLOCK_ORDER};
use crate::generator::fisher_yates;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: u32,
    pub pair_id: u32,
    pub symbol: Symbol,
    pub flipped: bool,
    pub matched: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Deck {
    cards: Vec<Card>,
    next_id: u32,
}

impl Deck {
    /// Two face-down cards per symbol, in symbol order. `pair_id` is the symbol's index.
    pub fn from_symbols(symbols: &[Symbol]) -> Self {
        let mut deck = Self::default();
        for (pair_id, &symbol) in symbols.iter().enumerate() {
            deck.push_pair(symbol, pair_id as u32);
        }
        deck
    }

    fn push_pair(&mut self, symbol: Symbol, pair_id: u32) {
        for _ in 0..2 {
            self.cards.push(Card {
                id: self.next_id,
                pair_id,
                symbol,
                flipped: false,
                matched: false,
            });
            self.next_id += 1;
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn card(&self, id: u32) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn card_mut(&mut self, id: u32) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.id == id)
    }

    pub fn matched_count(&self) -> usize {
        self.cards.iter().filter(|c| c.matched).count()
    }

    pub fn all_matched(&self) -> bool {
        !self.cards.is_empty() && self.cards.iter().all(|c| c.matched)
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        fisher_yates(&mut self.cards, rng);
    }

    /// Turn every unmatched card face down. Returns how many were turned.
    pub fn flip_back_unmatched(&mut self) -> usize {
        let mut turned = 0;
        for card in self.cards.iter_mut().filter(|c| c.flipped && !c.matched) {
            card.flipped = false;
            turned += 1;
        }
        turned
    }

    pub fn remove_pair(&mut self, pair_id: u32) -> usize {
        let before = self.cards.len();
        self.cards.retain(|c| c.pair_id != pair_id);
        before - self.cards.len()
    }

    /// Append a pair with a random `pair_id` unused in this deck. The symbol is
    /// one not on the board yet; only a deck showing every symbol reuses one.
    pub fn insert_pair<R: Rng + ?Sized>(&mut self, rng: &mut R) -> u32 {
        let free: Vec<Symbol> = UNLOCK_ORDER
            .iter()
            .copied()
            .filter(|s| self.cards.iter().all(|c| c.symbol != *s))
            .collect();
        let pool = if free.is_empty() { UNLOCK_ORDER } else { &free[..] };
        let symbol = pool[rng.gen_range(0..pool.len())];
        let pair_id = loop {
            let candidate = rng.gen_range(0..u32::MAX);
            if self.cards.iter().all(|c| c.pair_id != candidate) {
                break candidate;
            }
        };
        self.push_pair(symbol, pair_id);
        pair_id
    }

    /// No face is shared by two different pairs.
    pub fn faces_are_unique(&self) -> bool {
        let mut owner: HashMap<Symbol, u32> = HashMap::new();
        self.cards
            .iter()
            .all(|c| *owner.entry(c.symbol).or_insert(c.pair_id) == c.pair_id)
    }

    /// Every `pair_id` appears exactly twice.
    pub fn pairing_is_valid(&self) -> bool {
        let mut counts: HashMap<u32, usize> = HashMap::new();
        for card in &self.cards {
            *counts.entry(card.pair_id).or_default() += 1;
        }
        self.cards.len() % 2 == 0 && counts.values().all(|&n| n == 2)
    }
}

pub fn build_deck<R: Rng + ?Sized>(mode: Mode, rng: &mut R) -> Deck {
    let symbols = symbol_unlock::available_symbols(mode);
    let pairs = symbol_unlock::pair_count(mode);
    let mut deck = Deck::from_symbols(&symbols[..pairs]);
    deck.shuffle(rng);
    deck
}

//! Core routing types.
//!
//! - `Side` - Buy or Sell, with fee-adjusted price projection
//! - `RoutingAlgorithm` - pure greedy or hybrid greedy/exact
//! - `Fill` - one (venue, price, volume) row of an execution plan

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::{BookLevel, OrderBook};

/// Order side indicating buy or sell direction.
///
/// A buy consumes the ask ladder (ascending price), a sell consumes the
/// bid ladder (descending price).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Buy order - acquire the base asset
    Buy,
    /// Sell order - dispose of the base asset
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Returns true if this is a buy order
    pub fn is_buy(&self) -> bool {
        matches!(self, Side::Buy)
    }

    /// Returns true if this is a sell order
    pub fn is_sell(&self) -> bool {
        matches!(self, Side::Sell)
    }

    /// Fee-adjusted price: what one unit actually costs (buy) or pays
    /// out (sell) at a quoted price under a taker fee fraction.
    pub fn effective_price(&self, price: Decimal, fee: Decimal) -> Decimal {
        match self {
            Side::Buy => price * (Decimal::ONE + fee),
            Side::Sell => price * (Decimal::ONE - fee),
        }
    }

    /// True when `candidate` is a strictly better effective price than
    /// `incumbent` for this side (cheaper for buys, richer for sells).
    pub(crate) fn is_better(&self, candidate: Decimal, incumbent: Decimal) -> bool {
        match self {
            Side::Buy => candidate < incumbent,
            Side::Sell => candidate > incumbent,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Routing algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingAlgorithm {
    /// Consume globally best fee-adjusted levels until the order is
    /// filled or no venue lot fits the remainder
    Greedy,
    /// Greedy head, exact combinatorial search on the tail once the
    /// remainder drops below the largest min-lot still in play
    Hybrid,
}

impl RoutingAlgorithm {
    /// Parse from user input; accepts the REPL shorthands `G`/`H`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "g" | "greedy" => Some(RoutingAlgorithm::Greedy),
            "h" | "hybrid" => Some(RoutingAlgorithm::Hybrid),
            _ => None,
        }
    }
}

impl fmt::Display for RoutingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingAlgorithm::Greedy => write!(f, "GREEDY"),
            RoutingAlgorithm::Hybrid => write!(f, "HYBRID"),
        }
    }
}

/// A single fill of an execution plan.
///
/// `price` is the venue's original quoted price (pre-fee); `volume` is a
/// positive multiple of the venue's min lot size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Venue the fill routes to
    pub venue: String,
    /// Original quoted price of the consumed level
    pub price: Decimal,
    /// Filled volume
    pub volume: Decimal,
}

impl Fill {
    /// Create a new fill
    pub fn new(venue: impl Into<String>, price: Decimal, volume: Decimal) -> Self {
        Self {
            venue: venue.into(),
            price,
            volume,
        }
    }

    /// Pre-fee notional value of this fill
    pub fn notional(&self) -> Decimal {
        self.price * self.volume
    }
}

impl fmt::Display for Fill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} on {}",
            self.volume.normalize(),
            self.price.normalize(),
            self.venue
        )
    }
}

// Side-directed views of the ladder an order consumes: buys take the
// asks, sells take the bids.

pub(crate) fn resting_best(book: &OrderBook, side: Side) -> Option<BookLevel> {
    match side {
        Side::Buy => book.best_ask(),
        Side::Sell => book.best_bid(),
    }
}

pub(crate) fn resting_levels(book: &OrderBook, side: Side) -> Vec<BookLevel> {
    match side {
        Side::Buy => book.asks().collect(),
        Side::Sell => book.bids().collect(),
    }
}

pub(crate) fn reduce_resting(book: &mut OrderBook, side: Side, price: Decimal, delta: Decimal) {
    match side {
        Side::Buy => book.reduce_ask_volume(price, delta),
        Side::Sell => book.reduce_bid_volume(price, delta),
    }
}

pub(crate) fn remove_resting_top(book: &mut OrderBook, side: Side) {
    match side {
        Side::Buy => book.remove_top_ask(),
        Side::Sell => book.remove_top_bid(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_effective_price_applies_fee_once() {
        assert_eq!(
            Side::Buy.effective_price(dec!(100), dec!(0.001)),
            dec!(100.1)
        );
        assert_eq!(
            Side::Sell.effective_price(dec!(100), dec!(0.001)),
            dec!(99.9)
        );
    }

    #[test]
    fn test_side_helpers() {
        assert!(Side::Buy.is_buy());
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert!(Side::Buy.is_better(dec!(99), dec!(100)));
        assert!(Side::Sell.is_better(dec!(101), dec!(100)));
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!(RoutingAlgorithm::parse("G"), Some(RoutingAlgorithm::Greedy));
        assert_eq!(RoutingAlgorithm::parse("h"), Some(RoutingAlgorithm::Hybrid));
        assert_eq!(
            RoutingAlgorithm::parse("hybrid"),
            Some(RoutingAlgorithm::Hybrid)
        );
        assert_eq!(RoutingAlgorithm::parse("x"), None);
    }

    #[test]
    fn test_fill_notional() {
        let fill = Fill::new("E1", dec!(100.5), dec!(2));
        assert_eq!(fill.notional(), dec!(201.0));
    }
}

//! Per-venue order book depth ladder.
//!
//! This module provides the snapshot book the routing engine consumes:
//! - `BookLevel` - A single price level with aggregate volume
//! - `OrderBook` - Sorted bid/ask ladders plus venue trading parameters
//!
//! Both ladders are price-sorted maps: the best bid is the highest bid
//! price, the best ask the lowest ask price. Volumes quoted at the same
//! price aggregate by addition. The book is populated once at ingestion
//! and then mutated only by the routing engine while it distributes an
//! order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::trace;

use super::VOLUME_EPSILON;

/// A single price level in the order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    /// Price at this level
    pub price: Decimal,
    /// Total volume quoted at this level
    pub volume: Decimal,
}

impl BookLevel {
    /// Create a new book level
    pub fn new(price: Decimal, volume: Decimal) -> Self {
        Self { price, volume }
    }

    /// Notional value quoted at this level
    pub fn notional(&self) -> Decimal {
        self.price * self.volume
    }
}

impl fmt::Display for BookLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.volume.normalize(), self.price.normalize())
    }
}

/// Depth ladder for one venue.
///
/// Carries the venue's trading parameters alongside the ladders so the
/// routing engine can quantize fills (`min_lot_size`) and fee-adjust
/// prices (`taker_fee`) without a side lookup.
#[derive(Debug, Clone)]
pub struct OrderBook {
    venue_id: String,
    taker_fee: Decimal,
    min_lot_size: Decimal,
    /// Bid levels (price -> volume), best bid is the max key
    bids: BTreeMap<Decimal, Decimal>,
    /// Ask levels (price -> volume), best ask is the min key
    asks: BTreeMap<Decimal, Decimal>,
}

impl OrderBook {
    /// Create an empty book for a venue.
    ///
    /// `taker_fee` is a fraction (0.001 = 0.1%); `min_lot_size` is the
    /// smallest fill quantity the venue accepts - every fill routed to
    /// this book is a positive integer multiple of it.
    pub fn new(venue_id: impl Into<String>, taker_fee: Decimal, min_lot_size: Decimal) -> Self {
        debug_assert!(min_lot_size > Decimal::ZERO);
        Self {
            venue_id: venue_id.into(),
            taker_fee,
            min_lot_size,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    /// Venue identifier
    pub fn venue_id(&self) -> &str {
        &self.venue_id
    }

    /// Taker fee fraction charged on every fill
    pub fn taker_fee(&self) -> Decimal {
        self.taker_fee
    }

    /// Smallest tradable quantity on this venue
    pub fn min_lot_size(&self) -> Decimal {
        self.min_lot_size
    }

    // ========================================================================
    // Bid side
    // ========================================================================

    /// Add volume at a bid level, aggregating with any existing volume.
    pub fn add_bid(&mut self, price: Decimal, volume: Decimal) {
        debug_assert!(volume > Decimal::ZERO);
        *self.bids.entry(price).or_insert(Decimal::ZERO) += volume;
    }

    /// Best (highest) bid, if any.
    pub fn best_bid(&self) -> Option<BookLevel> {
        self.bids
            .iter()
            .next_back()
            .map(|(&price, &volume)| BookLevel::new(price, volume))
    }

    /// Subtract `reduction` from the bid level at `price`, removing the
    /// level once its residual drops into dust.
    ///
    /// # Panics
    ///
    /// Panics if there is no bid level at `price`, or if `reduction`
    /// exceeds the level's volume by more than the volume tolerance.
    /// Both are programmer errors in the routing engine.
    pub fn reduce_bid_volume(&mut self, price: Decimal, reduction: Decimal) {
        reduce_level(&mut self.bids, &self.venue_id, "bid", price, reduction);
    }

    /// Drop the best bid level entirely.
    ///
    /// # Panics
    ///
    /// Panics if the bid side is empty.
    pub fn remove_top_bid(&mut self) {
        let Some((&price, _)) = self.bids.iter().next_back() else {
            panic!("remove_top_bid on empty bid side of {}", self.venue_id);
        };
        self.bids.remove(&price);
    }

    /// Aggregate volume quoted at a bid price, zero when absent.
    pub fn bid_volume(&self, price: Decimal) -> Decimal {
        self.bids.get(&price).copied().unwrap_or(Decimal::ZERO)
    }

    /// Bid levels, best (highest price) first.
    pub fn bids(&self) -> impl Iterator<Item = BookLevel> + '_ {
        self.bids
            .iter()
            .rev()
            .map(|(&price, &volume)| BookLevel::new(price, volume))
    }

    /// Number of bid levels
    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    // ========================================================================
    // Ask side
    // ========================================================================

    /// Add volume at an ask level, aggregating with any existing volume.
    pub fn add_ask(&mut self, price: Decimal, volume: Decimal) {
        debug_assert!(volume > Decimal::ZERO);
        *self.asks.entry(price).or_insert(Decimal::ZERO) += volume;
    }

    /// Best (lowest) ask, if any.
    pub fn best_ask(&self) -> Option<BookLevel> {
        self.asks
            .iter()
            .next()
            .map(|(&price, &volume)| BookLevel::new(price, volume))
    }

    /// Subtract `reduction` from the ask level at `price`, removing the
    /// level once its residual drops into dust.
    ///
    /// # Panics
    ///
    /// Panics if there is no ask level at `price`, or if `reduction`
    /// exceeds the level's volume by more than the volume tolerance.
    pub fn reduce_ask_volume(&mut self, price: Decimal, reduction: Decimal) {
        reduce_level(&mut self.asks, &self.venue_id, "ask", price, reduction);
    }

    /// Drop the best ask level entirely.
    ///
    /// # Panics
    ///
    /// Panics if the ask side is empty.
    pub fn remove_top_ask(&mut self) {
        let Some((&price, _)) = self.asks.iter().next() else {
            panic!("remove_top_ask on empty ask side of {}", self.venue_id);
        };
        self.asks.remove(&price);
    }

    /// Aggregate volume quoted at an ask price, zero when absent.
    pub fn ask_volume(&self, price: Decimal) -> Decimal {
        self.asks.get(&price).copied().unwrap_or(Decimal::ZERO)
    }

    /// Ask levels, best (lowest price) first.
    pub fn asks(&self) -> impl Iterator<Item = BookLevel> + '_ {
        self.asks
            .iter()
            .map(|(&price, &volume)| BookLevel::new(price, volume))
    }

    /// Number of ask levels
    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }

    // ========================================================================
    // Book-wide
    // ========================================================================

    /// True when neither side has liquidity
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Total volume resting on the bid side
    pub fn total_bid_volume(&self) -> Decimal {
        self.bids.values().copied().sum()
    }

    /// Total volume resting on the ask side
    pub fn total_ask_volume(&self) -> Decimal {
        self.asks.values().copied().sum()
    }
}

fn reduce_level(
    levels: &mut BTreeMap<Decimal, Decimal>,
    venue: &str,
    side: &str,
    price: Decimal,
    reduction: Decimal,
) {
    let Some(volume) = levels.get_mut(&price) else {
        panic!("no {side} level at {price} on {venue}");
    };
    if reduction > *volume + VOLUME_EPSILON {
        panic!(
            "reducing {side} level {price} on {venue} by {reduction} exceeds quoted volume {volume}"
        );
    }
    *volume -= reduction;
    if *volume <= VOLUME_EPSILON {
        trace!(venue, side, %price, "level exhausted, removing");
        levels.remove(&price);
    }
}

impl fmt::Display for OrderBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "OrderBook {} (taker fee {}%, min lot {})",
            self.venue_id,
            (self.taker_fee * Decimal::ONE_HUNDRED).normalize(),
            self.min_lot_size.normalize()
        )?;
        writeln!(f, "  Asks ({}):", self.ask_depth())?;
        for (&price, &volume) in self.asks.iter().rev() {
            writeln!(f, "    {}", BookLevel::new(price, volume))?;
        }
        writeln!(f, "  Bids ({}):", self.bid_depth())?;
        for level in self.bids() {
            writeln!(f, "    {level}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book() -> OrderBook {
        OrderBook::new("TestVenue", dec!(0.001), dec!(0.01))
    }

    #[test]
    fn test_add_aggregates_same_price() {
        let mut book = book();
        book.add_bid(dec!(100), dec!(1.5));
        book.add_bid(dec!(100), dec!(0.5));
        assert_eq!(book.bid_volume(dec!(100)), dec!(2.0));
        assert_eq!(book.bid_depth(), 1);
    }

    #[test]
    fn test_best_bid_is_highest_best_ask_is_lowest() {
        let mut book = book();
        book.add_bid(dec!(99), dec!(1));
        book.add_bid(dec!(101), dec!(1));
        book.add_bid(dec!(100), dec!(1));
        book.add_ask(dec!(103), dec!(1));
        book.add_ask(dec!(102), dec!(1));

        assert_eq!(book.best_bid().unwrap().price, dec!(101));
        assert_eq!(book.best_ask().unwrap().price, dec!(102));
    }

    #[test]
    fn test_ladder_iteration_order() {
        let mut book = book();
        book.add_ask(dec!(102), dec!(1));
        book.add_ask(dec!(101), dec!(2));
        book.add_bid(dec!(99), dec!(1));
        book.add_bid(dec!(100), dec!(2));

        let asks: Vec<_> = book.asks().map(|l| l.price).collect();
        assert_eq!(asks, vec![dec!(101), dec!(102)]);
        let bids: Vec<_> = book.bids().map(|l| l.price).collect();
        assert_eq!(bids, vec![dec!(100), dec!(99)]);
    }

    #[test]
    fn test_reduce_removes_exhausted_level() {
        let mut book = book();
        book.add_ask(dec!(100), dec!(1.0));
        book.reduce_ask_volume(dec!(100), dec!(0.4));
        assert_eq!(book.ask_volume(dec!(100)), dec!(0.6));

        book.reduce_ask_volume(dec!(100), dec!(0.6));
        assert_eq!(book.ask_depth(), 0);
    }

    #[test]
    fn test_reduce_removes_dust_residual() {
        let mut book = book();
        book.add_bid(dec!(100), dec!(1.0));
        book.reduce_bid_volume(dec!(100), dec!(0.9999995));
        assert_eq!(book.bid_depth(), 0);
    }

    #[test]
    #[should_panic(expected = "exceeds quoted volume")]
    fn test_over_reduction_panics() {
        let mut book = book();
        book.add_ask(dec!(100), dec!(1.0));
        book.reduce_ask_volume(dec!(100), dec!(1.5));
    }

    #[test]
    #[should_panic(expected = "no bid level")]
    fn test_reduce_missing_level_panics() {
        let mut book = book();
        book.reduce_bid_volume(dec!(100), dec!(1));
    }

    #[test]
    fn test_remove_top() {
        let mut book = book();
        book.add_ask(dec!(100), dec!(1));
        book.add_ask(dec!(101), dec!(1));
        book.remove_top_ask();
        assert_eq!(book.best_ask().unwrap().price, dec!(101));

        book.add_bid(dec!(99), dec!(1));
        book.add_bid(dec!(98), dec!(1));
        book.remove_top_bid();
        assert_eq!(book.best_bid().unwrap().price, dec!(98));
    }

    #[test]
    #[should_panic(expected = "empty ask side")]
    fn test_remove_top_empty_panics() {
        let mut book = book();
        book.remove_top_ask();
    }

    #[test]
    fn test_totals() {
        let mut book = book();
        book.add_ask(dec!(100), dec!(1));
        book.add_ask(dec!(101), dec!(2));
        assert_eq!(book.total_ask_volume(), dec!(3));
        assert_eq!(book.total_bid_volume(), Decimal::ZERO);
        assert!(!book.is_empty());
    }
}

//! Side-aware priority queue of venue best levels.
//!
//! The greedy allocator stages at most one `BestOrder` per venue: the
//! venue's current best level projected to its fee-adjusted price. The
//! queue pops the cheapest effective price first for buys and the
//! highest first for sells, with insertion order as a stable tie-break
//! so equal-priced venues drain deterministically.

use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::types::Side;

/// A venue's best level, projected for priority ordering.
#[derive(Debug, Clone)]
pub(crate) struct BestOrder {
    pub venue: String,
    /// Fee-adjusted price used for ordering
    pub effective_price: Decimal,
    /// Volume quoted at the level
    pub volume: Decimal,
    /// Original quoted price (what the fill records)
    pub original_price: Decimal,
    /// Venue taker fee
    pub fee: Decimal,
}

#[derive(Debug, Clone)]
struct QueueEntry {
    order: BestOrder,
    side: Side,
    seq: u64,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: "greatest" entry must be the one the
        // allocator wants next. Earlier insertion wins ties.
        let by_price = match self.side {
            Side::Buy => other.order.effective_price.cmp(&self.order.effective_price),
            Side::Sell => self.order.effective_price.cmp(&other.order.effective_price),
        };
        by_price.then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

/// Priority queue of staged best orders for one `distribute` call.
#[derive(Debug, Clone)]
pub(crate) struct OrderQueue {
    heap: BinaryHeap<QueueEntry>,
    side: Side,
    next_seq: u64,
}

impl OrderQueue {
    pub fn new(side: Side) -> Self {
        Self {
            heap: BinaryHeap::new(),
            side,
            next_seq: 0,
        }
    }

    pub fn push(&mut self, order: BestOrder) {
        let entry = QueueEntry {
            order,
            side: self.side,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.heap.push(entry);
    }

    pub fn pop(&mut self) -> Option<BestOrder> {
        self.heap.pop().map(|entry| entry.order)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Staged orders in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &BestOrder> {
        self.heap.iter().map(|entry| &entry.order)
    }
}

//! Exact-fill allocation for the greedy tail.
//!
//! Given the remainder of an order and the venues still staged by the
//! greedy loop, enumerate whole-lot candidates across those venues and
//! search for a combination whose volume equals the remainder exactly,
//! minimizing cost for buys and maximizing proceeds for sells. When no
//! exact combination exists, fall back to the best undershoot: the
//! largest achievable volume not exceeding the remainder, ties broken by
//! the same cost criterion.
//!
//! The search space is small by construction - the greedy loop only
//! hands over once the remainder drops below the largest staged min
//! lot, so candidate counts are bounded by `remainder / smallest lot`
//! per venue.

use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::data::{OrderBook, VOLUME_EPSILON};

use super::types::{resting_levels, Fill, Side};

/// One whole venue lot available in the tail region.
#[derive(Debug, Clone)]
struct LotCandidate {
    venue: String,
    price: Decimal,
    /// Exactly the venue's min lot size
    volume: Decimal,
    effective_price: Decimal,
}

impl LotCandidate {
    /// Fee-adjusted cost (buy) or proceeds (sell) of taking this lot
    fn cost(&self) -> Decimal {
        self.volume * self.effective_price
    }
}

/// Walk each venue's relevant side in price order, emitting unit lots
/// until the level is exhausted or the venue's cumulative emitted volume
/// reaches the target. The cap keeps the candidate list proportional to
/// the tail size.
fn generate_candidates(
    books: &BTreeMap<String, OrderBook>,
    venues: &[String],
    target: Decimal,
    side: Side,
) -> Vec<LotCandidate> {
    let mut candidates = Vec::new();

    for venue in venues {
        let book = match books.get(venue) {
            Some(book) => book,
            None => panic!("unknown venue '{venue}' in exact search"),
        };
        let lot = book.min_lot_size();
        let mut cumulative = Decimal::ZERO;

        'levels: for level in resting_levels(book, side) {
            let mut taken = Decimal::ZERO;
            while level.volume - taken >= lot {
                if cumulative >= target + VOLUME_EPSILON {
                    break 'levels;
                }
                candidates.push(LotCandidate {
                    venue: venue.clone(),
                    price: level.price,
                    volume: lot,
                    effective_price: side.effective_price(level.price, book.taker_fee()),
                });
                taken += lot;
                cumulative += lot;
            }
        }
    }

    // Best-first scan order; sort_by is stable so the venue walk order
    // breaks ties deterministically.
    match side {
        Side::Buy => candidates.sort_by(|a, b| a.effective_price.cmp(&b.effective_price)),
        Side::Sell => candidates.sort_by(|a, b| b.effective_price.cmp(&a.effective_price)),
    }
    candidates
}

/// Chosen candidate indices with their combined cost.
type Selection = (Decimal, Vec<usize>);

struct Searcher<'a> {
    candidates: &'a [LotCandidate],
    side: Side,
    memo: HashMap<(Decimal, usize), Option<Selection>>,
}

impl Searcher<'_> {
    /// Take/skip recursion for an exact fill of `remaining` using
    /// candidates from `index` on. `None` means no combination sums to
    /// `remaining` exactly.
    fn exact(&mut self, remaining: Decimal, index: usize) -> Option<Selection> {
        if remaining <= VOLUME_EPSILON {
            return Some((Decimal::ZERO, Vec::new()));
        }
        if index >= self.candidates.len() {
            return None;
        }
        if let Some(memoized) = self.memo.get(&(remaining, index)) {
            return memoized.clone();
        }

        let candidate = &self.candidates[index];
        let take = if candidate.volume <= remaining + VOLUME_EPSILON {
            self.exact(remaining - candidate.volume, index + 1)
                .map(|(cost, mut picks)| {
                    picks.push(index);
                    (cost + candidate.cost(), picks)
                })
        } else {
            None
        };
        let skip = self.exact(remaining, index + 1);

        let best = match (take, skip) {
            (Some(take), Some(skip)) => {
                if self.side.is_better(skip.0, take.0) {
                    Some(skip)
                } else {
                    Some(take)
                }
            }
            (take, None) => take,
            (None, skip) => skip,
        };
        self.memo.insert((remaining, index), best.clone());
        best
    }

    /// Depth-first enumeration of combinations with volume <= `target`,
    /// keeping the largest volume and breaking volume ties by cost.
    fn undershoot(
        &self,
        index: usize,
        volume: Decimal,
        cost: Decimal,
        picks: &mut Vec<usize>,
        target: Decimal,
        best: &mut UndershootBest,
    ) {
        if volume > best.volume
            || (volume == best.volume && self.side.is_better(cost, best.cost))
        {
            best.volume = volume;
            best.cost = cost;
            best.picks = picks.clone();
        }
        if index >= self.candidates.len() {
            return;
        }

        let candidate = &self.candidates[index];
        if volume + candidate.volume <= target + VOLUME_EPSILON {
            picks.push(index);
            self.undershoot(
                index + 1,
                volume + candidate.volume,
                cost + candidate.cost(),
                picks,
                target,
                best,
            );
            picks.pop();
        }
        self.undershoot(index + 1, volume, cost, picks, target, best);
    }
}

struct UndershootBest {
    volume: Decimal,
    cost: Decimal,
    picks: Vec<usize>,
}

/// Aggregate chosen lots by (venue, price) and order them best price
/// first for presentation.
fn aggregate(candidates: &[LotCandidate], picks: &[usize], side: Side) -> Vec<Fill> {
    let mut combined: BTreeMap<(String, Decimal), (Decimal, Decimal)> = BTreeMap::new();
    for &index in picks {
        let candidate = &candidates[index];
        let entry = combined
            .entry((candidate.venue.clone(), candidate.price))
            .or_insert((Decimal::ZERO, candidate.effective_price));
        entry.0 += candidate.volume;
    }

    let mut fills: Vec<(Fill, Decimal)> = combined
        .into_iter()
        .map(|((venue, price), (volume, effective_price))| {
            (Fill::new(venue, price, volume), effective_price)
        })
        .collect();
    match side {
        Side::Buy => fills.sort_by(|a, b| a.1.cmp(&b.1)),
        Side::Sell => fills.sort_by(|a, b| b.1.cmp(&a.1)),
    }
    fills.into_iter().map(|(fill, _)| fill).collect()
}

/// Find the best whole-lot combination for `remaining` across `venues`.
///
/// Returns aggregated fills summing to `remaining` exactly when such a
/// combination exists, otherwise the best undershoot (possibly empty).
/// Books are read, never mutated; the caller applies the fills.
pub(crate) fn allocate(
    books: &BTreeMap<String, OrderBook>,
    venues: &[String],
    remaining: Decimal,
    side: Side,
) -> Vec<Fill> {
    let candidates = generate_candidates(books, venues, remaining, side);
    debug!(
        %remaining,
        venues = venues.len(),
        candidates = candidates.len(),
        "exact search over tail candidates"
    );
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut searcher = Searcher {
        candidates: &candidates,
        side,
        memo: HashMap::new(),
    };

    if let Some((cost, picks)) = searcher.exact(remaining, 0) {
        debug!(%cost, lots = picks.len(), "exact fill found");
        return aggregate(&candidates, &picks, side);
    }

    let mut best = UndershootBest {
        volume: Decimal::ZERO,
        cost: Decimal::ZERO,
        picks: Vec::new(),
    };
    searcher.undershoot(0, Decimal::ZERO, Decimal::ZERO, &mut Vec::new(), remaining, &mut best);
    debug!(
        volume = %best.volume,
        cost = %best.cost,
        lots = best.picks.len(),
        "no exact fill, taking best undershoot"
    );
    aggregate(&candidates, &best.picks, side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn books_of(entries: Vec<OrderBook>) -> BTreeMap<String, OrderBook> {
        entries
            .into_iter()
            .map(|book| (book.venue_id().to_string(), book))
            .collect()
    }

    fn venue_ids(books: &BTreeMap<String, OrderBook>) -> Vec<String> {
        books.keys().cloned().collect()
    }

    #[test]
    fn test_exact_fill_prefers_cheapest_combination() {
        let mut e1 = OrderBook::new("E1", dec!(0.001), dec!(5.0));
        e1.add_ask(dec!(100), dec!(5));
        e1.add_ask(dec!(101), dec!(5));
        let mut e2 = OrderBook::new("E2", dec!(0.0005), dec!(7.0));
        e2.add_ask(dec!(100.5), dec!(7));
        let mut e3 = OrderBook::new("E3", dec!(0.0002), dec!(4.0));
        e3.add_ask(dec!(100.6), dec!(4));
        e3.add_ask(dec!(100.8), dec!(4));
        let books = books_of(vec![e1, e2, e3]);

        let fills = allocate(&books, &venue_ids(&books), dec!(8), Side::Buy);
        let total: Decimal = fills.iter().map(|f| f.volume).sum();
        assert_eq!(total, dec!(8));
        // Two E3 lots are the only combination hitting 8 exactly.
        assert!(fills.iter().all(|f| f.venue == "E3"));
    }

    #[test]
    fn test_undershoot_when_no_exact_combination() {
        let mut e1 = OrderBook::new("E1", dec!(0.001), dec!(3.0));
        e1.add_ask(dec!(100), dec!(9));
        let books = books_of(vec![e1]);

        let fills = allocate(&books, &venue_ids(&books), dec!(8), Side::Buy);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].volume, dec!(6));
        assert_eq!(fills[0].price, dec!(100));
    }

    #[test]
    fn test_lots_aggregate_per_level() {
        let mut e1 = OrderBook::new("E1", dec!(0.001), dec!(2.0));
        e1.add_ask(dec!(100), dec!(6));
        let books = books_of(vec![e1]);

        let fills = allocate(&books, &venue_ids(&books), dec!(6), Side::Buy);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].volume, dec!(6));
    }

    #[test]
    fn test_sell_maximizes_proceeds() {
        let mut e1 = OrderBook::new("E1", dec!(0.01), dec!(1.0));
        e1.add_bid(dec!(100), dec!(2));
        let mut e2 = OrderBook::new("E2", dec!(0.0), dec!(1.0));
        e2.add_bid(dec!(99.5), dec!(2));
        let books = books_of(vec![e1, e2]);

        // E1's 1% fee makes its 100 bid pay 99; E2's fee-free 99.5 wins.
        let fills = allocate(&books, &venue_ids(&books), dec!(2), Side::Sell);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].venue, "E2");
        assert_eq!(fills[0].volume, dec!(2));
    }

    #[test]
    fn test_empty_venue_list_yields_nothing() {
        let books = books_of(vec![OrderBook::new("E1", dec!(0.001), dec!(1.0))]);
        let fills = allocate(&books, &[], dec!(5), Side::Buy);
        assert!(fills.is_empty());
    }

    #[test]
    fn test_candidate_cap_bounds_enumeration() {
        let mut e1 = OrderBook::new("E1", dec!(0.001), dec!(1.0));
        e1.add_ask(dec!(100), dec!(1000));
        let books = books_of(vec![e1]);

        // Cap keeps this to ~5 candidates rather than 1000.
        let candidates = generate_candidates(&books, &venue_ids(&books), dec!(5), Side::Buy);
        assert!(candidates.len() <= 6);
        let fills = allocate(&books, &venue_ids(&books), dec!(5), Side::Buy);
        assert_eq!(fills[0].volume, dec!(5));
    }
}

//! Greedy allocation: consume the globally best fee-adjusted level at
//! every step.
//!
//! One `BestOrder` per venue is staged in a side-aware priority queue.
//! Each iteration pops the best entry, quantizes the takeable volume to
//! the venue's lot grid, appends the fill, and stages the venue's next
//! level. In hybrid mode the loop watches for the crossover point - the
//! step after which the unfilled tail would be smaller than the largest
//! min lot still in play - and hands the whole remainder to the exact
//! allocator instead, which strictly dominates greedy on the tail.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

use crate::data::{OrderBook, VOLUME_EPSILON};

use super::optimal;
use super::plan::ExecutionPlan;
use super::queue::{BestOrder, OrderQueue};
use super::types::{
    reduce_resting, remove_resting_top, resting_best, Fill, RoutingAlgorithm, Side,
};

fn stage(queue: &mut OrderQueue, book: &OrderBook, side: Side) {
    let Some(level) = resting_best(book, side) else {
        return;
    };
    debug!(
        venue = book.venue_id(),
        price = %level.price,
        volume = %level.volume,
        effective_price = %side.effective_price(level.price, book.taker_fee()),
        "staging venue best level"
    );
    queue.push(BestOrder {
        venue: book.venue_id().to_string(),
        effective_price: side.effective_price(level.price, book.taker_fee()),
        volume: level.volume,
        original_price: level.price,
        fee: book.taker_fee(),
    });
}

/// Run the greedy loop over `books`, appending fills to `plan`.
///
/// `books` is mutated: consumed levels are reduced or removed. In
/// hybrid mode the exact allocator takes over at the crossover point
/// and its fills are applied the same way.
pub(crate) fn allocate(
    books: &mut BTreeMap<String, OrderBook>,
    order_size: Decimal,
    side: Side,
    algorithm: RoutingAlgorithm,
    plan: &mut ExecutionPlan,
) {
    let mut remaining = order_size;
    let mut queue = OrderQueue::new(side);
    let mut min_lot_global: Option<Decimal> = None;
    let mut largest_min_lot = Decimal::ZERO;

    for book in books.values() {
        if resting_best(book, side).is_none() {
            continue;
        }
        stage(&mut queue, book, side);
        min_lot_global = Some(match min_lot_global {
            None => book.min_lot_size(),
            Some(lot) => lot.min(book.min_lot_size()),
        });
        largest_min_lot = largest_min_lot.max(book.min_lot_size());
    }

    let Some(min_lot_global) = min_lot_global else {
        debug!(%order_size, %side, "no venue quotes the relevant side");
        return;
    };

    while remaining >= min_lot_global {
        let Some(best) = queue.pop() else {
            break;
        };
        let min_lot_venue = books[&best.venue].min_lot_size();

        let raw_fill = best.volume.min(remaining);
        // Quantize to the venue's lot grid; the epsilon absorbs
        // representation noise when raw_fill is already an exact multiple.
        let fill = ((raw_fill / min_lot_venue) + VOLUME_EPSILON).floor() * min_lot_venue;

        if algorithm == RoutingAlgorithm::Hybrid && fill > Decimal::ZERO {
            let tail = remaining - fill;
            if tail > Decimal::ZERO && tail < largest_min_lot {
                debug!(
                    %remaining,
                    %tail,
                    %largest_min_lot,
                    "tail below crossover threshold, switching to exact search"
                );
                let mut venues = vec![best.venue.clone()];
                venues.extend(queue.iter().map(|order| order.venue.clone()));
                let fills = optimal::allocate(books, &venues, remaining, side);
                for fill in fills {
                    let book = books
                        .get_mut(&fill.venue)
                        .expect("exact fill references a routed venue");
                    reduce_resting(book, side, fill.price, fill.volume);
                    remaining -= fill.volume;
                    plan.add_fill(fill);
                }
                return;
            }
        }

        let book = books
            .get_mut(&best.venue)
            .expect("staged order references a routed venue");
        if fill > Decimal::ZERO {
            debug!(
                venue = %best.venue,
                price = %best.original_price,
                volume = %fill,
                "appending fill"
            );
            plan.add_fill(Fill::new(best.venue.clone(), best.original_price, fill));
            remaining -= fill;
            reduce_resting(book, side, best.original_price, fill);
        } else {
            // The whole level is smaller than one venue lot; drop it so
            // the venue's next level can be staged.
            debug!(
                venue = %best.venue,
                price = %best.original_price,
                "level below venue lot, removing"
            );
            remove_resting_top(book, side);
        }

        // Stage the venue's next best level, if one fits what's left.
        let book = &books[&best.venue];
        if resting_best(book, side).is_some() {
            if book.min_lot_size() <= remaining {
                stage(&mut queue, book, side);
            }
        } else {
            // Venue side exhausted: the crossover threshold shrinks to
            // the venues still staged.
            largest_min_lot = queue
                .iter()
                .map(|order| books[&order.venue].min_lot_size())
                .max()
                .unwrap_or(Decimal::ZERO);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::plan::FeeTable;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn route(
        books: &mut BTreeMap<String, OrderBook>,
        size: Decimal,
        side: Side,
        algorithm: RoutingAlgorithm,
    ) -> ExecutionPlan {
        let fees: FeeTable = books
            .iter()
            .map(|(venue, book)| (venue.clone(), book.taker_fee()))
            .collect();
        let mut plan = ExecutionPlan::new(side, size, Arc::new(fees));
        allocate(books, size, side, algorithm, &mut plan);
        plan
    }

    fn insert(books: &mut BTreeMap<String, OrderBook>, book: OrderBook) {
        books.insert(book.venue_id().to_string(), book);
    }

    #[test]
    fn test_single_venue_walks_levels_in_price_order() {
        let mut books = BTreeMap::new();
        let mut book = OrderBook::new("E1", dec!(0.001), dec!(1.0));
        book.add_ask(dec!(101), dec!(10));
        book.add_ask(dec!(100), dec!(10));
        insert(&mut books, book);

        let plan = route(&mut books, dec!(12), Side::Buy, RoutingAlgorithm::Greedy);
        let fills = plan.fills();
        assert_eq!(fills.len(), 2);
        assert_eq!((fills[0].price, fills[0].volume), (dec!(100), dec!(10)));
        assert_eq!((fills[1].price, fills[1].volume), (dec!(101), dec!(2)));
        assert_eq!(plan.fulfillment_percentage(), dec!(100));
        assert_eq!(books["E1"].ask_volume(dec!(101)), dec!(8));
    }

    #[test]
    fn test_fee_adjusted_cross_venue_ordering() {
        let mut books = BTreeMap::new();
        // Raw prices tie at 100; E2's lower fee makes it effectively cheaper.
        let mut e1 = OrderBook::new("E1", dec!(0.002), dec!(0.1));
        e1.add_ask(dec!(100), dec!(1));
        insert(&mut books, e1);
        let mut e2 = OrderBook::new("E2", dec!(0.0005), dec!(0.1));
        e2.add_ask(dec!(100), dec!(1));
        insert(&mut books, e2);

        let plan = route(&mut books, dec!(1.5), Side::Buy, RoutingAlgorithm::Greedy);
        assert_eq!(plan.fills()[0].venue, "E2");
        assert_eq!(plan.fills()[1].venue, "E1");
    }

    #[test]
    fn test_sell_consumes_bids_best_first() {
        let mut books = BTreeMap::new();
        let mut e1 = OrderBook::new("E1", dec!(0.001), dec!(0.01));
        e1.add_bid(dec!(99), dec!(1));
        e1.add_bid(dec!(100), dec!(1));
        insert(&mut books, e1);

        let plan = route(&mut books, dec!(1.5), Side::Sell, RoutingAlgorithm::Greedy);
        assert_eq!(plan.fills()[0].price, dec!(100));
        assert_eq!(plan.fills()[1].price, dec!(99));
        assert_eq!(plan.filled_volume(), dec!(1.5));
    }

    #[test]
    fn test_zero_quantized_fill_drops_level_and_continues() {
        let mut books = BTreeMap::new();
        let mut e1 = OrderBook::new("E1", dec!(0.001), dec!(1.0));
        // Best level holds less than one lot; the next is fillable.
        e1.add_ask(dec!(100), dec!(0.4));
        e1.add_ask(dec!(101), dec!(5));
        insert(&mut books, e1);

        let plan = route(&mut books, dec!(3), Side::Buy, RoutingAlgorithm::Greedy);
        assert_eq!(plan.fills().len(), 1);
        assert_eq!(plan.fills()[0].price, dec!(101));
        assert_eq!(plan.fills()[0].volume, dec!(3));
        assert_eq!(books["E1"].ask_depth(), 1);
    }

    #[test]
    fn test_stops_when_no_lot_fits_remaining() {
        let mut books = BTreeMap::new();
        let mut e1 = OrderBook::new("E1", dec!(0.001), dec!(5.0));
        e1.add_ask(dec!(100), dec!(20));
        insert(&mut books, e1);

        // 12 = 2 lots of 5, tail of 2 unfillable
        let plan = route(&mut books, dec!(12), Side::Buy, RoutingAlgorithm::Greedy);
        assert_eq!(plan.filled_volume(), dec!(10));
        assert!(plan.fulfillment_percentage() < dec!(100));
    }

    #[test]
    fn test_empty_books_produce_empty_plan() {
        let mut books = BTreeMap::new();
        insert(&mut books, OrderBook::new("E1", dec!(0.001), dec!(1)));

        let plan = route(&mut books, dec!(5), Side::Buy, RoutingAlgorithm::Greedy);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_zero_size_leaves_books_untouched() {
        let mut books = BTreeMap::new();
        let mut e1 = OrderBook::new("E1", dec!(0.001), dec!(1));
        e1.add_ask(dec!(100), dec!(5));
        insert(&mut books, e1);

        let plan = route(&mut books, Decimal::ZERO, Side::Buy, RoutingAlgorithm::Greedy);
        assert!(plan.is_empty());
        assert_eq!(books["E1"].ask_volume(dec!(100)), dec!(5));
    }

    #[test]
    fn test_lot_quantization_absorbs_representation_noise() {
        let mut books = BTreeMap::new();
        let mut e1 = OrderBook::new("E1", dec!(0.001), dec!(0.1));
        e1.add_ask(dec!(100), dec!(1.0000000003));
        insert(&mut books, e1);

        let plan = route(&mut books, dec!(1.0), Side::Buy, RoutingAlgorithm::Greedy);
        assert_eq!(plan.filled_volume(), dec!(1.0));
    }
}

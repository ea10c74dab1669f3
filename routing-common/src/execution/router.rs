//! Smart order router: splits one order across venue books.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::data::OrderBook;

use super::greedy;
use super::plan::{ExecutionPlan, FeeTable};
use super::types::{RoutingAlgorithm, Side};

/// Routes orders across the venue books it owns.
///
/// The router takes ownership of the books at construction and mutates
/// them as orders consume liquidity, so repeated `distribute` calls see
/// the depth earlier fills left behind. The venue fee table is snapshot
/// into a shared immutable map that every produced plan keeps a handle
/// to; plans stay valid after the router is dropped.
///
/// One `distribute` runs at a time (it takes `&mut self`); routers over
/// disjoint book sets are independent.
pub struct SmartOrderRouter {
    books: BTreeMap<String, OrderBook>,
    fees: Arc<FeeTable>,
}

impl SmartOrderRouter {
    /// Take ownership of one book per venue.
    pub fn new(books: impl IntoIterator<Item = OrderBook>) -> Self {
        let books: BTreeMap<String, OrderBook> = books
            .into_iter()
            .map(|book| (book.venue_id().to_string(), book))
            .collect();
        let fees: FeeTable = books
            .iter()
            .map(|(venue, book)| (venue.clone(), book.taker_fee()))
            .collect();
        Self {
            books,
            fees: Arc::new(fees),
        }
    }

    /// Split `order_size` across the books, consuming the best
    /// fee-adjusted levels under each venue's min-lot discipline.
    ///
    /// Returns the plan of intended fills; sending them anywhere is the
    /// caller's concern. The plan may be partial (or empty) when
    /// liquidity runs out - see its fulfillment percentage.
    pub fn distribute(
        &mut self,
        order_size: Decimal,
        side: Side,
        algorithm: RoutingAlgorithm,
    ) -> ExecutionPlan {
        debug_assert!(order_size >= Decimal::ZERO);
        info!(%order_size, %side, %algorithm, "distributing order");

        let mut plan = ExecutionPlan::new(side, order_size, Arc::clone(&self.fees));
        greedy::allocate(&mut self.books, order_size, side, algorithm, &mut plan);

        info!(
            fills = plan.fills().len(),
            filled = %plan.filled_volume(),
            fulfillment = %plan.fulfillment_percentage().round_dp(2),
            "distribution complete"
        );
        plan
    }

    /// Remaining books, in venue order. What they quote is what earlier
    /// distributions have not consumed.
    pub fn books(&self) -> impl Iterator<Item = &OrderBook> {
        self.books.values()
    }

    /// One venue's remaining book.
    pub fn book(&self, venue: &str) -> Option<&OrderBook> {
        self.books.get(venue)
    }

    /// Shared venue -> taker fee table.
    pub fn fee_table(&self) -> &Arc<FeeTable> {
        &self.fees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn router() -> SmartOrderRouter {
        let mut e1 = OrderBook::new("E1", dec!(0.001), dec!(1.0));
        e1.add_ask(dec!(100), dec!(10));
        e1.add_ask(dec!(101), dec!(10));
        e1.add_bid(dec!(99), dec!(10));
        SmartOrderRouter::new(vec![e1])
    }

    #[test]
    fn test_distribute_consumes_liquidity_across_calls() {
        let mut router = router();
        let first = router.distribute(dec!(10), Side::Buy, RoutingAlgorithm::Greedy);
        assert_eq!(first.fills()[0].price, dec!(100));

        // Level 100 is gone; the next buy starts at 101.
        let second = router.distribute(dec!(5), Side::Buy, RoutingAlgorithm::Greedy);
        assert_eq!(second.fills()[0].price, dec!(101));
    }

    #[test]
    fn test_plan_outlives_router() {
        let mut router = router();
        let plan = router.distribute(dec!(10), Side::Buy, RoutingAlgorithm::Greedy);
        drop(router);
        assert_eq!(plan.total_fees(), dec!(1));
    }

    #[test]
    fn test_fee_table_snapshot() {
        let router = router();
        assert_eq!(router.fee_table().get("E1"), Some(&dec!(0.001)));
    }

    #[test]
    fn test_book_access() {
        let router = router();
        assert!(router.book("E1").is_some());
        assert!(router.book("E9").is_none());
        assert_eq!(router.books().count(), 1);
    }
}

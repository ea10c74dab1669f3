//! Order routing engine.
//!
//! A `SmartOrderRouter` owns one `OrderBook` per venue and answers
//! `distribute` requests with an `ExecutionPlan`: an ordered list of
//! (venue, price, volume) fills approximating the best fee-adjusted
//! execution under each venue's min-lot constraint.
//!
//! Two allocation strategies cooperate:
//! - greedy consumption of the globally best fee-adjusted level
//!   (cheap, optimal on the head of the order), and
//! - an exact combinatorial search over whole lots (takes over on the
//!   tail, where greedy can strand volume that no venue lot divides).

mod greedy;
mod optimal;
mod plan;
mod queue;
mod router;
mod types;

pub use plan::{ExecutionPlan, FeeTable};
pub use router::SmartOrderRouter;
pub use types::{Fill, RoutingAlgorithm, Side};

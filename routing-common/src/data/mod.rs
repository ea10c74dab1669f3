//! Market data structures and book ingestion.

pub mod loader;
pub mod orderbook;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub use loader::{load_book_csv, read_book};
pub use orderbook::{BookLevel, OrderBook};

/// Tolerance for volume comparisons against lot boundaries and residuals.
///
/// A level whose volume drops to or below this value is treated as empty.
pub const VOLUME_EPSILON: Decimal = dec!(0.000001);

//! Execution plan: the ordered fill list a `distribute` call produces.
//!
//! Append-only during construction, read-only afterwards. Derived
//! quantities (fees, cost/proceeds, average effective price,
//! fulfillment) are pure functions of the fills and the shared venue fee
//! table, so a plan stays usable after the router that produced it is
//! gone.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::types::{Fill, Side};

/// Immutable venue -> taker fee mapping shared between the router and
/// every plan it produces.
pub type FeeTable = HashMap<String, Decimal>;

/// Ordered fills plus the request they answer.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    fills: Vec<Fill>,
    side: Side,
    requested_size: Decimal,
    fees: Arc<FeeTable>,
}

impl ExecutionPlan {
    /// Create an empty plan for a request.
    pub fn new(side: Side, requested_size: Decimal, fees: Arc<FeeTable>) -> Self {
        Self {
            fills: Vec::new(),
            side,
            requested_size,
            fees,
        }
    }

    /// Append a fill. Fills are never removed or reordered.
    pub fn add_fill(&mut self, fill: Fill) {
        self.fills.push(fill);
    }

    /// The fills in execution order.
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Side of the request
    pub fn side(&self) -> Side {
        self.side
    }

    /// Originally requested size
    pub fn requested_size(&self) -> Decimal {
        self.requested_size
    }

    /// True when no fill was produced
    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    /// Total volume across all fills.
    pub fn filled_volume(&self) -> Decimal {
        self.fills.iter().map(|f| f.volume).sum()
    }

    /// Taker fee for a venue in this plan.
    ///
    /// # Panics
    ///
    /// Panics on a venue absent from the fee table; a fill can only
    /// reference venues the router was built with.
    fn venue_fee(&self, venue: &str) -> Decimal {
        match self.fees.get(venue) {
            Some(&fee) => fee,
            None => panic!("unknown venue '{venue}' in execution plan"),
        }
    }

    /// Sum of fee amounts: `volume * price * fee` per fill.
    pub fn total_fees(&self) -> Decimal {
        self.fills
            .iter()
            .map(|f| f.notional() * self.venue_fee(&f.venue))
            .sum()
    }

    /// Total cost for a buy (fees included), total proceeds for a sell
    /// (net of fees).
    pub fn total(&self) -> Decimal {
        self.fills
            .iter()
            .map(|f| f.volume * self.side.effective_price(f.price, self.venue_fee(&f.venue)))
            .sum()
    }

    /// Volume-weighted effective price, zero for an empty plan.
    pub fn average_effective_price(&self) -> Decimal {
        let filled = self.filled_volume();
        if filled.is_zero() {
            Decimal::ZERO
        } else {
            self.total() / filled
        }
    }

    /// Filled share of the request, in percent. A zero-size request is
    /// trivially complete.
    pub fn fulfillment_percentage(&self) -> Decimal {
        if self.requested_size.is_zero() {
            Decimal::ONE_HUNDRED
        } else {
            self.filled_volume() / self.requested_size * Decimal::ONE_HUNDRED
        }
    }
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Execution Plan ({} {}):",
            self.side,
            self.requested_size.normalize()
        )?;
        for fill in &self.fills {
            let fee = self.venue_fee(&fill.venue);
            writeln!(
                f,
                "  Venue: {}, Price: {}, Quantity: {}, Fee Amount: {}, Effective Price: {}",
                fill.venue,
                fill.price.normalize(),
                fill.volume.normalize(),
                (fill.notional() * fee).normalize(),
                self.side.effective_price(fill.price, fee).normalize()
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Metrics:")?;
        writeln!(f, "  Total Fees: {}", self.total_fees().normalize())?;
        if self.side.is_buy() {
            writeln!(
                f,
                "  Total Cost (including fees): {}",
                self.total().normalize()
            )?;
        } else {
            writeln!(
                f,
                "  Total Proceeds (after fees): {}",
                self.total().normalize()
            )?;
        }
        writeln!(
            f,
            "  Average Effective Price: {}",
            self.average_effective_price().normalize()
        )?;
        write!(
            f,
            "  Fulfillment Percentage: {}%",
            self.fulfillment_percentage().normalize()
        )
    }
}

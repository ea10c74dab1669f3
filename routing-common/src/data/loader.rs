//! CSV order-book snapshot loader.
//!
//! Parses one venue's depth snapshot from a `price,volume,type` CSV file
//! (header row discarded, `type` is `Bid` or `Ask`). Rows with an
//! unrecognized type are skipped; malformed numeric fields abort the
//! file and surface a [`LoadError`] to the caller.

use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::LoadError;

use super::OrderBook;

/// Parse a decimal field that may use scientific notation (e.g. "7.314e-05").
fn parse_decimal_field(s: &str) -> Result<Decimal, String> {
    if let Ok(d) = Decimal::from_str(s) {
        return Ok(d);
    }

    // Fall back through f64 to handle exponent notation
    let f: f64 = s
        .parse()
        .map_err(|e: std::num::ParseFloatError| e.to_string())?;
    Decimal::try_from(f).map_err(|e| e.to_string())
}

/// Read `price,volume,type` rows from `reader` into `book`.
///
/// The first line is discarded as a header. Returns the number of rows
/// ingested (skipped rows not counted).
pub fn read_book<R: Read>(reader: R, book: &mut OrderBook) -> Result<usize, LoadError> {
    let reader = BufReader::new(reader);
    let mut ingested = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = index + 1;
        if line_number == 1 {
            continue; // header
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let fields: Vec<&str> = trimmed.split(',').map(|s| s.trim()).collect();
        if fields.len() != 3 {
            return Err(LoadError::FieldCount {
                line: line_number,
                count: fields.len(),
            });
        }

        let price = parse_decimal_field(fields[0]).map_err(|reason| LoadError::InvalidPrice {
            line: line_number,
            value: fields[0].to_string(),
            reason,
        })?;
        let volume = parse_decimal_field(fields[1]).map_err(|reason| LoadError::InvalidVolume {
            line: line_number,
            value: fields[1].to_string(),
            reason,
        })?;
        if volume <= Decimal::ZERO {
            return Err(LoadError::NonPositiveVolume {
                line: line_number,
                value: fields[1].to_string(),
            });
        }

        match fields[2] {
            "Bid" => book.add_bid(price, volume),
            "Ask" => book.add_ask(price, volume),
            other => {
                warn!(
                    venue = book.venue_id(),
                    line = line_number,
                    side = other,
                    "skipping row with unknown side"
                );
                continue;
            }
        }
        ingested += 1;
    }

    Ok(ingested)
}

/// Load a venue's book snapshot from a CSV file on disk.
pub fn load_book_csv(path: impl AsRef<Path>, book: &mut OrderBook) -> Result<usize, LoadError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let ingested = read_book(file, book)?;
    debug!(
        venue = book.venue_id(),
        file = %path.display(),
        rows = ingested,
        "loaded book snapshot"
    );
    Ok(ingested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book() -> OrderBook {
        OrderBook::new("TestVenue", dec!(0.001), dec!(0.01))
    }

    #[test]
    fn test_reads_bids_and_asks() {
        let csv = "price,volume,type\n100.5,2.0,Bid\n101.0,1.5,Ask\n100.5,1.0,Bid\n";
        let mut book = book();
        let rows = read_book(csv.as_bytes(), &mut book).unwrap();

        assert_eq!(rows, 3);
        assert_eq!(book.bid_volume(dec!(100.5)), dec!(3.0));
        assert_eq!(book.best_ask().unwrap().price, dec!(101.0));
    }

    #[test]
    fn test_skips_unknown_side() {
        let csv = "price,volume,type\n100,1,Bid\n101,1,Trade\n";
        let mut book = book();
        let rows = read_book(csv.as_bytes(), &mut book).unwrap();

        assert_eq!(rows, 1);
        assert_eq!(book.ask_depth(), 0);
    }

    #[test]
    fn test_scientific_notation_volume() {
        let csv = "price,volume,type\n100,7.314e-05,Ask\n";
        let mut book = book();
        read_book(csv.as_bytes(), &mut book).unwrap();
        assert_eq!(book.ask_volume(dec!(100)), dec!(0.00007314));
    }

    #[test]
    fn test_malformed_price_aborts() {
        let csv = "price,volume,type\n100,1,Bid\nnot-a-price,1,Ask\n";
        let mut book = book();
        let err = read_book(csv.as_bytes(), &mut book).unwrap_err();
        assert!(matches!(err, LoadError::InvalidPrice { line: 3, .. }));
    }

    #[test]
    fn test_wrong_field_count_aborts() {
        let csv = "price,volume,type\n100,1\n";
        let mut book = book();
        let err = read_book(csv.as_bytes(), &mut book).unwrap_err();
        assert!(matches!(err, LoadError::FieldCount { line: 2, count: 2 }));
    }

    #[test]
    fn test_non_positive_volume_aborts() {
        let csv = "price,volume,type\n100,0,Bid\n";
        let mut book = book();
        let err = read_book(csv.as_bytes(), &mut book).unwrap_err();
        assert!(matches!(err, LoadError::NonPositiveVolume { line: 2, .. }));
    }
}

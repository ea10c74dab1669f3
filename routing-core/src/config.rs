//! CLI configuration: venue parameters and book file locations.

use config::{Config, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/routing";

/// Errors while loading or validating the venue configuration.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// Configuration names no venues at all
    #[error("no venues configured")]
    EmptyVenues,

    /// A venue entry has a blank id
    #[error("venue with empty id")]
    EmptyVenueId,

    /// Two venue entries share an id
    #[error("duplicate venue id '{0}'")]
    DuplicateVenueId(String),

    /// Taker fee is not a fraction in [0, 1)
    #[error("venue '{venue}': taker_fee {fee} outside [0, 1)")]
    FeeOutOfRange { venue: String, fee: Decimal },

    /// Min lot size is zero or negative
    #[error("venue '{venue}': min_lot_size {lot} must be positive")]
    NonPositiveLotSize { venue: String, lot: Decimal },

    /// Config file could not be read or deserialized
    #[error(transparent)]
    Load(#[from] config::ConfigError),
}

/// One venue's trading parameters and book snapshot source.
#[derive(Debug, Deserialize, Clone)]
pub struct VenueSettings {
    /// Unique venue identifier
    pub id: String,
    /// Taker fee fraction (0.001 = 0.1%)
    pub taker_fee: Decimal,
    /// Smallest tradable quantity in base-currency units
    pub min_lot_size: Decimal,
    /// CSV depth snapshot to load at startup
    pub book_file: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub venues: Vec<VenueSettings>,
}

impl Settings {
    /// Load settings from a TOML file (extension optional).
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder().add_source(File::with_name(path)).build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Check venue parameters before any book is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.venues.is_empty() {
            return Err(ConfigError::EmptyVenues);
        }
        let mut seen = std::collections::HashSet::new();
        for venue in &self.venues {
            if venue.id.trim().is_empty() {
                return Err(ConfigError::EmptyVenueId);
            }
            if !seen.insert(venue.id.as_str()) {
                return Err(ConfigError::DuplicateVenueId(venue.id.clone()));
            }
            if venue.taker_fee < Decimal::ZERO || venue.taker_fee >= Decimal::ONE {
                return Err(ConfigError::FeeOutOfRange {
                    venue: venue.id.clone(),
                    fee: venue.taker_fee,
                });
            }
            if venue.min_lot_size <= Decimal::ZERO {
                return Err(ConfigError::NonPositiveLotSize {
                    venue: venue.id.clone(),
                    lot: venue.min_lot_size,
                });
            }
        }
        Ok(())
    }
}

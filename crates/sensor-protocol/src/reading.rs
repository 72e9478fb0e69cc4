//! Reading and Kind Definitions

use crate::keyword;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Measurement category; selects the storage table and query route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Temperature,
    Humidity,
}

impl Kind {
    /// All kinds, in table creation order
    pub const ALL: [Kind; 2] = [Kind::Temperature, Kind::Humidity];

    /// Map a data line keyword to its kind
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            keyword::TEMP => Some(Kind::Temperature),
            keyword::HUMID => Some(Kind::Humidity),
            _ => None,
        }
    }

    /// Map a query path to its kind
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/temperature" => Some(Kind::Temperature),
            "/humidity" => Some(Kind::Humidity),
            _ => None,
        }
    }

    /// Data line keyword for this kind
    pub fn keyword(&self) -> &'static str {
        match self {
            Kind::Temperature => keyword::TEMP,
            Kind::Humidity => keyword::HUMID,
        }
    }

    /// Table holding readings of this kind
    pub fn table(&self) -> &'static str {
        self.as_str()
    }

    /// Lowercase name, used for tables and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Temperature => "temperature",
            Kind::Humidity => "humidity",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single measurement reported by a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    /// Measurement category
    pub kind: Kind,
    /// Producer-assigned Unix timestamp (seconds)
    pub time: i64,
    /// Measured magnitude
    pub value: i64,
}

impl Reading {
    pub fn new(kind: Kind, time: i64, value: i64) -> Self {
        Self { kind, time, value }
    }
}

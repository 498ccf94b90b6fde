//! User-entered distance fields.
//!
//! Distances arrive as text in centimetres or millimetres and are stored in
//! millimetres. A field that fails validation keeps its last good value but
//! is flagged invalid, which makes its effective value unavailable.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Millimeters,
    #[default]
    Centimeters,
}

impl DistanceUnit {
    pub fn to_mm(self, value: f64) -> f64 {
        match self {
            DistanceUnit::Millimeters => value,
            DistanceUnit::Centimeters => value * 10.0,
        }
    }
}

/// Parse a distance field into millimetres.
///
/// Accepts any finite, strictly positive number; surrounding whitespace is
/// ignored.
pub fn parse_distance(field: &'static str, text: &str, unit: DistanceUnit) -> Result<f64> {
    let invalid = || Error::InvalidInput {
        field,
        value: text.to_string(),
    };

    let value: f64 = text.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid());
    }
    Ok(unit.to_mm(value))
}

/// A validated distance setting with an invalid flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceSetting {
    field: &'static str,
    stored_mm: f64,
    invalid: bool,
}

impl DistanceSetting {
    pub fn new(field: &'static str, initial_mm: f64) -> Self {
        Self {
            field,
            stored_mm: initial_mm,
            invalid: false,
        }
    }

    /// Apply a text edit. On failure the stored value is kept and the field
    /// is marked invalid until the next successful edit.
    pub fn set_from_text(&mut self, text: &str, unit: DistanceUnit) -> Result<f64> {
        match parse_distance(self.field, text, unit) {
            Ok(mm) => {
                self.stored_mm = mm;
                self.invalid = false;
                Ok(mm)
            }
            Err(e) => {
                self.invalid = true;
                Err(e)
            }
        }
    }

    pub fn set_mm(&mut self, mm: f64) -> Result<()> {
        if !mm.is_finite() || mm <= 0.0 {
            self.invalid = true;
            return Err(Error::InvalidInput {
                field: self.field,
                value: mm.to_string(),
            });
        }
        self.stored_mm = mm;
        self.invalid = false;
        Ok(())
    }

    /// The value downstream estimation may use, or `None` while invalid.
    pub fn effective_mm(&self) -> Option<f64> {
        (!self.invalid).then_some(self.stored_mm)
    }

    /// Last successfully parsed value, regardless of the invalid flag.
    pub fn stored_mm(&self) -> f64 {
        self.stored_mm
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn field(&self) -> &'static str {
        self.field
    }
}

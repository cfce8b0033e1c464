//! Regional grid geometry for forecast domains.
//!
//! Two generation methods are supported:
//! - `ESGgrid`: Extended Schmidt Gnomonic grid, described by a center point,
//!   a cell count and a cell size in meters.
//! - `GFDLgrid`: a refined subregion of tile 6 of a (possibly stretched)
//!   cubed-sphere grid.
//!
//! Both return a flat map of parameter name to numeric value, the form the
//! experiment configuration stores under its `grid_params` section.

mod esg;
mod gfdl;

pub use esg::{esg_grid_params, EsgInputs, ESG_STRETCH_FAC};
pub use gfdl::{gfdl_grid_params, GfdlInputs};

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A single derived grid parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Param {
    Int(i64),
    Float(f64),
}

impl Param {
    pub fn as_f64(&self) -> f64 {
        match self {
            Param::Int(i) => *i as f64,
            Param::Float(f) => *f,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Param::Int(i) => Some(*i),
            Param::Float(_) => None,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Int(i) => write!(f, "{}", i),
            Param::Float(x) => write!(f, "{}", x),
        }
    }
}

/// Derived grid parameters keyed by their configuration name (e.g. `NHW`).
pub type GridParams = BTreeMap<String, Param>;

/// Grid geometry errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GridError {
    #[error("invalid grid input {name} = {value}: {reason}")]
    InvalidInput {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("regional domain with halo does not fit on tile 6: {0}")]
    HaloOutOfBounds(String),
}

/// Round to a fixed number of decimal places.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123456789012345, 10), 0.123456789);
        assert_eq!(round_to(2.5, 0), 3.0);
    }

    #[test]
    fn test_param_serializes_untagged() {
        let json = serde_json::to_string(&Param::Int(4)).unwrap();
        assert_eq!(json, "4");
        let json = serde_json::to_string(&Param::Float(0.5)).unwrap();
        assert_eq!(json, "0.5");
    }
}

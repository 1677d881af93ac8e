//! Common test utilities for the regridder.
//!
//! This module provides NetCDF fixtures and comparison helpers.

#![allow(dead_code)]

pub mod assertions;
pub mod test_data;

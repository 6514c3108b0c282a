//! Utility functions and helpers

pub mod net;

//! Integration test suite for the Helios risk oracle.
//!
//! The tests in `tests/` drive the real aggregator, scoring engine,
//! publisher and pipeline against the call-counting collaborators in
//! [`helpers`], so every network interaction can be asserted on.

pub mod helpers;

//! # Covenant Testkit
//!
//! Fixtures and proptest generators shared by Covenant's test suites.

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    basket_request, certificate_request, protocol_request, spending_request, TestFixture,
    ADMIN_ORIGINATOR,
};

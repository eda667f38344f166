//! Use cases. Each mutating operation runs in one transaction and publishes
//! its events only after commit.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod reviews;

use crate::StorefrontError;

pub(crate) fn not_found(what: &str) -> StorefrontError { StorefrontError::NotFound(format!("{what} not found")) }

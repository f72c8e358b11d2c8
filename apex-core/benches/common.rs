use apex_core::prelude::*;
use std::sync::Arc;

/// A symbol constant shared across the bench fixtures so every order
/// lands in the same book.
pub fn symbol(name: &str) -> Symbol {
    Arc::from(name)
}

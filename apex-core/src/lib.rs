//! Single-venue, multi-symbol limit-order matching engine.
//!
//! The crate's job is narrow: accept, amend, cancel, and cross limit
//! orders under price-time priority, and emit the resulting trade stream
//! through a caller-supplied [`EventSink`](engine::sink::EventSink).
//! Everything else — persistence, transport, authentication, portfolio
//! accounting — lives outside this crate.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod engine;

pub mod prelude {
    pub use crate::engine::book::*;
    pub use crate::engine::dispatch::*;
    pub use crate::engine::error::*;
    pub use crate::engine::matching::*;
    pub use crate::engine::sink::*;
    pub use crate::engine::types::*;
}

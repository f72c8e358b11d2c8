use crate::engine::types::{OrderId, Symbol};
use thiserror::Error;

/// The engine's error taxonomy. Every variant is recoverable at the
/// caller unless noted otherwise: on any error other than
/// [`EngineError::SinkFailure`], the engine's state is unchanged from
/// before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// `place` whose id collides with any live order anywhere in the
    /// engine, not just the order's own book.
    #[error("order id {0} already exists")]
    DuplicateOrderId(OrderId),

    /// `amend`/`cancel` for an id not present in any book.
    #[error("order id {0} not found")]
    UnknownOrder(OrderId),

    /// A non-positive quantity was supplied to `place` or `amend`.
    #[error("invalid quantity: must be strictly positive")]
    InvalidQuantity,

    /// A non-positive price was supplied to `place` or `amend`.
    #[error("invalid price: must be strictly positive")]
    InvalidPrice,

    /// `snapshot` for a symbol with no book. The engine never implicitly
    /// creates a book on a read.
    #[error("no book exists for symbol {0:?}")]
    UnknownSymbol(Symbol),

    /// The event sink raised an error while delivering one or more
    /// events for an otherwise-successful call. The book mutation has
    /// already completed and the engine's invariants already hold by the
    /// time this is returned; treat it as "the operation succeeded, the
    /// observation pipeline may be lossy."
    #[error("event sink failed to deliver an event: {0}")]
    SinkFailure(String),
}

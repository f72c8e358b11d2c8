use crate::engine::error::EngineError;
use crate::engine::types::{Order, OrderId, Price, Quantity, Sequence, Symbol, Trade};
use std::fmt;

/// Carries a `place`'s rejected request back to the sink, since a
/// rejected order was never accepted and has no `Order` record of its
/// own.
#[derive(Clone, Debug)]
pub struct RejectedOrder {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub limit_price: Price,
    pub quantity: Quantity,
}

/// The payload half of an event envelope. One variant per sink
/// operation named in the command surface.
#[derive(Clone, Debug)]
pub enum EventKind {
    OrderAccepted(Order),
    OrderRejected(RejectedOrder, EngineError),
    OrderCancelled(Order),
    OrderAmended(Order),
    TradeExecuted(Trade),
}

/// `{sequence, kind, payload}` as specified: every event carries the
/// engine-global sequence at which the underlying state transition
/// happened, in addition to the payload itself.
#[derive(Clone, Debug)]
pub struct EngineEvent {
    pub sequence: Sequence,
    pub kind: EventKind,
}

/// An error the sink raised while delivering an event. Opaque to the
/// engine: it only needs a `Display` impl to fold into
/// [`EngineError::SinkFailure`].
#[derive(Debug)]
pub struct SinkError(pub String);

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SinkError {}

/// Abstract output for emitted trades and lifecycle events. Delivery is
/// synchronous and ordered: the sink observes events in the exact order
/// the engine's state transitioned, and a dispatch call does not return
/// to its caller until every resulting event has been offered to the
/// sink. The sink is responsible for its own thread-safety and
/// back-pressure; the engine assumes synchronous, non-blocking delivery
/// and performs no I/O of its own inside the matching loop.
pub trait EventSink: Send + Sync {
    fn order_accepted(&self, event: &EngineEvent, order: &Order) -> Result<(), SinkError>;
    fn order_rejected(
        &self,
        event: &EngineEvent,
        request: &RejectedOrder,
        reason: &EngineError,
    ) -> Result<(), SinkError>;
    fn order_cancelled(&self, event: &EngineEvent, order: &Order) -> Result<(), SinkError>;
    fn order_amended(&self, event: &EngineEvent, order: &Order) -> Result<(), SinkError>;
    fn trade_executed(&self, event: &EngineEvent, trade: &Trade) -> Result<(), SinkError>;
}

/// A no-op sink for embedding contexts and tests that don't need
/// observation.
#[derive(Default, Clone, Copy, Debug)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn order_accepted(&self, _event: &EngineEvent, _order: &Order) -> Result<(), SinkError> {
        Ok(())
    }

    fn order_rejected(
        &self,
        _event: &EngineEvent,
        _request: &RejectedOrder,
        _reason: &EngineError,
    ) -> Result<(), SinkError> {
        Ok(())
    }

    fn order_cancelled(&self, _event: &EngineEvent, _order: &Order) -> Result<(), SinkError> {
        Ok(())
    }

    fn order_amended(&self, _event: &EngineEvent, _order: &Order) -> Result<(), SinkError> {
        Ok(())
    }

    fn trade_executed(&self, _event: &EngineEvent, _trade: &Trade) -> Result<(), SinkError> {
        Ok(())
    }
}

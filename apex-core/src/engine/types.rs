use crypto_bigint::U256;
use std::sync::Arc;

/// OrderId is the type used for order IDs. Client-supplied and
/// engine-unique; collisions are rejected rather than reassigned.
pub type OrderId = u64;

/// Price is a 256-bit fixed-point integer. The venue's tick policy fixes
/// the scale; the engine treats it as an opaque, totally-ordered value.
pub type Price = U256;

/// Quantity is the type used for order and trade quantities. Unlike
/// `Price`, quantities in this engine are plain integers, not
/// arbitrary-precision values.
pub type Quantity = u64;

/// Sequence is the engine-assigned, strictly monotonic arrival order.
/// This is the canonical time-priority key — never wall-clock time.
pub type Sequence = u64;

/// TradeId is the engine-unique identifier minted for each trade.
pub type TradeId = u64;

/// Symbol identifies a book. Cheap to clone since it is copied into every
/// order, trade, and event that references it.
pub type Symbol = Arc<str>;

/// Side indicates the direction of an order.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
pub enum Side {
    /// Buy means the order wants to acquire the asset, matching against
    /// the ask book.
    Buy,
    /// Sell means the order wants to dispose of the asset, matching
    /// against the bid book.
    Sell,
}

impl Side {
    /// The side of the book an aggressor of this side crosses.
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// A limit order. Every field but `remaining_quantity` and
/// `arrival_sequence` is fixed at acceptance time; those two are the only
/// ones the matching loop and amend are specified to mutate.
#[derive(Clone, Debug)]
pub struct Order {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub limit_price: Price,
    pub remaining_quantity: Quantity,
    /// Never re-assigned except by an amend, which is specified as
    /// cancel-plus-new and therefore mints a fresh one.
    pub arrival_sequence: Sequence,
}

impl Order {
    pub fn new(
        order_id: OrderId,
        symbol: Symbol,
        side: Side,
        limit_price: Price,
        quantity: Quantity,
        arrival_sequence: Sequence,
    ) -> Self {
        Self {
            order_id,
            symbol,
            side,
            limit_price,
            remaining_quantity: quantity,
            arrival_sequence,
        }
    }

    /// Whether a resting order at `resting_price` is compatible with
    /// `self` acting as the aggressor: `resting <= self` when buying,
    /// `resting >= self` when selling.
    #[inline]
    pub fn compatible_with(&self, resting_price: Price) -> bool {
        match self.side {
            Side::Buy => resting_price <= self.limit_price,
            Side::Sell => resting_price >= self.limit_price,
        }
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining_quantity == 0
    }
}

/// A match record. Append-only, immutable once emitted.
#[derive(Clone, Debug)]
pub struct Trade {
    pub trade_id: TradeId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub symbol: Symbol,
    /// The resting order's limit price at the instant of the match — the
    /// maker sets the print, never the aggressor's price or a mean.
    pub price: Price,
    pub quantity: Quantity,
    pub sequence: Sequence,
}

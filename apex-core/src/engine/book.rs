use crate::engine::error::EngineError;
use crate::engine::matching::{SequenceCounters, run_crossing_loop};
use crate::engine::types::{Order, OrderId, Price, Quantity, Side, Trade};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Price-indexed FIFO queues for one side of one symbol's book. The bid
/// book's `best()` is the highest price; the ask book's is the lowest.
/// Within a level, orders are dequeued in insertion order, which by the
/// engine's acceptance discipline is arrival-sequence order. A level is
/// never retained once its queue is empty.
pub struct SideBook {
    side: Side,
    levels: BTreeMap<Price, VecDeque<Order>>,
}

impl SideBook {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    /// Place `order` at the tail of the queue for its limit price,
    /// creating the level if it doesn't exist yet.
    pub fn insert(&mut self, order: Order) {
        self.levels
            .entry(order.limit_price)
            .or_default()
            .push_back(order);
    }

    /// The best-priced price level, without removing anything.
    pub fn best_price(&self) -> Option<Price> {
        match self.side {
            Side::Buy => self.levels.keys().next_back().copied(),
            Side::Sell => self.levels.keys().next().copied(),
        }
    }

    /// The order at the head of the best-priced queue, without removing
    /// it.
    pub fn best(&self) -> Option<&Order> {
        let level = match self.side {
            Side::Buy => self.levels.values().next_back(),
            Side::Sell => self.levels.values().next(),
        };
        level.and_then(|level| level.front())
    }

    /// Remove and return the head of the best-priced queue. Deletes the
    /// level if the queue becomes empty.
    pub fn pop_best(&mut self) -> Option<Order> {
        let mut entry = match self.side {
            Side::Buy => self.levels.last_entry()?,
            Side::Sell => self.levels.first_entry()?,
        };
        let popped = entry.get_mut().pop_front();
        if entry.get().is_empty() {
            entry.remove();
        }
        popped
    }

    /// Subtract `qty` from the head order's remaining quantity. If that
    /// leaves zero, the head is removed and returned; otherwise `None`.
    /// Panics if `qty` exceeds the head's remaining quantity — callers
    /// are expected to clamp to `best().remaining_quantity` first, as
    /// the matching loop does.
    pub fn reduce_head(&mut self, qty: Quantity) -> Option<Order> {
        let mut entry = match self.side {
            Side::Buy => self.levels.last_entry()?,
            Side::Sell => self.levels.first_entry()?,
        };
        let head = entry.get_mut().front_mut()?;
        head.remaining_quantity = head
            .remaining_quantity
            .checked_sub(qty)
            .expect("reduce_head: qty exceeds head's remaining quantity");

        if head.remaining_quantity == 0 {
            let popped = entry.get_mut().pop_front();
            if entry.get().is_empty() {
                entry.remove();
            }
            popped
        } else {
            None
        }
    }

    /// Locate `order_id` at `price` and excise it from its queue. `price`
    /// is supplied by the caller's id index rather than discovered by
    /// scanning every level, so this is O(k) in the one level's depth,
    /// not O(n) in the whole side.
    pub fn remove(&mut self, price: Price, order_id: OrderId) -> Option<Order> {
        let level = self.levels.get_mut(&price)?;
        let position = level.iter().position(|order| order.order_id == order_id)?;
        let order = level.remove(position);
        if level.is_empty() {
            self.levels.remove(&price);
        }
        order
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Total number of resting orders on this side, across all levels.
    pub fn len(&self) -> usize {
        self.levels.values().map(VecDeque::len).sum()
    }

    /// A flat, best-to-worst snapshot of the resting orders, used for
    /// `Engine::snapshot` and `enumerate_all_orders`.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        let levels: Box<dyn Iterator<Item = &VecDeque<Order>>> = match self.side {
            Side::Buy => Box::new(self.levels.values().rev()),
            Side::Sell => Box::new(self.levels.values()),
        };
        levels.flat_map(|level| level.iter())
    }
}

/// Pairs a bid [`SideBook`] with an ask [`SideBook`] for one symbol and
/// owns the id index used for amend/cancel lookup. The index is a
/// back-reference only — it never owns an order, and the matching loop
/// (`engine::matching`) is responsible for keeping it consistent with
/// whichever `SideBook` actually holds the order.
pub struct OrderBook {
    pub bids: SideBook,
    pub asks: SideBook,
    index: HashMap<OrderId, (Side, Price)>,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: SideBook::new(Side::Buy),
            asks: SideBook::new(Side::Sell),
            index: HashMap::new(),
        }
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    fn side_book(&mut self, side: Side) -> &mut SideBook {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Records a resting order in the id index. Called once the matching
    /// loop has decided an order (or its residual) rests in the book.
    pub(crate) fn index_insert(&mut self, order_id: OrderId, side: Side, price: Price) {
        self.index.insert(order_id, (side, price));
    }

    /// Drops an order from the id index without touching either
    /// `SideBook` — used once the matching loop has already removed the
    /// order from its queue.
    pub(crate) fn index_remove(&mut self, order_id: OrderId) {
        self.index.remove(&order_id);
    }

    /// Remove a resting order by id: used by `cancel_order`. Returns the
    /// removed order, or `None` if the id isn't present in this book.
    pub fn remove_by_id(&mut self, order_id: OrderId) -> Option<Order> {
        let (side, price) = self.index.remove(&order_id)?;
        self.side_book(side).remove(price, order_id)
    }

    /// Snapshot of every order resting in this book, best-to-worst within
    /// each side. Order of enumeration across sides is unspecified.
    pub fn all_orders(&self) -> Vec<Order> {
        self.bids.iter().chain(self.asks.iter()).cloned().collect()
    }

    /// `true` once neither side is crossed: best bid strictly below best
    /// ask, or one side empty.
    pub fn is_crossed(&self) -> bool {
        match (self.bids.best_price(), self.asks.best_price()) {
            (Some(bid), Some(ask)) => bid >= ask,
            _ => false,
        }
    }

    /// Accepts `order` as the aggressor: crosses it against the opposing
    /// side per §4.2, then rests whatever quantity remains. Rejects a
    /// same-book id collision with [`EngineError::DuplicateOrderId`]
    /// rather than silently overwriting the resting order; a collision
    /// with an order in a *different* book is the caller's
    /// responsibility to catch, since this book has no visibility into
    /// the rest of the engine's directory.
    pub fn add_order(
        &mut self,
        mut order: Order,
        counters: &SequenceCounters<'_>,
    ) -> Result<MatchOutcome, EngineError> {
        if self.contains(order.order_id) {
            return Err(EngineError::DuplicateOrderId(order.order_id));
        }

        let opposing = self.side_book(order.side.opposite());
        let mut trades = Vec::new();
        let filled_resting_ids = run_crossing_loop(&mut order, opposing, counters, &mut trades);
        for filled_id in &filled_resting_ids {
            self.index_remove(*filled_id);
        }

        let resting = if order.is_exhausted() {
            None
        } else {
            let (side, price, order_id) = (order.side, order.limit_price, order.order_id);
            self.index_insert(order_id, side, price);
            self.side_book(side).insert(order.clone());
            Some(order)
        };

        Ok(MatchOutcome {
            trades,
            filled_resting_ids,
            resting,
        })
    }

    /// Removes a resting order unconditionally. Returns
    /// [`EngineError::UnknownOrder`] if the id isn't present; never emits
    /// trades.
    pub fn cancel_order(&mut self, order_id: OrderId) -> Result<Order, EngineError> {
        self.remove_by_id(order_id)
            .ok_or(EngineError::UnknownOrder(order_id))
    }

    /// Unconditional cancel-plus-new: removes the resting order (if any),
    /// re-inserts it at `new_price`/`new_quantity` under a fresh
    /// arrival sequence supplied by the caller, and runs it back through
    /// the crossing loop as a brand-new aggressor. This is the design
    /// choice §4.2/§9 specify: any amend forfeits queue position, since a
    /// price- or quantity-improving amend that kept its place would let a
    /// trader skip ahead of orders resting earlier at the same price.
    pub fn amend_order(
        &mut self,
        order_id: OrderId,
        new_price: Price,
        new_quantity: Quantity,
        new_arrival_sequence: u64,
        counters: &SequenceCounters<'_>,
    ) -> Result<(Order, MatchOutcome), EngineError> {
        let existing = self
            .remove_by_id(order_id)
            .ok_or(EngineError::UnknownOrder(order_id))?;

        let amended = Order::new(
            existing.order_id,
            existing.symbol,
            existing.side,
            new_price,
            new_quantity,
            new_arrival_sequence,
        );

        let outcome = self.add_order(amended.clone(), counters)?;
        Ok((amended, outcome))
    }
}

/// Result of running an order (new or amended) through the crossing loop:
/// the trades it generated, the resting orders it fully consumed (for the
/// caller's reverse index), and the order itself if any quantity remains
/// resting in the book.
#[derive(Debug)]
pub struct MatchOutcome {
    pub trades: Vec<Trade>,
    pub filled_resting_ids: Vec<OrderId>,
    pub resting: Option<Order>,
}

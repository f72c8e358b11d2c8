use crate::engine::book::OrderBook;
use crate::engine::error::EngineError;
use crate::engine::matching::SequenceCounters;
use crate::engine::sink::{EngineEvent, EventKind, EventSink, NoopEventSink, RejectedOrder};
use crate::engine::types::{Order, OrderId, Price, Quantity, Side, Symbol, Trade};
use flurry::{Guard, HashMap as ConcurrentMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, debug_span, trace, warn};

/// A read-only view of one symbol's two sides, for rendering or export.
/// Best-to-worst within each side; unlike `OrderBook::all_orders`, the
/// ordering here is meaningful.
#[derive(Clone, Debug)]
pub struct BookSnapshot {
    pub symbol: Symbol,
    pub bids: Vec<Order>,
    pub asks: Vec<Order>,
}

/// Directory of `Symbol -> OrderBook`, routing requests to the correct
/// book and minting the ids that must stay unique across the whole
/// engine. Per §5, the directory itself is a concurrent map (sharding by
/// symbol, as the spec recommends) while each book's mutations are
/// serialized behind its own mutex — two different symbols never
/// contend, and a symbol's full match cascade runs to completion before
/// any other call can observe that book's intermediate state.
pub struct Engine {
    books: ConcurrentMap<Symbol, Mutex<OrderBook>>,
    /// Reverse index recommended by the design notes: drops cross-symbol
    /// `amend`/`cancel` lookup from O(N_symbols) to O(1) instead of
    /// scanning every book.
    order_locations: ConcurrentMap<OrderId, Symbol>,
    next_sequence: AtomicU64,
    next_trade_id: AtomicU64,
    sink: Arc<dyn EventSink>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Arc::new(NoopEventSink))
    }
}

impl Engine {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            books: ConcurrentMap::new(),
            order_locations: ConcurrentMap::new(),
            next_sequence: AtomicU64::new(0),
            next_trade_id: AtomicU64::new(0),
            sink,
        }
    }

    fn counters(&self) -> SequenceCounters<'_> {
        SequenceCounters::new(&self.next_sequence, &self.next_trade_id)
    }

    fn next_sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Delivers `events` to the sink in order, continuing past a failed
    /// delivery so the rest of the call's events still reach the sink
    /// (the mutation is already complete and correct — observation may
    /// be lossy, but it shouldn't be lossier than it has to be). Returns
    /// the first error encountered, if any, as the caller's
    /// `EngineError::SinkFailure`.
    fn deliver(&self, events: Vec<EngineEvent>) -> Result<(), EngineError> {
        let mut first_error = None;
        for event in events {
            let result = match &event.kind {
                EventKind::OrderAccepted(order) => self.sink.order_accepted(&event, order),
                EventKind::OrderRejected(request, reason) => {
                    self.sink.order_rejected(&event, request, reason)
                }
                EventKind::OrderCancelled(order) => self.sink.order_cancelled(&event, order),
                EventKind::OrderAmended(order) => self.sink.order_amended(&event, order),
                EventKind::TradeExecuted(trade) => self.sink.trade_executed(&event, trade),
            };
            if let Err(err) = result {
                warn!(sequence = event.sequence, %err, "event sink failed to deliver an event");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(EngineError::SinkFailure(err.0)),
            None => Ok(()),
        }
    }

    fn trade_events(&self, trades: &[Trade]) -> Vec<EngineEvent> {
        trades
            .iter()
            .map(|trade| EngineEvent {
                sequence: trade.sequence,
                kind: EventKind::TradeExecuted(trade.clone()),
            })
            .collect()
    }

    fn get_or_create_book<'g>(&'g self, symbol: &Symbol, guard: &'g Guard<'_>) -> &'g Mutex<OrderBook> {
        if let Some(book) = self.books.get(symbol, guard) {
            return book;
        }
        let _ = self
            .books
            .try_insert(symbol.clone(), Mutex::new(OrderBook::new()), guard);
        self.books
            .get(symbol, guard)
            .expect("just inserted or lost the race to another inserter")
    }

    fn get_book<'g>(&'g self, symbol: &Symbol, guard: &'g Guard<'_>) -> Option<&'g Mutex<OrderBook>> {
        self.books.get(symbol, guard)
    }

    /// Accepts a new order, assigns its arrival sequence, routes it to
    /// `symbol`'s book (created on first reference), and runs it through
    /// the matching loop. Returns the trades generated, in the order they
    /// were produced.
    pub fn place(
        &self,
        order_id: OrderId,
        symbol: Symbol,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Result<Vec<Trade>, EngineError> {
        let _span = debug_span!("place", order_id, symbol = %symbol, ?side).entered();

        if quantity == 0 {
            return self.reject(order_id, symbol, price, quantity, EngineError::InvalidQuantity);
        }
        if price == Price::ZERO {
            return self.reject(order_id, symbol, price, quantity, EngineError::InvalidPrice);
        }

        // Reserve the id engine-wide before touching the book: a bare
        // `contains_key` read here would let two `place` calls for the
        // same id on different symbols both pass, both acquire distinct
        // book locks, and both succeed independently. `try_insert` is the
        // atomic compare-and-swap that makes the reservation exclusive.
        if self
            .order_locations
            .pin()
            .try_insert(order_id, symbol.clone())
            .is_err()
        {
            return self.reject(
                order_id,
                symbol,
                price,
                quantity,
                EngineError::DuplicateOrderId(order_id),
            );
        }

        let arrival_sequence = self.next_sequence();
        let order = Order::new(order_id, symbol.clone(), side, price, quantity, arrival_sequence);

        let accepted_event = EngineEvent {
            sequence: arrival_sequence,
            kind: EventKind::OrderAccepted(order.clone()),
        };

        let books_guard = self.books.guard();
        let book_lock = self.get_or_create_book(&symbol, &books_guard);
        let outcome = {
            let mut book = book_lock.lock().expect("order book mutex poisoned");
            match book.add_order(order, &self.counters()) {
                Ok(outcome) => outcome,
                Err(err) => {
                    drop(book);
                    self.order_locations.pin().remove(&order_id);
                    return self.reject(order_id, symbol, price, quantity, err);
                }
            }
        };

        self.sync_directory(&symbol, order_id, &outcome.filled_resting_ids, outcome.resting.as_ref());

        for trade in &outcome.trades {
            trace!(
                trade_id = trade.trade_id,
                buy_order_id = trade.buy_order_id,
                sell_order_id = trade.sell_order_id,
                quantity = trade.quantity,
                "fill"
            );
        }

        let mut events = vec![accepted_event];
        events.extend(self.trade_events(&outcome.trades));
        debug!(trades = outcome.trades.len(), "order placed");
        self.deliver(events)?;
        Ok(outcome.trades)
    }

    fn reject(
        &self,
        order_id: OrderId,
        symbol: Symbol,
        price: Price,
        quantity: Quantity,
        reason: EngineError,
    ) -> Result<Vec<Trade>, EngineError> {
        warn!(order_id, symbol = %symbol, %reason, "order rejected");
        let sequence = self.next_sequence();
        let request = RejectedOrder {
            order_id,
            symbol,
            limit_price: price,
            quantity,
        };
        let event = EngineEvent {
            sequence,
            kind: EventKind::OrderRejected(request, reason.clone()),
        };
        self.deliver(vec![event])?;
        Err(reason)
    }

    /// Drops fully-consumed resting orders from the reverse index and
    /// records the new or still-resting order, if any. `own_id` is the
    /// id of the order that was just placed or amended: if it didn't
    /// come to rest, its directory entry (inserted as a reservation
    /// before matching ran, or left over from before the amend) must be
    /// dropped too, since `filled_resting_ids` only names *other*
    /// orders consumed by the crossing loop, never the aggressor itself.
    fn sync_directory(
        &self,
        symbol: &Symbol,
        own_id: OrderId,
        filled_resting_ids: &[OrderId],
        resting: Option<&Order>,
    ) {
        let locations = self.order_locations.pin();
        for id in filled_resting_ids {
            locations.remove(id);
        }
        match resting {
            Some(order) => {
                locations.insert(order.order_id, symbol.clone());
            }
            None => {
                locations.remove(&own_id);
            }
        }
    }

    /// Locates `order_id`'s book via the reverse index and amends it:
    /// unconditional cancel-plus-new with a fresh arrival sequence.
    pub fn amend(
        &self,
        order_id: OrderId,
        new_price: Price,
        new_quantity: Quantity,
    ) -> Result<Vec<Trade>, EngineError> {
        let _span = debug_span!("amend", order_id).entered();

        if new_quantity == 0 {
            warn!(order_id, "amend rejected: invalid quantity");
            return Err(EngineError::InvalidQuantity);
        }
        if new_price == Price::ZERO {
            warn!(order_id, "amend rejected: invalid price");
            return Err(EngineError::InvalidPrice);
        }

        let symbol = {
            let locations = self.order_locations.pin();
            locations.get(&order_id).cloned().ok_or_else(|| {
                warn!(order_id, "amend rejected: unknown order");
                EngineError::UnknownOrder(order_id)
            })?
        };

        let arrival_sequence = self.next_sequence();
        let books_guard = self.books.guard();
        let book_lock = self
            .get_book(&symbol, &books_guard)
            .expect("reverse index pointed at a symbol with no book");

        let (amended, outcome) = {
            let mut book = book_lock.lock().expect("order book mutex poisoned");
            book.amend_order(order_id, new_price, new_quantity, arrival_sequence, &self.counters())?
        };

        self.sync_directory(&symbol, order_id, &outcome.filled_resting_ids, outcome.resting.as_ref());

        for trade in &outcome.trades {
            trace!(
                trade_id = trade.trade_id,
                buy_order_id = trade.buy_order_id,
                sell_order_id = trade.sell_order_id,
                quantity = trade.quantity,
                "fill"
            );
        }

        let amended_event = EngineEvent {
            sequence: arrival_sequence,
            kind: EventKind::OrderAmended(amended),
        };
        let mut events = vec![amended_event];
        events.extend(self.trade_events(&outcome.trades));
        debug!(symbol = %symbol, trades = outcome.trades.len(), "order amended");
        self.deliver(events)?;
        Ok(outcome.trades)
    }

    /// Locates `order_id`'s book via the reverse index and cancels it.
    pub fn cancel(&self, order_id: OrderId) -> Result<bool, EngineError> {
        let _span = debug_span!("cancel", order_id).entered();

        let symbol = {
            let locations = self.order_locations.pin();
            match locations.get(&order_id).cloned() {
                Some(symbol) => symbol,
                None => {
                    debug!("cancel is a no-op: unknown order id");
                    return Ok(false);
                }
            }
        };

        let books_guard = self.books.guard();
        let book_lock = self
            .get_book(&symbol, &books_guard)
            .expect("reverse index pointed at a symbol with no book");

        let cancelled = {
            let mut book = book_lock.lock().expect("order book mutex poisoned");
            book.cancel_order(order_id).map_err(|err| {
                warn!(symbol = %symbol, %err, "cancel rejected");
                err
            })?
        };

        {
            let locations = self.order_locations.pin();
            locations.remove(&order_id);
        }

        let sequence = self.next_sequence();
        let event = EngineEvent {
            sequence,
            kind: EventKind::OrderCancelled(cancelled),
        };
        debug!(symbol = %symbol, "order cancelled");
        self.deliver(vec![event])?;
        Ok(true)
    }

    /// A stable view of one symbol's two sides. Returns `None` if no
    /// book has ever been created for `symbol` — `snapshot` never
    /// creates a book on a read.
    pub fn snapshot(&self, symbol: &Symbol) -> Option<BookSnapshot> {
        let pinned = self.books.pin();
        let book_lock = pinned.get(symbol)?;
        let book = book_lock.lock().expect("order book mutex poisoned");
        Some(BookSnapshot {
            symbol: symbol.clone(),
            bids: book.bids.iter().cloned().collect(),
            asks: book.asks.iter().cloned().collect(),
        })
    }

    /// Snapshot of every resting order across every symbol. Enumeration
    /// order is unspecified.
    pub fn enumerate_all_orders(&self) -> Vec<Order> {
        let pinned = self.books.pin();
        pinned
            .values()
            .flat_map(|book_lock| {
                let book = book_lock.lock().expect("order book mutex poisoned");
                book.all_orders()
            })
            .collect()
    }
}

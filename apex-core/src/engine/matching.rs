use crate::engine::book::SideBook;
use crate::engine::types::{Order, OrderId, Side, Trade};
use std::sync::atomic::{AtomicU64, Ordering};

/// The two engine-global monotonic counters the matching loop draws from
/// when it mints a trade: the shared arrival/event sequence and the
/// trade-id counter. Borrowed from [`crate::engine::dispatch::Engine`] as
/// atomics rather than `&mut u64` so that concurrent matching on
/// different symbols never contends on anything but these two counters.
pub struct SequenceCounters<'a> {
    pub(crate) sequence: &'a AtomicU64,
    pub(crate) trade_id: &'a AtomicU64,
}

impl<'a> SequenceCounters<'a> {
    pub fn new(sequence: &'a AtomicU64, trade_id: &'a AtomicU64) -> Self {
        Self { sequence, trade_id }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn next_trade_id(&self) -> u64 {
        self.trade_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Runs the crossing loop with `aggressor` against `opposing`, per §4.2:
/// while the aggressor has remaining quantity and the opposing book's
/// best order is price-compatible, trade at the resting order's price
/// (the maker sets the print) for `min(aggressor, resting)` quantity, and
/// repeat. Terminates when the aggressor is exhausted or no compatible
/// resting order remains.
///
/// Appends every trade to `trades` in the order they were generated and
/// returns the ids of any resting orders that were fully consumed, so the
/// caller (`OrderBook::add_order`) can drop them from its id index — this
/// function never touches that index directly, and performs no I/O: all
/// observation happens through the caller's event sink after it returns.
pub fn run_crossing_loop(
    aggressor: &mut Order,
    opposing: &mut SideBook,
    counters: &SequenceCounters<'_>,
    trades: &mut Vec<Trade>,
) -> Vec<OrderId> {
    let mut fully_filled = Vec::new();

    while aggressor.remaining_quantity > 0 {
        let Some(resting_price) = opposing.best_price() else {
            break;
        };
        if !aggressor.compatible_with(resting_price) {
            break;
        }
        let resting = opposing.best().expect("best_price implies a best order");
        let resting_id = resting.order_id;
        let qty = aggressor.remaining_quantity.min(resting.remaining_quantity);

        let (buy_order_id, sell_order_id) = match aggressor.side {
            Side::Buy => (aggressor.order_id, resting_id),
            Side::Sell => (resting_id, aggressor.order_id),
        };

        let sequence = counters.next_sequence();
        let trade_id = counters.next_trade_id();
        trades.push(Trade {
            trade_id,
            buy_order_id,
            sell_order_id,
            symbol: aggressor.symbol.clone(),
            price: resting_price,
            quantity: qty,
            sequence,
        });

        aggressor.remaining_quantity -= qty;
        if let Some(removed) = opposing.reduce_head(qty) {
            fully_filled.push(removed.order_id);
        }
    }

    fully_filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{Order, Side};
    use crypto_bigint::U256;
    use std::sync::Arc;

    fn order(id: OrderId, side: Side, price: u64, qty: u64) -> Order {
        Order::new(id, Arc::from("X"), side, U256::from(price), qty, id)
    }

    fn counters() -> (AtomicU64, AtomicU64) {
        (AtomicU64::new(0), AtomicU64::new(0))
    }

    #[test]
    fn maker_sets_the_trade_price() {
        let mut asks = SideBook::new(Side::Sell);
        asks.insert(order(1, Side::Sell, 95, 10));
        let mut buy = order(2, Side::Buy, 100, 10);

        let (seq, tid) = counters();
        let c = SequenceCounters::new(&seq, &tid);
        let mut trades = Vec::new();
        run_crossing_loop(&mut buy, &mut asks, &c, &mut trades);

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, U256::from(95u64));
        assert_eq!(trades[0].quantity, 10);
        assert!(buy.is_exhausted());
        assert!(asks.is_empty());
    }

    #[test]
    fn fifo_within_a_price_level() {
        let mut asks = SideBook::new(Side::Sell);
        asks.insert(order(1, Side::Sell, 100, 5));
        asks.insert(order(2, Side::Sell, 100, 5));
        let mut buy = order(3, Side::Buy, 100, 7);

        let (seq, tid) = counters();
        let c = SequenceCounters::new(&seq, &tid);
        let mut trades = Vec::new();
        let filled = run_crossing_loop(&mut buy, &mut asks, &c, &mut trades);

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].sell_order_id, 1);
        assert_eq!(trades[0].quantity, 5);
        assert_eq!(trades[1].sell_order_id, 2);
        assert_eq!(trades[1].quantity, 2);
        assert_eq!(filled, vec![1]);
        assert_eq!(asks.best().unwrap().order_id, 2);
        assert_eq!(asks.best().unwrap().remaining_quantity, 3);
    }

    #[test]
    fn no_compatible_price_no_trade() {
        let mut asks = SideBook::new(Side::Sell);
        asks.insert(order(1, Side::Sell, 105, 10));
        let mut buy = order(2, Side::Buy, 100, 10);

        let (seq, tid) = counters();
        let c = SequenceCounters::new(&seq, &tid);
        let mut trades = Vec::new();
        run_crossing_loop(&mut buy, &mut asks, &c, &mut trades);

        assert!(trades.is_empty());
        assert_eq!(buy.remaining_quantity, 10);
    }
}

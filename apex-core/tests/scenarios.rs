mod common;

use apex_core::prelude::*;
use std::sync::Arc;

fn sym() -> Symbol {
    Arc::from("X")
}

fn engine() -> Engine {
    common::init_tracing();
    Engine::new(Arc::new(NoopEventSink))
}

fn price(p: u64) -> Price {
    Price::from(p)
}

#[test]
fn s1_price_crossing_maker_sets_price() {
    let e = engine();
    let trades_a = e.place(1, sym(), Side::Buy, price(100), 10).unwrap();
    assert!(trades_a.is_empty());

    let trades_b = e.place(2, sym(), Side::Sell, price(95), 10).unwrap();
    assert_eq!(trades_b.len(), 1);
    assert_eq!(trades_b[0].price, price(100));
    assert_eq!(trades_b[0].quantity, 10);
    assert_eq!(trades_b[0].buy_order_id, 1);
    assert_eq!(trades_b[0].sell_order_id, 2);

    let snapshot = e.snapshot(&sym()).unwrap();
    assert!(snapshot.bids.is_empty());
    assert!(snapshot.asks.is_empty());
}

#[test]
fn s2_price_time_priority() {
    let e = engine();
    e.place(1, sym(), Side::Sell, price(100), 5).unwrap();
    e.place(2, sym(), Side::Sell, price(100), 5).unwrap();
    let trades = e.place(3, sym(), Side::Buy, price(100), 7).unwrap();

    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].sell_order_id, 1);
    assert_eq!(trades[0].quantity, 5);
    assert_eq!(trades[1].sell_order_id, 2);
    assert_eq!(trades[1].quantity, 2);

    let snapshot = e.snapshot(&sym()).unwrap();
    assert_eq!(snapshot.asks.len(), 1);
    assert_eq!(snapshot.asks[0].order_id, 2);
    assert_eq!(snapshot.asks[0].remaining_quantity, 3);
    assert!(snapshot.bids.is_empty());
}

#[test]
fn s3_partial_then_rest() {
    let e = engine();
    let trades_a = e.place(1, sym(), Side::Buy, price(50), 100).unwrap();
    assert!(trades_a.is_empty());

    let trades_b = e.place(2, sym(), Side::Sell, price(60), 40).unwrap();
    assert!(trades_b.is_empty(), "60 does not cross a 50 bid");

    let trades_c = e.place(3, sym(), Side::Sell, price(50), 60).unwrap();
    assert_eq!(trades_c.len(), 1);
    assert_eq!(trades_c[0].price, price(50));
    assert_eq!(trades_c[0].quantity, 60);

    let snapshot = e.snapshot(&sym()).unwrap();
    assert_eq!(snapshot.bids.len(), 1);
    assert_eq!(snapshot.bids[0].order_id, 1);
    assert_eq!(snapshot.bids[0].remaining_quantity, 40);
    assert_eq!(snapshot.asks.len(), 1);
    assert_eq!(snapshot.asks[0].order_id, 2);
    assert_eq!(snapshot.asks[0].remaining_quantity, 40);
}

#[test]
fn s4_amend_forfeits_priority() {
    let e = engine();
    e.place(1, sym(), Side::Buy, price(100), 10).unwrap();
    e.place(2, sym(), Side::Buy, price(100), 10).unwrap();
    e.amend(1, price(100), 10).unwrap();

    let trades = e.place(3, sym(), Side::Sell, price(100), 10).unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].buy_order_id, 2, "B kept priority, A forfeited it by amending");

    let snapshot = e.snapshot(&sym()).unwrap();
    assert_eq!(snapshot.bids.len(), 1);
    assert_eq!(snapshot.bids[0].order_id, 1);
}

#[test]
fn s5_cancel_removes_from_queue() {
    let e = engine();
    e.place(1, sym(), Side::Buy, price(100), 10).unwrap();
    assert!(e.cancel(1).unwrap());

    let trades = e.place(2, sym(), Side::Sell, price(100), 10).unwrap();
    assert!(trades.is_empty());

    let snapshot = e.snapshot(&sym()).unwrap();
    assert_eq!(snapshot.asks.len(), 1);
    assert_eq!(snapshot.asks[0].order_id, 2);
}

#[test]
fn s6_duplicate_id_rejected() {
    let e = engine();
    e.place(1, sym(), Side::Buy, price(100), 10).unwrap();

    let err = e
        .place(1, sym(), Side::Buy, price(101), 5)
        .unwrap_err();
    assert_eq!(err, EngineError::DuplicateOrderId(1));

    let snapshot = e.snapshot(&sym()).unwrap();
    assert_eq!(snapshot.bids.len(), 1);
    assert_eq!(snapshot.bids[0].limit_price, price(100));
    assert_eq!(snapshot.bids[0].remaining_quantity, 10);
}

#[test]
fn property_idempotent_cancel() {
    let e = engine();
    assert!(!e.cancel(999).unwrap(), "cancelling an unknown id is a no-op");

    e.place(1, sym(), Side::Buy, price(100), 10).unwrap();
    assert!(e.cancel(1).unwrap());
    assert!(!e.cancel(1).unwrap(), "cancelling twice returns false the second time");
}

#[test]
fn snapshot_of_unknown_symbol_is_none() {
    let e = engine();
    assert!(e.snapshot(&sym()).is_none());
}

#[test]
fn amend_of_unknown_order_is_an_error() {
    let e = engine();
    let err = e.amend(1, price(100), 10).unwrap_err();
    assert_eq!(err, EngineError::UnknownOrder(1));
}

#[test]
fn cross_symbol_duplicate_id_is_rejected() {
    let e = engine();
    e.place(1, Arc::from("A"), Side::Buy, price(100), 10).unwrap();
    let err = e
        .place(1, Arc::from("B"), Side::Sell, price(100), 5)
        .unwrap_err();
    assert_eq!(err, EngineError::DuplicateOrderId(1));
}

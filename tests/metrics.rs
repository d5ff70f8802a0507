use signal_decision_bot::decisions::DecisionSet;
use signal_decision_bot::metrics::engine::{MetricsEngine, QueryOutcome};
use signal_decision_bot::types::*;
use std::time::Duration;

#[test]
fn summarises_queries_and_decisions_per_cycle() {
    let engine = MetricsEngine::new();

    // Daily: two clean answers, one failure. Weekly: one answer missing an oscillator.
    engine.observe_query(Timeframe::Day1, Duration::from_millis(40), QueryOutcome::Ok);
    engine.observe_query(Timeframe::Day1, Duration::from_millis(60), QueryOutcome::Ok);
    engine.observe_query(Timeframe::Day1, Duration::from_millis(900), QueryOutcome::Failed);
    engine.observe_query(
        Timeframe::Week1,
        Duration::from_millis(50),
        QueryOutcome::MissingOscillator,
    );

    let mut decisions = DecisionSet::new();
    decisions.insert(Instrument::new("BTCUSDT"), Decision::Buy);
    decisions.insert(
        Instrument::new("ETHUSDT"),
        Decision::SetStopLoss { stop_price: 3000.0 },
    );
    engine.observe_cycle(&decisions, 3, 1, Duration::from_millis(1_200));

    let daily = engine.timeframe(Timeframe::Day1);
    assert_eq!(daily.queries.succeeded, 2);
    assert_eq!(daily.queries.failed, 1);
    assert_eq!(daily.latency_ms.count(), 3);
    assert!((daily.queries.failure_rate() - 1.0 / 3.0).abs() < 1e-9);

    let weekly = engine.timeframe(Timeframe::Week1);
    assert_eq!(weekly.queries.succeeded, 1);
    assert_eq!(weekly.queries.missing_oscillator, 1);

    let totals = engine.decision_totals();
    assert_eq!(totals.buy, 1);
    assert_eq!(totals.set_stop_loss, 1);
    assert_eq!(totals.sell, 0);
    assert_eq!(totals.no_action, 1);
    assert_eq!(engine.cycles(), 1);

    let kv = engine.snapshot_kv();
    assert_eq!(kv.get("cycle|count").map(String::as_str), Some("1"));
    assert_eq!(kv.get("cycle|last_failed").map(String::as_str), Some("1"));
    assert_eq!(kv.get("cycle|last_decisions|BUY").map(String::as_str), Some("1"));
    assert_eq!(kv.get("cycle|last_decisions|SELL").map(String::as_str), Some("0"));
    assert_eq!(
        kv.get("provider|1d|failure_rate").map(String::as_str),
        Some("0.3333")
    );
    assert!(kv.keys().any(|k| k.starts_with("provider|1W|")));
}

#[test]
fn aborted_cycles_do_not_count_as_completed() {
    let engine = MetricsEngine::new();
    engine.observe_failed_cycle();
    engine.observe_failed_cycle();

    assert_eq!(engine.cycles(), 0);
    assert_eq!(
        engine.snapshot_kv().get("cycle|aborted").map(String::as_str),
        Some("2")
    );
}

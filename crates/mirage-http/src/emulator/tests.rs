//! Tests for the emulator orchestrator and preset loading.

use super::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn rule(request_type: &str, rules: &[&str], priority: i32, ttl: Lifetime, body: &str) -> ResponseRule {
    ResponseRule {
        predicate: PredicateDefinition {
            request_type: request_type.to_string(),
            rules: rules.iter().map(|r| r.to_string()).collect(),
        },
        priority,
        time_to_live: ttl,
        delay: None,
        response: ResponseDefinition {
            status_code: 200,
            body: body.to_string(),
            ..Default::default()
        },
    }
}

fn delayed(mut rule: ResponseRule, millis: u64) -> ResponseRule {
    rule.delay = Some(Delay {
        delay_time_in_millis: millis,
    });
    rule
}

// =============================================================================
// Serving
// =============================================================================

#[tokio::test]
async fn test_order_scenario() {
    let emulator = Emulator::default();
    emulator
        .register(rule("Order", &["url contains 'order'"], 1, Lifetime::Forever, "OK"))
        .unwrap();

    let snapshot = RequestSnapshot::new("GET", "/order/1");
    let response = emulator.serve(snapshot.clone()).await.unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "OK");

    assert_eq!(emulator.last_request("Order"), Some(snapshot));
    assert_eq!(emulator.last_request("Order"), None);
}

#[tokio::test]
async fn test_unmatched_request_is_not_recorded() {
    let emulator = Emulator::default();
    emulator
        .register(rule("Order", &["url contains 'order'"], 1, Lifetime::Forever, "OK"))
        .unwrap();

    let err = emulator
        .serve(RequestSnapshot::new("GET", "/user/1"))
        .await
        .unwrap_err();
    match err {
        EmulatorError::NoMatchingRule(snapshot) => assert_eq!(snapshot.url, "/user/1"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(emulator.last_request("Order"), None);
}

#[tokio::test]
async fn test_history_uses_matched_request_type() {
    let emulator = Emulator::default();
    emulator
        .register(rule("Order", &["url starts with '/order'"], 1, Lifetime::Forever, "order"))
        .unwrap();
    emulator
        .register(rule("Invoice", &["url starts with '/invoice'"], 1, Lifetime::Forever, "invoice"))
        .unwrap();

    emulator.serve(RequestSnapshot::new("GET", "/invoice/9")).await.unwrap();

    assert_eq!(emulator.last_request("Order"), None);
    assert_eq!(emulator.last_request("Invoice").unwrap().url, "/invoice/9");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_serves_consume_single_use_once() {
    let emulator = Arc::new(Emulator::default());
    emulator
        .register(rule("Order", &["url contains 'order'"], 1, Lifetime::SingleUse, "once"))
        .unwrap();

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let emulator = Arc::clone(&emulator);
            tokio::spawn(async move { emulator.serve(RequestSnapshot::new("GET", "/order")).await })
        })
        .collect();

    let mut served = 0;
    let mut unmatched = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(response) => {
                assert_eq!(response.body, "once");
                served += 1;
            }
            Err(EmulatorError::NoMatchingRule(_)) => unmatched += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(served, 1);
    assert_eq!(unmatched, 31);
    assert_eq!(emulator.active_rules(), 0);
}

#[tokio::test]
async fn test_failed_registration_installs_nothing() {
    let emulator = Emulator::default();
    let err = emulator
        .register(rule(
            "Order",
            &["url contains 'order'", "url matches '('"],
            1,
            Lifetime::Forever,
            "OK",
        ))
        .unwrap_err();
    assert!(matches!(err, EmulatorError::InvalidRuleDefinition(_)));
    assert_eq!(emulator.active_rules(), 0);
    assert!(emulator.serve(RequestSnapshot::new("GET", "/order")).await.is_err());
}

// =============================================================================
// Delay
// =============================================================================

#[tokio::test]
async fn test_delay_is_applied() {
    let emulator = Emulator::default();
    emulator
        .register(delayed(
            rule("Order", &["url contains 'order'"], 1, Lifetime::Forever, "late"),
            100,
        ))
        .unwrap();

    let started = Instant::now();
    let response = emulator.serve(RequestSnapshot::new("GET", "/order")).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(response.body, "late");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_delay_does_not_block_other_requests() {
    let emulator = Arc::new(Emulator::default());
    emulator
        .register(delayed(
            rule("Slow", &["url is '/slow'"], 1, Lifetime::Forever, "slow"),
            1_000,
        ))
        .unwrap();
    emulator
        .register(rule("Fast", &["url is '/fast'"], 1, Lifetime::Forever, "fast"))
        .unwrap();

    let slow = {
        let emulator = Arc::clone(&emulator);
        tokio::spawn(async move { emulator.serve(RequestSnapshot::new("GET", "/slow")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    let fast = emulator.serve(RequestSnapshot::new("GET", "/fast")).await.unwrap();
    assert_eq!(fast.body, "fast");
    assert!(started.elapsed() < Duration::from_millis(500));
    assert!(!slow.is_finished());

    assert_eq!(slow.await.unwrap().unwrap().body, "slow");
}

#[tokio::test]
async fn test_shutdown_interrupts_delay() {
    let emulator = Arc::new(Emulator::default());
    emulator
        .register(delayed(
            rule("Order", &["url contains 'order'"], 1, Lifetime::Forever, "late"),
            10_000,
        ))
        .unwrap();

    let pending = {
        let emulator = Arc::clone(&emulator);
        tokio::spawn(async move { emulator.serve(RequestSnapshot::new("GET", "/order")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    emulator.shutdown();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, EmulatorError::DelayInterrupted(10_000)));
    // The request was matched before the delay started.
    assert!(emulator.last_request("Order").is_some());
}

#[tokio::test]
async fn test_delay_after_shutdown_fails_immediately() {
    let emulator = Emulator::default();
    emulator
        .register(delayed(
            rule("Order", &["url contains 'order'"], 1, Lifetime::Forever, "late"),
            10_000,
        ))
        .unwrap();
    emulator.shutdown();

    let started = Instant::now();
    let err = emulator
        .serve(RequestSnapshot::new("GET", "/order"))
        .await
        .unwrap_err();
    assert!(matches!(err, EmulatorError::DelayInterrupted(_)));
    assert!(started.elapsed() < Duration::from_secs(1));
}

// =============================================================================
// Reset
// =============================================================================

#[tokio::test]
async fn test_reset_clears_history_and_transient_rules() {
    let emulator = Emulator::default();
    emulator
        .register(rule("Order", &["url contains 'order'"], 1, Lifetime::Forever, "default"))
        .unwrap();
    emulator
        .register(rule("Order", &["url contains 'order'"], 5, Lifetime::UntilReset, "override"))
        .unwrap();

    let request = RequestSnapshot::new("GET", "/order");
    assert_eq!(emulator.serve(request.clone()).await.unwrap().body, "override");
    assert_eq!(emulator.serve(request.clone()).await.unwrap().body, "override");

    emulator.reset();
    assert_eq!(emulator.last_request("Order"), None);
    assert_eq!(emulator.active_rules(), 1);
    assert_eq!(emulator.serve(request).await.unwrap().body, "default");
}

// =============================================================================
// Presets
// =============================================================================

const ORDER_PRESET: &str = r#"{
    "predicate": {"requestType": "Order", "rules": ["url contains 'order'"]},
    "priority": 1,
    "response": {"statusCode": 200, "body": "order"}
}"#;

const PAYMENT_PRESET: &str = r#"{
    "predicate": {"requestType": "Payment", "rules": ["httpMethod is 'POST'", "url is '/pay'"]},
    "timeToLive": "UNTIL_RESET",
    "response": {"statusCode": "202", "body": "paid"}
}"#;

#[tokio::test]
async fn test_load_presets_registers_json_files_recursively() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("order.json"), ORDER_PRESET).unwrap();
    std::fs::create_dir(dir.path().join("payments")).unwrap();
    std::fs::write(dir.path().join("payments").join("pay.json"), PAYMENT_PRESET).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a rule").unwrap();

    let emulator = Emulator::default();
    assert_eq!(emulator.load_presets(dir.path()).unwrap(), 2);
    assert_eq!(emulator.active_rules(), 2);

    let paid = emulator
        .serve(RequestSnapshot::new("POST", "/pay"))
        .await
        .unwrap();
    assert_eq!(paid.status_code, 202);
    assert_eq!(paid.body, "paid");
}

#[test]
fn test_load_presets_fails_on_invalid_document() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.json"), ORDER_PRESET).unwrap();
    std::fs::write(dir.path().join("b.json"), "{ not json").unwrap();

    let emulator = Emulator::default();
    let err = emulator.load_presets(dir.path()).unwrap_err();
    match err {
        EmulatorError::Preset { path, .. } => assert!(path.ends_with("b.json")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_load_presets_fails_on_invalid_rule() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("bad.json"),
        r#"{"predicate": {"requestType": "Order", "rules": ["cookie is 'x'"]}}"#,
    )
    .unwrap();

    let emulator = Emulator::default();
    let err = emulator.load_presets(dir.path()).unwrap_err();
    assert!(err.to_string().contains("bad.json"));
    assert_eq!(emulator.active_rules(), 0);
}

#[test]
fn test_load_presets_missing_directory() {
    let emulator = Emulator::default();
    let err = emulator
        .load_presets("/definitely/not/a/preset/dir")
        .unwrap_err();
    assert!(matches!(err, EmulatorError::Preset { .. }));
}

#[cfg(unix)]
#[test]
fn test_load_presets_skips_symlinked_directories() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("order.json"), ORDER_PRESET).unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    std::os::unix::fs::symlink(dir.path(), dir.path().join("nested").join("loop")).unwrap();

    let emulator = Emulator::default();
    assert_eq!(emulator.load_presets(dir.path()).unwrap(), 1);
    assert_eq!(emulator.active_rules(), 1);
}

#[tokio::test]
async fn test_negative_delay_responds_immediately() {
    let emulator = Emulator::default();
    let rule: ResponseRule = serde_json::from_str(
        r#"{"predicate": {"requestType": "Order", "rules": ["url contains 'order'"]},
            "delay": {"delayTimeInMillis": -1000},
            "response": {"body": "now"}}"#,
    )
    .unwrap();
    emulator.register(rule).unwrap();
    emulator.shutdown();

    // A real delay would fail with DelayInterrupted after shutdown
    let served = emulator
        .serve(RequestSnapshot::new("GET", "/order/1"))
        .await
        .unwrap();
    assert_eq!(served.body, "now");
}

#[test]
fn test_load_presets_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let emulator = Emulator::default();
    assert_eq!(emulator.load_presets(dir.path()).unwrap(), 0);
}

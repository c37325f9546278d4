use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mirage_http::emulator::{
    CannedResponse, Lifetime, PredicateDefinition, RequestSnapshot, ResponseDefinition,
    ResponseRegistry, ResponseRule,
};
use mirage_http::predicate::{build_predicate, RuleTest};
use std::time::Duration;

fn create_test_rule(id: usize, rules: Vec<String>, priority: i32) -> ResponseRule {
    ResponseRule {
        predicate: PredicateDefinition {
            request_type: format!("Endpoint{id}"),
            rules,
        },
        priority,
        time_to_live: Lifetime::Forever,
        delay: None,
        response: ResponseDefinition {
            body: format!("endpoint {id}"),
            ..Default::default()
        },
    }
}

/// Registry whose highest-priority rule matches `/api/v1/endpoint0`.
fn populate(count: usize, regex: bool) -> ResponseRegistry {
    let registry = ResponseRegistry::new();
    for i in 0..count {
        let line = if regex {
            format!("url matches '/api/v[0-9]+/endpoint{i}'")
        } else {
            format!("url starts with '/api/v1/endpoint{i}'")
        };
        let rule = create_test_rule(
            i,
            vec!["httpMethod is 'GET'".to_string(), line],
            (count - i) as i32,
        );
        let predicate = build_predicate(&rule).unwrap();
        registry.register(
            predicate,
            CannedResponse {
                response: rule.response,
                delay: Duration::ZERO,
            },
        );
    }
    registry
}

fn bench_registry_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_matching");

    for rule_count in [10, 50, 100, 500, 1000].iter() {
        let registry = populate(*rule_count, false);
        group.throughput(Throughput::Elements(1));

        // Best case: highest-priority rule matches
        let first = RequestSnapshot::new("GET", "/api/v1/endpoint0/");
        group.bench_with_input(
            BenchmarkId::new("match_first", rule_count),
            rule_count,
            |b, _| b.iter(|| registry.resolve(black_box(&first))),
        );

        // Worst case: lowest-priority rule matches
        let last = RequestSnapshot::new("GET", format!("/api/v1/endpoint{}/", rule_count - 1));
        group.bench_with_input(
            BenchmarkId::new("match_last", rule_count),
            rule_count,
            |b, _| b.iter(|| registry.resolve(black_box(&last))),
        );

        // Scans every predicate
        let none = RequestSnapshot::new("GET", "/not/found");
        group.bench_with_input(
            BenchmarkId::new("match_none", rule_count),
            rule_count,
            |b, _| b.iter(|| registry.resolve(black_box(&none))),
        );
    }

    group.finish();
}

fn bench_regex_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("regex_matching");

    for rule_count in [10, 50, 100].iter() {
        let registry = populate(*rule_count, true);
        let snapshot = RequestSnapshot::new("GET", format!("/api/v2/endpoint{}", rule_count / 2));

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("regex_match", rule_count),
            rule_count,
            |b, _| b.iter(|| registry.resolve(black_box(&snapshot))),
        );
    }

    group.finish();
}

fn bench_rule_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_compilation");

    group.bench_function("parse_and_compile_header_rule", |b| {
        b.iter(|| {
            RuleTest::from_text(black_box(
                "headers contain entry 'X-Trace' whose value matches 'abc-[0-9]+'",
            ))
        })
    });

    let snapshot = RequestSnapshot::new("GET", "/").with_header("x-trace", "abc-123");
    let test =
        RuleTest::from_text("headers contain entry 'X-Trace' whose value matches 'abc-[0-9]+'")
            .unwrap();
    group.bench_function("evaluate_header_rule", |b| {
        b.iter(|| test.test(black_box(&snapshot)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registry_matching,
    bench_regex_matching,
    bench_rule_compilation
);
criterion_main!(benches);

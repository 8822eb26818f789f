use super::*;

fn create_test_registry() -> Registry {
    let registry = Registry::new_custom(Some(METRICS_PREFIX.to_string()), None).unwrap();
    register_custom_metrics(&registry);
    registry
}

#[test]
fn test_custom_registry() {
    let registry = create_test_registry();

    REQUESTS_TOTAL.with_label_values(&["list"]).inc();
    let metrics = &registry.gather();
    assert!(!metrics.is_empty());

    let metric_names: Vec<_> = metrics.iter().map(|m| m.get_name()).collect();
    assert!(
        metric_names.contains(&"nodelink_requests_total"),
        "Missing nodelink_requests_total"
    );
}

#[test]
fn test_counter_increment() {
    let before = REQUEST_ERRORS_TOTAL.with_label_values(&["metrics_test"]).get();

    REQUEST_ERRORS_TOTAL.with_label_values(&["metrics_test"]).inc();
    REQUEST_ERRORS_TOTAL.with_label_values(&["metrics_test"]).inc();

    let value = REQUEST_ERRORS_TOTAL.with_label_values(&["metrics_test"]).get();
    assert_eq!(value - before, 2, "Counter should increment correctly");
}

#[test]
fn test_encode_metrics_text_format() {
    let registry = create_test_registry();
    DROPPED_REQUESTS_TOTAL.inc();
    let body = encode_metrics(&registry);
    assert!(body.contains("nodelink_dropped_requests_total"));
}

#[test]
fn test_exporter_registry_serves_prefixed_names() {
    REQUESTS_TOTAL.with_label_values(&["subscribe"]).inc();
    SNAPSHOT_WRITES_TOTAL.with_label_values(&["ok"]).inc();

    let registry = default_registry();
    // registering twice must not panic
    let registry_again = default_registry();
    assert!(std::ptr::eq(registry, registry_again));

    let names: Vec<String> = registry.gather().iter().map(|m| m.get_name().to_string()).collect();
    assert!(names.contains(&"nodelink_requests_total".to_string()));
    assert!(names.contains(&"nodelink_snapshot_writes_total".to_string()));
    assert!(names.contains(&"nodelink_active_value_subscriptions".to_string()));
    assert!(names.iter().all(|name| name.starts_with("nodelink_")), "{names:?}");

    assert!(encode_metrics(registry).contains("nodelink_requests_total{method=\"subscribe\"}"));
}

//! Resolver behavior over the in-memory cloud.

use osc_dispatch::{Backend, DualKind, Error, Resolver, ResourceKind, Service};
use osc_test::{MemoryCloud, Op};
use serde_json::json;

// ============================================================================
// Test fixtures
// ============================================================================

const NETWORK_FIP: ResourceKind = ResourceKind::new(
    Service::Network,
    "v2.0/floatingips",
    "floatingip",
    "floatingips",
)
.nouns("floating IP", "floating IPs")
.lookup_by("floating_ip_address");

const COMPUTE_FIP: ResourceKind = ResourceKind::new(
    Service::Compute,
    "os-floating-ips",
    "floating_ip",
    "floating_ips",
)
.nouns("floating IP", "floating IPs")
.lookup_by("ip")
.client_filter();

const FLOATING_IP: DualKind = DualKind::new(NETWORK_FIP, COMPUTE_FIP);

const PROJECT: ResourceKind =
    ResourceKind::new(Service::Identity, "v3/projects", "project", "projects");

fn cloud() -> MemoryCloud {
    MemoryCloud::new()
        .with(&NETWORK_FIP, json!({"id": "fip-1", "floating_ip_address": "203.0.113.10"}))
        .with(&NETWORK_FIP, json!({"id": "fip-2", "floating_ip_address": "203.0.113.11"}))
        .with(&COMPUTE_FIP, json!({"id": 3, "ip": "198.51.100.7"}))
        .with(&PROJECT, json!({"id": "p-1", "name": "admin"}))
        .with(&PROJECT, json!({"id": "p-2", "name": "demo"}))
        .with(&PROJECT, json!({"id": "p-3", "name": "demo"}))
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_network_backend_matches_address() {
    let cloud = cloud();
    let resolver = Resolver::new(&cloud);
    let fip = resolver.resolve_dual(&FLOATING_IP, "203.0.113.11").unwrap();
    assert_eq!(fip.id(), "fip-2");

    let lists = cloud.calls_of(Op::List);
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].query.len(), 1);
    let (key, value) = &lists[0].query[0];
    assert_eq!(
        (key.as_str(), value.as_str()),
        ("floating_ip_address", "203.0.113.11")
    );
}

#[test]
fn test_compute_backend_filters_client_side() {
    let cloud = cloud();
    let resolver = Resolver::new(&cloud).backend(Backend::Compute);
    let fip = resolver.resolve_dual(&FLOATING_IP, "198.51.100.7").unwrap();
    assert_eq!(fip.id(), "3");
    assert!(cloud.calls_of(Op::List)[0].query.is_empty());
}

#[test]
fn test_compute_backend_does_not_see_network_resources() {
    let cloud = cloud();
    let resolver = Resolver::new(&cloud).backend(Backend::Compute);
    let err = resolver.resolve_dual(&FLOATING_IP, "fip-1").unwrap_err();
    assert_eq!(
        err.to_string(),
        "No floating IP with a name or ID of 'fip-1' exists."
    );
}

#[test]
fn test_duplicate_names_are_ambiguous() {
    let cloud = cloud();
    let err = Resolver::new(&cloud).resolve(&PROJECT, "demo").unwrap_err();
    assert!(matches!(err, Error::AmbiguousName { matches: 2, .. }));
}

#[test]
fn test_id_wins_over_name() {
    let cloud = cloud().with(&PROJECT, json!({"id": "demo", "name": "other"}));
    let project = Resolver::new(&cloud).resolve(&PROJECT, "demo").unwrap();
    assert_eq!(project.name(), Some("other"));
    assert!(cloud.calls_of(Op::List).is_empty());
}

#[test]
fn test_backend_error_propagates() {
    let cloud = cloud().fail(Op::Get, None, Error::http(503, "service unavailable"));
    let err = Resolver::new(&cloud)
        .resolve(&PROJECT, "admin")
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(!err.is_resolution());
}

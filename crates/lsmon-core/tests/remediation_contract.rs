//! Remediation workflow contract
//!
//! A blocked node is renewed and re-probed until a probe succeeds or the
//! renewal budget is spent. Notification and DNS reconciliation then run
//! independently of each other and of the loop's outcome.

mod common;

use common::*;
use lsmon_core::{CycleOutcome, NetworkFamily, RemediationState, StepOutcome};
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn blocked_node_recovers_after_one_renewal() {
    let cloud = Arc::new(FakeCloud::new(vec![ip("192.0.2.1"), ip("198.51.100.7")]));
    let dialer = Arc::new(ReachabilityDialer::new(&[ip("198.51.100.7")]));
    let ddns = Arc::new(FakeDdns::new(&[ip("192.0.2.1")]));
    let notifier = Arc::new(FakeNotifier::new());

    let mut node = build_node(NetworkFamily::V4, cloud.clone(), dialer.clone())
        .await
        .with_ddns_client(ddns.clone())
        .with_notifier(notifier.clone());

    let CycleOutcome::Remediated(report) = node.run_cycle().await else {
        panic!("blocked node must be remediated");
    };

    assert_eq!(report.state, RemediationState::Verified);
    assert_eq!(report.attempts, 1);
    assert_eq!(report.address, Some(ip("198.51.100.7")));
    assert_eq!(report.latency_ms, Some(20));
    assert_eq!(report.notification, StepOutcome::Completed);
    assert_eq!(report.dns, StepOutcome::Completed);

    assert_eq!(cloud.attach_calls(), 1);
    assert_eq!(cloud.detach_calls(), 1);
    // Three failed dials on the old address, one on the new
    assert_eq!(dialer.dial_count(), 4);
    assert_eq!(
        notifier.messages(),
        vec![(DOMAIN.to_string(), "IP changed: 198.51.100.7".to_string())]
    );
    assert_eq!(
        ddns.upserts(),
        vec![(NetworkFamily::V4, DOMAIN.to_string(), ip("198.51.100.7"))]
    );
    assert_eq!(node.state().address(), Some(ip("198.51.100.7")));
}

#[tokio::test(start_paused = true)]
async fn loop_stops_on_first_verified_renewal() {
    let cloud = Arc::new(FakeCloud::new(vec![
        ip("192.0.2.1"),
        ip("198.51.100.7"),
        ip("198.51.100.8"),
        ip("198.51.100.9"),
    ]));
    let dialer = Arc::new(ReachabilityDialer::new(&[ip("198.51.100.8")]));
    let notifier = Arc::new(FakeNotifier::new());

    let mut node = build_node(NetworkFamily::V4, cloud.clone(), dialer)
        .await
        .with_notifier(notifier.clone());

    let report = node.renew_ip().await;

    assert!(report.is_success());
    assert_eq!(report.attempts, 2);
    assert_eq!(cloud.attach_calls(), 2);
    assert_eq!(report.address, Some(ip("198.51.100.8")));
    assert_eq!(notifier.messages()[0].1, "IP changed: 198.51.100.8");
}

#[tokio::test(start_paused = true)]
async fn exhausted_budget_reports_failure_and_still_updates_dns() {
    let cloud = Arc::new(FakeCloud::new(vec![
        ip("192.0.2.1"),
        ip("198.51.100.7"),
        ip("198.51.100.8"),
        ip("198.51.100.9"),
    ]));
    let dialer = Arc::new(ReachabilityDialer::new(&[]));
    let ddns = Arc::new(FakeDdns::new(&[ip("192.0.2.1")]));
    let notifier = Arc::new(FakeNotifier::new());

    let mut node = build_node(NetworkFamily::V4, cloud.clone(), dialer)
        .await
        .with_ddns_client(ddns.clone())
        .with_notifier(notifier.clone());

    let report = node.renew_ip().await;

    assert_eq!(report.state, RemediationState::Exhausted);
    assert_eq!(report.attempts, 3);
    assert_eq!(report.latency_ms, None);
    assert_eq!(cloud.attach_calls(), 3);
    assert_eq!(
        notifier.messages(),
        vec![(
            DOMAIN.to_string(),
            "[node.example.com] Connection block after IP refresh 3 times".to_string()
        )]
    );
    assert_eq!(ddns.upsert_calls(), 1);
    assert_eq!(ddns.upserts()[0].2, ip("198.51.100.9"));
}

#[tokio::test(start_paused = true)]
async fn missing_notifier_is_skipped_and_dns_still_updates() {
    let cloud = Arc::new(FakeCloud::new(vec![ip("192.0.2.1"), ip("198.51.100.7")]));
    let dialer = Arc::new(ReachabilityDialer::new(&[ip("198.51.100.7")]));
    let ddns = Arc::new(FakeDdns::new(&[]));

    let mut node = build_node(NetworkFamily::V4, cloud, dialer)
        .await
        .with_ddns_client(ddns.clone());

    let report = node.renew_ip().await;

    assert_eq!(report.state, RemediationState::Verified);
    assert_eq!(
        report.notification,
        StepOutcome::Skipped("notifier is null".to_string())
    );
    assert_eq!(report.dns, StepOutcome::Completed);
    assert_eq!(ddns.upsert_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_notification_does_not_block_dns() {
    let cloud = Arc::new(FakeCloud::new(vec![ip("192.0.2.1"), ip("198.51.100.7")]));
    let dialer = Arc::new(ReachabilityDialer::new(&[ip("198.51.100.7")]));
    let ddns = Arc::new(FakeDdns::new(&[]));
    let notifier = Arc::new(FakeNotifier::failing());

    let mut node = build_node(NetworkFamily::V4, cloud, dialer)
        .await
        .with_ddns_client(ddns.clone())
        .with_notifier(notifier.clone());

    let report = node.renew_ip().await;

    assert!(matches!(report.notification, StepOutcome::Failed(_)));
    assert_eq!(notifier.messages().len(), 1);
    assert_eq!(report.dns, StepOutcome::Completed);
    assert_eq!(ddns.upsert_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_ddns_is_skipped_and_notification_still_sent() {
    let cloud = Arc::new(FakeCloud::new(vec![ip("192.0.2.1"), ip("198.51.100.7")]));
    let dialer = Arc::new(ReachabilityDialer::new(&[ip("198.51.100.7")]));
    let notifier = Arc::new(FakeNotifier::new());

    let mut node = build_node(NetworkFamily::V4, cloud, dialer)
        .await
        .with_notifier(notifier.clone());

    let report = node.renew_ip().await;

    assert_eq!(report.notification, StepOutcome::Completed);
    assert_eq!(
        report.dns,
        StepOutcome::Skipped("ddns client is null".to_string())
    );
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn provider_failures_do_not_abort_the_loop() {
    let cloud = Arc::new(FakeCloud::new(vec![ip("192.0.2.1")]).failing_toggles());
    let dialer = Arc::new(ReachabilityDialer::new(&[]));

    let mut node = build_node(NetworkFamily::V4, cloud.clone(), dialer.clone()).await;
    let report = node.renew_ip().await;

    assert_eq!(report.state, RemediationState::Exhausted);
    assert_eq!(report.attempts, 3);
    assert_eq!(cloud.attach_calls(), 3);
    assert_eq!(cloud.detach_calls(), 3);
    // Seed lookup plus one refresh per renewal
    assert_eq!(cloud.get_calls(), 4);
    assert_eq!(dialer.dial_count(), 9);
    assert_eq!(report.address, Some(ip("192.0.2.1")));
}

#[tokio::test(start_paused = true)]
async fn ipv6_nodes_toggle_dual_stack() {
    let cloud = Arc::new(FakeCloud::new(vec![ip("2001:db8::1"), ip("2001:db8::2")]));
    let dialer = Arc::new(ReachabilityDialer::new(&[ip("2001:db8::2")]));
    let ddns = Arc::new(FakeDdns::new(&[]));

    let mut node = build_node(NetworkFamily::V6, cloud.clone(), dialer)
        .await
        .with_ddns_client(ddns.clone());

    let report = node.renew_ip().await;

    assert!(report.is_success());
    assert_eq!(cloud.dual_stack_calls(), vec![false, true]);
    assert_eq!(cloud.attach_calls(), 0);
    assert_eq!(
        ddns.upserts(),
        vec![(NetworkFamily::V6, DOMAIN.to_string(), ip("2001:db8::2"))]
    );
}

#[tokio::test(start_paused = true)]
async fn healthy_cycle_only_fixes_stale_dns() {
    let cloud = Arc::new(FakeCloud::new(vec![ip("192.0.2.1")]));
    let dialer = Arc::new(ReachabilityDialer::new(&[ip("192.0.2.1")]));
    let ddns = Arc::new(FakeDdns::new(&[ip("203.0.113.50")]));

    let mut node = build_node(NetworkFamily::V4, cloud.clone(), dialer)
        .await
        .with_ddns_client(ddns.clone());

    assert_eq!(
        node.run_cycle().await,
        CycleOutcome::Healthy {
            latency_ms: Some(20),
            dns: StepOutcome::Completed,
        }
    );
    assert_eq!(ddns.upsert_calls(), 1);

    // Record is current now; nothing else to do
    node.run_cycle().await;
    assert_eq!(ddns.upsert_calls(), 1);
    assert_eq!(cloud.attach_calls(), 0);
}

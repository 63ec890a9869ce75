//! End-to-end governor tests: monitoring, enforcement, and recovery
//! running against scripted samplers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use loadguard::governor::{GovernorConfig, ResourceGovernor};
use loadguard::pressure::{ConcurrencyTable, PressureLevel, Resource, ResourceLimits, ResourceThresholds};
use loadguard::sampler::MockSampler;
use loadguard::scheduler::{TaskPriority, TaskSpec};

fn fast_config() -> GovernorConfig {
    GovernorConfig::default()
        .with_limits(ResourceLimits {
            cpu: ResourceThresholds::new(60.0, 80.0),
            memory: ResourceThresholds::new(70.0, 85.0),
            max_concurrent_by_level: ConcurrencyTable::default(),
        })
        .with_monitoring_interval(Duration::from_millis(20))
}

/// Polls until `check` passes or five seconds elapse.
async fn wait_until(check: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within 5s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn governor_detects_pressure_and_auto_enforces() {
    let governor = ResourceGovernor::with_sampler(
        fast_config(),
        Box::new(MockSampler::constant(95.0, 20.0)),
    );
    governor.start();

    wait_until(|| governor.get_status().level == PressureLevel::Critical).await;
    wait_until(|| !governor.enforcement_history().is_empty()).await;

    let record = &governor.enforcement_history()[0];
    assert_eq!(record.level, PressureLevel::Critical);
    assert!(!record.actions.is_empty());
    assert!(governor.scheduler().cap_override_active());

    governor.stop().await;
}

#[tokio::test]
async fn governor_recovers_and_restores_concurrency() {
    // High pressure for a few ticks, then persistently low
    let mut script = vec![(95.0, 20.0); 4];
    script.extend(vec![(10.0, 10.0); 200]);

    let governor =
        ResourceGovernor::with_sampler(fast_config(), Box::new(MockSampler::new(script)));
    governor.start();

    wait_until(|| governor.get_status().level == PressureLevel::Critical).await;
    wait_until(|| governor.scheduler().cap_override_active()).await;

    // The level steps down through Warning to Normal, after which the
    // next enforcement pass relaxes the cap
    wait_until(|| governor.get_status().level == PressureLevel::Normal).await;
    wait_until(|| !governor.scheduler().cap_override_active()).await;

    governor.stop().await;
}

#[tokio::test]
async fn on_limit_callbacks_fire_under_pressure() {
    let governor = ResourceGovernor::with_sampler(
        fast_config(),
        Box::new(MockSampler::constant(75.0, 20.0)),
    );

    let notified = Arc::new(AtomicUsize::new(0));
    {
        let notified = Arc::clone(&notified);
        governor.register_on_limit(move |status| {
            assert!(status.resource(Resource::Cpu).unwrap().under_pressure);
            notified.fetch_add(1, Ordering::SeqCst);
        });
    }

    governor.start();
    wait_until(|| notified.load(Ordering::SeqCst) >= 2).await;
    governor.stop().await;
}

#[tokio::test]
async fn manual_enforce_is_idempotent_under_stable_pressure() {
    let config = fast_config().with_auto_enforcement(false);
    let governor =
        ResourceGovernor::with_sampler(config, Box::new(MockSampler::constant(90.0, 20.0)));
    governor.start();

    wait_until(|| governor.get_status().level == PressureLevel::Critical).await;

    let first = governor.enforce(false);
    assert!(!first.is_empty());

    let second = governor.enforce(false);
    assert!(second.is_empty(), "expected empty, got {second:?}");

    governor.stop().await;
}

#[tokio::test]
async fn scheduled_work_flows_through_running_governor() {
    let governor = ResourceGovernor::with_sampler(
        fast_config(),
        Box::new(MockSampler::constant(10.0, 10.0)),
    );
    governor.start();

    let counter = Arc::new(AtomicUsize::new(0));
    for i in 0..5 {
        let counter = Arc::clone(&counter);
        governor.scheduler().schedule(
            TaskSpec::new(format!("unit-{i}")),
            TaskPriority::Normal,
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        );
    }

    wait_until(|| counter.load(Ordering::SeqCst) == 5).await;
    assert_eq!(governor.scheduler().stats().completed, 5);

    governor.stop().await;
}

#[tokio::test]
async fn prediction_becomes_available_with_history() {
    let governor = ResourceGovernor::with_sampler(
        fast_config(),
        Box::new(MockSampler::constant(42.0, 58.0)),
    );
    governor.start();

    // Below ten snapshots prediction reports insufficient data
    assert!(governor.predict(Resource::Cpu, 1.0).is_err());

    wait_until(|| governor.history_len() >= 10).await;

    let cpu = governor.predict(Resource::Cpu, 1.0).unwrap();
    let memory = governor.predict(Resource::Memory, 1.0).unwrap();
    assert!((cpu - 42.0).abs() < 2.0);
    assert!((memory - 58.0).abs() < 2.0);
    assert!((0.0..=100.0).contains(&cpu));

    governor.stop().await;
}

#[tokio::test]
async fn stale_sampler_degrades_gracefully() {
    // One good sample, then the script runs dry and the sampler re-issues
    // the last snapshot marked stale
    let governor = ResourceGovernor::with_sampler(
        fast_config(),
        Box::new(MockSampler::new([(30.0, 40.0)])),
    );
    governor.start();

    wait_until(|| governor.get_status().stale).await;

    let status = governor.get_status();
    assert_eq!(status.level, PressureLevel::Normal);
    assert!(status.recommendations.iter().any(|r| r.contains("stale")));

    governor.stop().await;
}

#[tokio::test]
async fn stop_halts_all_loops() {
    let governor = ResourceGovernor::with_sampler(
        fast_config(),
        Box::new(MockSampler::constant(10.0, 10.0)),
    );
    governor.start();
    wait_until(|| governor.history_len() >= 2).await;

    governor.stop().await;
    let settled = governor.history_len();
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(governor.history_len(), settled);
    assert!(!governor.is_running());
}

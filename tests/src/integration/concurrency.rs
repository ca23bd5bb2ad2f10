//! # Concurrent Access
//!
//! Many request tasks hit the same tracker at once. Per-key updates must
//! never lose a failure, a block must be issued exactly once per offense,
//! and the reaper must never drop a record that is still in use.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{fixture, Fixture};
    use abuse_guard::{AbuseGuardApi, ClientKey, GuardConfig, ReapReport, Reaper};
    use std::sync::Arc;
    use std::time::Duration;

    const MINUTE: Duration = Duration::from_secs(60);

    fn roomy() -> GuardConfig {
        GuardConfig {
            max_failed_attempts: 1_000,
            failure_window: 15 * MINUTE,
            initial_block_duration: 15 * MINUTE,
            max_block_duration: 24 * 60 * MINUTE,
            ..GuardConfig::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_parallel_failures_on_one_key_are_all_counted() {
        let Fixture { guard, .. } = fixture(roomy());
        let key = ClientKey::ip("198.51.100.4");

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let key = key.clone();
                tokio::spawn(async move {
                    for _ in 0..50 {
                        guard.record_failure(&key, "flood");
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let record = guard.record(&key).unwrap();
        assert_eq!(record.failure_count, 800);
        assert!(!guard.is_blocked(&key));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_threshold_crossed_once_under_contention() {
        let config = GuardConfig {
            max_failed_attempts: 100,
            ..roomy()
        };
        let Fixture { guard, audit, .. } = fixture(config);
        let key = ClientKey::ip("198.51.100.4");

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let key = key.clone();
                tokio::spawn(async move {
                    let mut transitions = 0;
                    for _ in 0..20 {
                        if let Some(eval) = guard.record_failure(&key, "flood") {
                            transitions += usize::from(eval.transition.is_some());
                        }
                    }
                    transitions
                })
            })
            .collect();

        let mut transitions = 0;
        for task in tasks {
            transitions += task.await.unwrap();
        }

        assert_eq!(transitions, 1);
        assert_eq!(audit.len(), 1);
        assert!(guard.is_blocked(&key));
        assert_eq!(guard.metrics_snapshot().blocks_issued, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_many_clients_tracked_independently() {
        let Fixture { guard, .. } = fixture(GuardConfig::for_testing());

        let tasks: Vec<_> = (0..64u8)
            .map(|i| {
                let guard = Arc::clone(&guard);
                tokio::spawn(async move {
                    let key = ClientKey::ip(format!("10.0.1.{i}"));
                    // Even clients cross the threshold, odd ones stay below
                    let failures = if i % 2 == 0 { 3 } else { 2 };
                    for _ in 0..failures {
                        guard.record_failure(&key, "bad password");
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let stats = guard.get_stats();
        assert_eq!(stats.total_tracked, 64);
        assert_eq!(stats.blocked_count, 32);
        for client in &stats.per_client {
            assert_eq!(client.blocked, client.failure_count == 3, "{client:?}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reaper_never_drops_refreshed_records() {
        let Fixture { guard, clock, .. } = fixture(roomy());
        let keys: Vec<ClientKey> = (0..200)
            .map(|i| ClientKey::ip(format!("10.0.{}.{}", i / 100, i % 100)))
            .collect();

        for key in &keys {
            guard.record_failure(key, "x");
        }
        // Everything is now stale
        clock.advance(31 * MINUTE);

        // Refresh the even keys while a sweep is running
        let writer = {
            let guard = Arc::clone(&guard);
            let keys = keys.clone();
            tokio::spawn(async move {
                for key in keys.iter().step_by(2) {
                    guard.record_failure(key, "x");
                    tokio::task::yield_now().await;
                }
            })
        };
        let reaper = Reaper::new(Arc::clone(&guard));
        let report = reaper.sweep().await;
        writer.await.unwrap();

        assert!(report.removed <= keys.len());
        for key in keys.iter().step_by(2) {
            let record = guard.record(key).expect("refreshed record survives");
            assert!(record.failure_count >= 1);
        }

        // Everything left over from the first generation goes on the next pass
        let report: ReapReport = reaper.run_once();
        assert_eq!(report.removed, 0);
        assert_eq!(guard.get_stats().total_tracked, 100);
    }
}

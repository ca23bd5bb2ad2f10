//! # Audit Fan-out
//!
//! Block transitions reach every configured sink: the log line through
//! `TracingAuditSink` and subscribers through `BroadcastAuditSink`.

#[cfg(test)]
mod tests {
    use abuse_guard::test_utils::ManualTimeSource;
    use abuse_guard::{
        AbuseGuardApi, AbuseGuardService, AuditEvent, AuditEventType, BroadcastAuditSink,
        ClientKey, GuardConfig, InMemoryTrackerStore, MultiAuditSink, TimeSource,
        TracingAuditSink,
    };
    use guard_telemetry::{init_logging, TelemetryConfig};
    use std::sync::Arc;
    use std::time::Duration;

    fn guard_with(audit: MultiAuditSink) -> (AbuseGuardService, Arc<ManualTimeSource>) {
        let clock = Arc::new(ManualTimeSource::at_secs(1_700_000_000));
        let guard = AbuseGuardService::with_ports(
            GuardConfig::for_testing(),
            Arc::new(InMemoryTrackerStore::new()),
            clock.clone(),
            Arc::new(audit),
        )
        .expect("valid config");
        (guard, clock)
    }

    #[tokio::test]
    async fn test_block_reaches_log_and_subscribers() {
        let _ = init_logging(&TelemetryConfig {
            log_level: "abuse_guard=debug".to_string(),
            ansi: false,
            ..TelemetryConfig::default()
        });

        let broadcast = Arc::new(BroadcastAuditSink::new());
        let mut first = broadcast.subscribe();
        let mut second = broadcast.subscribe();
        let sinks = MultiAuditSink::new()
            .with(Arc::new(TracingAuditSink))
            .with(broadcast.clone());
        assert_eq!(sinks.len(), 2);

        let (guard, clock) = guard_with(sinks);
        let key = ClientKey::ip("198.51.100.4");
        for _ in 0..3 {
            guard.record_failure(&key, "bad password");
        }

        let event: AuditEvent = first.recv().await.unwrap();
        assert_eq!(event, second.recv().await.unwrap());
        assert_eq!(event.event_type, AuditEventType::IpBlocked);
        assert_eq!(event.client_key, key);
        assert_eq!(event.failure_count, 3);
        assert_eq!(event.block_duration_ms, 60_000);
        assert_eq!(event.timestamp, clock.now());

        let line = serde_json::to_string(&event).unwrap();
        assert!(line.contains(r#""eventType":"IP_BLOCKED""#));
        assert!(line.contains(r#""clientKey":"198.51.100.4""#));
        assert_eq!(broadcast.events_published(), 1);
    }

    #[tokio::test]
    async fn test_only_transitions_are_audited() {
        let broadcast = Arc::new(BroadcastAuditSink::with_capacity(16));
        let mut events = broadcast.subscribe();
        let (guard, clock) = guard_with(MultiAuditSink::new().with(broadcast.clone()));
        let key = ClientKey::ip("198.51.100.4");

        // One block, then more failures while blocked
        for _ in 0..10 {
            guard.record_failure(&key, "bad password");
        }
        // A second offense after the block ends
        clock.advance(Duration::from_secs(61));
        for _ in 0..3 {
            guard.record_failure(&key, "bad password");
        }

        let first = events.recv().await.unwrap();
        let second = events.recv().await.unwrap();
        assert!(events.try_recv().is_err());
        assert_eq!(first.block_duration_ms, 60_000);
        assert_eq!(second.block_duration_ms, 120_000);
        assert_eq!(broadcast.events_published(), 2);
    }
}

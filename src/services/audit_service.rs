//! Best-effort audit trail of API traffic.
//!
//! Producers call [`AuditQueue::enqueue`] from the request path; a single
//! [`AuditWorker`] task owns the receiving end and writes rows one at a time.
//! A failed write is logged and the event dropped, so a struggling database
//! never sees a retry storm from this pipeline.

use crate::error::Result;
use crate::models::audit_log::AuditEvent;
use async_trait::async_trait;
use http::{Method, StatusCode};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const REDACTION_MARKER: &str = "[REDACTED]";
pub const TRUNCATION_MARKER: &str = "...";

/// Which exchanges get recorded and how much of them.
#[derive(Debug, Clone)]
pub struct AuditPolicy {
    pub version: u32,
    /// Substrings of `path?query` that are never recorded.
    pub skip_routes: Vec<String>,
    /// `None` records every method.
    pub methods: Option<Vec<Method>>,
    /// `None` records every status.
    pub status_range: Option<RangeInclusive<u16>>,
    pub redact_fields: Vec<String>,
    /// Characters of the response body kept before the truncation marker.
    pub response_body_limit: usize,
    /// Bodies larger than this pass through uncaptured.
    pub max_capture_bytes: usize,
    pub drain_delay: Duration,
    pub item_delay: Duration,
}

impl Default for AuditPolicy {
    fn default() -> Self {
        Self {
            version: 1,
            skip_routes: vec!["/api/health".to_string(), "/api/status".to_string()],
            methods: None,
            status_range: None,
            redact_fields: [
                "password",
                "token",
                "access_token",
                "refresh_token",
                "credit_card",
                "ssn",
                "cvv",
            ]
            .iter()
            .map(|f| f.to_string())
            .collect(),
            response_body_limit: 1000,
            max_capture_bytes: 1024 * 1024,
            drain_delay: Duration::from_millis(1000),
            item_delay: Duration::from_millis(100),
        }
    }
}

impl AuditPolicy {
    pub fn skips_route(&self, route: &str) -> bool {
        self.skip_routes.iter().any(|skip| route.contains(skip.as_str()))
    }

    pub fn records(&self, method: &Method, status: StatusCode) -> bool {
        let method_ok = self
            .methods
            .as_ref()
            .map_or(true, |allowed| allowed.contains(method));
        let status_ok = self
            .status_range
            .as_ref()
            .map_or(true, |range| range.contains(&status.as_u16()));
        method_ok && status_ok
    }

    pub fn is_sensitive(&self, key: &str) -> bool {
        self.redact_fields.iter().any(|f| f.eq_ignore_ascii_case(key))
    }

    /// Replaces sensitive values at any depth with [`REDACTION_MARKER`].
    pub fn redact(&self, value: &mut JsonValue) {
        match value {
            JsonValue::Object(map) => {
                for (key, field) in map.iter_mut() {
                    if self.is_sensitive(key) && !field.is_null() {
                        *field = JsonValue::String(REDACTION_MARKER.to_string());
                    } else {
                        self.redact(field);
                    }
                }
            }
            JsonValue::Array(items) => items.iter_mut().for_each(|item| self.redact(item)),
            _ => {}
        }
    }

    pub fn truncate_response(&self, body: &str) -> String {
        match body.char_indices().nth(self.response_body_limit) {
            Some((cut, _)) => format!("{}{}", &body[..cut], TRUNCATION_MARKER),
            None => body.to_string(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn persist(&self, event: &AuditEvent) -> Result<()>;
}

#[derive(Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn persist(&self, event: &AuditEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO form_submissions
                (user_id, route, method, status, request_body, request_query, response_body, user_agent, ip_address, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(event.user_id)
        .bind(&event.route)
        .bind(&event.method)
        .bind(i32::from(event.status_code))
        .bind(&event.request_body)
        .bind(&event.request_query)
        .bind(&event.response_body)
        .bind(&event.user_agent)
        .bind(&event.ip_address)
        .bind(&event.email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Producer handle. Cloning is cheap; every clone feeds the same worker.
#[derive(Clone, Debug)]
pub struct AuditQueue {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl AuditQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AuditEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, event: AuditEvent) {
        if let Err(mpsc::error::SendError(event)) = self.tx.send(event) {
            tracing::warn!(route = %event.route, "audit worker has stopped; dropping event");
        }
    }
}

pub struct AuditWorker {
    sink: Arc<dyn AuditSink>,
    rx: mpsc::UnboundedReceiver<AuditEvent>,
    drain_delay: Duration,
    item_delay: Duration,
}

impl AuditWorker {
    pub fn new(
        sink: Arc<dyn AuditSink>,
        rx: mpsc::UnboundedReceiver<AuditEvent>,
        policy: &AuditPolicy,
    ) -> Self {
        Self {
            sink,
            rx,
            drain_delay: policy.drain_delay,
            item_delay: policy.item_delay,
        }
    }

    /// Runs until every [`AuditQueue`] clone is dropped, then flushes what is left.
    pub async fn run(mut self) {
        while let Some(first) = self.rx.recv().await {
            // Let the rest of a burst land before touching the pool.
            tokio::time::sleep(self.drain_delay).await;

            let mut written = self.persist(first).await as usize;
            let mut drained = 1usize;
            while let Ok(event) = self.rx.try_recv() {
                written += self.persist(event).await as usize;
                drained += 1;
            }
            tracing::debug!(drained, written, "audit queue drained");
        }
        tracing::info!("audit worker shutting down");
    }

    async fn persist(&self, event: AuditEvent) -> bool {
        tokio::time::sleep(self.item_delay).await;
        match self.sink.persist(&event).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    route = %event.route,
                    method = %event.method,
                    "failed to write audit log"
                );
                false
            }
        }
    }
}

pub fn spawn_audit_worker(
    sink: Arc<dyn AuditSink>,
    policy: &AuditPolicy,
) -> (AuditQueue, JoinHandle<()>) {
    let (queue, rx) = AuditQueue::channel();
    let worker = AuditWorker::new(sink, rx, policy);
    let handle = tokio::spawn(worker.run());
    (queue, handle)
}

/// What the request interceptor carries: where to send events and what to keep.
#[derive(Clone, Debug)]
pub struct AuditRecorder {
    pub queue: AuditQueue,
    pub policy: Arc<AuditPolicy>,
}

impl AuditRecorder {
    pub fn new(queue: AuditQueue, policy: Arc<AuditPolicy>) -> Self {
        Self { queue, policy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use mockall::Sequence;
    use serde_json::json;
    use std::sync::Mutex;

    fn event(route: &str) -> AuditEvent {
        AuditEvent {
            user_id: None,
            route: route.to_string(),
            method: "POST".to_string(),
            status_code: 200,
            request_body: None,
            request_query: None,
            response_body: None,
            user_agent: None,
            ip_address: None,
            email: None,
        }
    }

    fn fast_policy() -> AuditPolicy {
        AuditPolicy {
            drain_delay: Duration::from_millis(5),
            item_delay: Duration::from_millis(1),
            ..AuditPolicy::default()
        }
    }

    struct RecordingSink {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AuditSink for RecordingSink {
        async fn persist(&self, event: &AuditEvent) -> Result<()> {
            self.seen.lock().unwrap().push(event.route.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_write_does_not_block_following_events() {
        let mut sink = MockAuditSink::new();
        let mut seq = Sequence::new();
        sink.expect_persist()
            .withf(|e| e.route == "/first")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(Error::Internal("connection refused".into())));
        sink.expect_persist()
            .withf(|e| e.route == "/second")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        sink.expect_persist()
            .withf(|e| e.route == "/third")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let (queue, handle) = spawn_audit_worker(Arc::new(sink), &fast_policy());
        queue.enqueue(event("/first"));
        queue.enqueue(event("/second"));
        queue.enqueue(event("/third"));
        drop(queue);

        handle.await.expect("worker should exit cleanly");
    }

    #[tokio::test]
    async fn events_are_written_in_enqueue_order_across_bursts() {
        let sink = Arc::new(RecordingSink {
            seen: Mutex::new(Vec::new()),
        });
        let (queue, handle) = spawn_audit_worker(sink.clone(), &fast_policy());

        for i in 0..5 {
            queue.enqueue(event(&format!("/burst-one/{}", i)));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        for i in 0..3 {
            queue.enqueue(event(&format!("/burst-two/{}", i)));
        }
        drop(queue);
        handle.await.unwrap();

        let seen = sink.seen.lock().unwrap().clone();
        let expected: Vec<String> = (0..5)
            .map(|i| format!("/burst-one/{}", i))
            .chain((0..3).map(|i| format!("/burst-two/{}", i)))
            .collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn enqueue_after_worker_stops_is_silently_dropped() {
        let (queue, rx) = AuditQueue::channel();
        drop(rx);
        queue.enqueue(event("/orphan"));
    }

    #[test]
    fn default_policy_skips_health_and_status() {
        let policy = AuditPolicy::default();
        assert!(policy.skips_route("/api/health"));
        assert!(policy.skips_route("/api/status?verbose=1"));
        assert!(!policy.skips_route("/api/auth/signup"));
    }

    #[test]
    fn method_and_status_filters_are_optional() {
        let mut policy = AuditPolicy::default();
        assert!(policy.records(&Method::GET, StatusCode::OK));

        policy.methods = Some(vec![Method::POST, Method::PUT]);
        policy.status_range = Some(200..=399);
        assert!(policy.records(&Method::POST, StatusCode::CREATED));
        assert!(!policy.records(&Method::GET, StatusCode::OK));
        assert!(!policy.records(&Method::PUT, StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn redaction_reaches_nested_objects_and_keeps_other_fields() {
        let policy = AuditPolicy::default();
        let mut body = json!({
            "email": "a@example.com",
            "password": "Abc!2345",
            "payment": { "credit_card": "4111", "cvv": "123", "amount": 10 },
            "tokens": [{ "refresh_token": "r" }],
            "token": null
        });
        policy.redact(&mut body);
        assert_eq!(body["email"], "a@example.com");
        assert_eq!(body["password"], REDACTION_MARKER);
        assert_eq!(body["payment"]["credit_card"], REDACTION_MARKER);
        assert_eq!(body["payment"]["cvv"], REDACTION_MARKER);
        assert_eq!(body["payment"]["amount"], 10);
        assert_eq!(body["tokens"][0]["refresh_token"], REDACTION_MARKER);
        assert!(body["token"].is_null());
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let policy = AuditPolicy {
            response_body_limit: 4,
            ..AuditPolicy::default()
        };
        assert_eq!(policy.truncate_response("abcd"), "abcd");
        assert_eq!(policy.truncate_response("abcdef"), "abcd...");
        assert_eq!(policy.truncate_response("ééééé"), "éééé...");
    }
}

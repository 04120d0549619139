//! Poll-check-notify loop
//!
//! One fetch and at most one message per tick, then a fixed sleep. Successful
//! status messages and error texts are de-duplicated against the last one sent.

use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{NotifierError, Result};
use crate::homework;
use crate::practicum::HomeworkApi;
use crate::telegram::Notifier;

/// Result of a single poll iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new status message was derived and handed to the notifier
    Sent(String),
    /// The derived message matches the last one sent
    Unchanged,
    /// The iteration failed; `notified` is false when the same error was already sent
    Failed { error: String, notified: bool },
}

pub struct StatusPoller<A, N> {
    api: A,
    notifier: N,
    interval: Duration,
    cursor: i64,
    last_status: Option<String>,
    last_error: Option<String>,
}

impl<A: HomeworkApi, N: Notifier> StatusPoller<A, N> {
    /// Create a poller whose cursor starts at the current time
    pub fn new(api: A, notifier: N, interval: Duration) -> Self {
        Self::with_cursor(api, notifier, interval, Utc::now().timestamp())
    }

    pub fn with_cursor(api: A, notifier: N, interval: Duration, cursor: i64) -> Self {
        Self {
            api,
            notifier,
            interval,
            cursor,
            last_status: None,
            last_error: None,
        }
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub fn last_status(&self) -> Option<&str> {
        self.last_status.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    async fn check(&mut self) -> Result<String> {
        let response = self.api.fetch_statuses(self.cursor).await?;
        if let Some(next) = homework::next_cursor(&response) {
            self.cursor = next;
        }
        homework::latest_message(&response)
    }

    /// Deliver a message; failures are logged and never propagate.
    async fn send(&self, text: &str) {
        match self.notifier.send_message(text).await {
            Ok(()) => info!("Message sent: {}", text),
            Err(e) => error!("Failed to send message: {}", e),
        }
    }

    /// Run one fetch-check-notify iteration
    pub async fn tick(&mut self) -> TickOutcome {
        match self.check().await {
            Ok(message) => {
                if self.last_status.as_deref() == Some(message.as_str()) {
                    info!("No status update");
                    return TickOutcome::Unchanged;
                }
                self.send(&message).await;
                self.last_status = Some(message.clone());
                TickOutcome::Sent(message)
            }
            Err(e) => self.handle_failure(e).await,
        }
    }

    async fn handle_failure(&mut self, e: NotifierError) -> TickOutcome {
        let error_text = e.to_string();
        let message = format!("Сбой в работе программы: {}", error_text);

        let notified = self.last_error.as_deref() != Some(error_text.as_str());
        if notified {
            self.last_error = Some(error_text.clone());
            self.send(&message).await;
        }
        error!("{}", message);

        TickOutcome::Failed {
            error: error_text,
            notified,
        }
    }

    /// Poll forever, sleeping the fixed interval after every tick
    pub async fn run(&mut self) {
        loop {
            self.tick().await;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Poll until `shutdown` resolves
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting homework poller (interval: {}s, from_date: {})",
            self.interval.as_secs(),
            self.cursor
        );

        tokio::select! {
            _ = self.run() => {}
            _ = shutdown => {
                warn!("Shutdown requested, stopping homework poller");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::practicum::MockHomeworkApi;
    use crate::telegram::MockNotifier;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Collects the messages of ERROR events emitted while installed.
    #[derive(Clone, Default)]
    struct ErrorLines(Arc<Mutex<Vec<String>>>);

    struct MessageVisitor(String);

    impl Visit for MessageVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{:?}", value);
            }
        }
    }

    impl<S: Subscriber> Layer<S> for ErrorLines {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::ERROR {
                let mut visitor = MessageVisitor(String::new());
                event.record(&mut visitor);
                self.0.lock().unwrap().push(visitor.0);
            }
        }
    }

    const T0: i64 = 1_700_000_000;
    const T1: i64 = 1_700_000_600;

    fn approved_response() -> serde_json::Value {
        json!({
            "homeworks": [{"homework_name": "hw1", "status": "approved"}],
            "current_date": T1
        })
    }

    fn poller(api: MockHomeworkApi, notifier: MockNotifier) -> StatusPoller<MockHomeworkApi, MockNotifier> {
        StatusPoller::with_cursor(api, notifier, Duration::from_secs(600), T0)
    }

    #[tokio::test]
    async fn test_status_change_is_sent_and_cursor_advances() {
        let mut api = MockHomeworkApi::new();
        api.expect_fetch_statuses()
            .withf(|from_date| *from_date == T0)
            .times(1)
            .returning(|_| Ok(approved_response()));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_send_message()
            .withf(|text: &str| {
                text == "Изменился статус проверки работы \"hw1\". Работа проверена: ревьюеру всё понравилось. Ура!"
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut poller = poller(api, notifier);
        let outcome = poller.tick().await;

        assert!(matches!(outcome, TickOutcome::Sent(_)));
        assert_eq!(poller.cursor(), T1);
    }

    #[tokio::test]
    async fn test_identical_status_is_sent_once() {
        let mut api = MockHomeworkApi::new();
        api.expect_fetch_statuses()
            .times(2)
            .returning(|_| Ok(approved_response()));

        let mut notifier = MockNotifier::new();
        notifier.expect_send_message().times(1).returning(|_| Ok(()));

        let mut poller = poller(api, notifier);
        assert!(matches!(poller.tick().await, TickOutcome::Sent(_)));
        assert_eq!(poller.tick().await, TickOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_identical_error_is_sent_once_but_reported_each_time() {
        let mut api = MockHomeworkApi::new();
        api.expect_fetch_statuses()
            .times(2)
            .returning(|_| Err(NotifierError::ApiResponse("код 503".to_string())));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_send_message()
            .withf(|text: &str| text.starts_with("Сбой в работе программы: ") && text.contains("503"))
            .times(1)
            .returning(|_| Ok(()));

        let mut poller = poller(api, notifier);
        let first = poller.tick().await;
        let second = poller.tick().await;

        assert!(matches!(first, TickOutcome::Failed { notified: true, .. }));
        assert!(matches!(second, TickOutcome::Failed { notified: false, .. }));
        assert_eq!(poller.cursor(), T0);
    }

    #[tokio::test]
    async fn test_repeated_error_is_logged_every_tick() {
        let lines = ErrorLines::default();
        let subscriber = tracing_subscriber::registry().with(lines.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut api = MockHomeworkApi::new();
        api.expect_fetch_statuses()
            .times(2)
            .returning(|_| Err(NotifierError::ApiResponse("код 503".to_string())));

        let mut notifier = MockNotifier::new();
        notifier.expect_send_message().times(1).returning(|_| Ok(()));

        let mut poller = poller(api, notifier);
        poller.tick().await;
        poller.tick().await;

        let expected = "Сбой в работе программы: Сбой при запросе к эндпоинту: код 503";
        let logged = lines.0.lock().unwrap().clone();
        assert_eq!(logged.iter().filter(|l| l.as_str() == expected).count(), 2);
    }

    #[tokio::test]
    async fn test_different_errors_are_each_sent() {
        let mut api = MockHomeworkApi::new();
        let mut seq = mockall::Sequence::new();
        api.expect_fetch_statuses()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json!({"homeworks": []})));
        api.expect_fetch_statuses()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json!({"homeworks": [{"homework_name": "hw1", "status": "lost"}]})));

        let mut notifier = MockNotifier::new();
        notifier.expect_send_message().times(2).returning(|_| Ok(()));

        let mut poller = poller(api, notifier);
        assert!(matches!(poller.tick().await, TickOutcome::Failed { notified: true, .. }));
        assert!(matches!(poller.tick().await, TickOutcome::Failed { notified: true, .. }));
    }

    #[tokio::test]
    async fn test_error_sent_before_recovery_is_not_repeated() {
        let mut api = MockHomeworkApi::new();
        let mut seq = mockall::Sequence::new();
        api.expect_fetch_statuses()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(NotifierError::ApiResponse("down".to_string())));
        api.expect_fetch_statuses()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(approved_response()));
        api.expect_fetch_statuses()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(NotifierError::ApiResponse("down".to_string())));

        // One failure message, one status message.
        let mut notifier = MockNotifier::new();
        notifier.expect_send_message().times(2).returning(|_| Ok(()));

        let mut poller = poller(api, notifier);
        assert!(matches!(poller.tick().await, TickOutcome::Failed { notified: true, .. }));
        assert!(matches!(poller.tick().await, TickOutcome::Sent(_)));
        assert_eq!(poller.last_error(), Some("Сбой при запросе к эндпоинту: down"));
        assert!(matches!(poller.tick().await, TickOutcome::Failed { notified: false, .. }));
    }

    #[tokio::test]
    async fn test_send_failure_does_not_interrupt_loop() {
        let mut api = MockHomeworkApi::new();
        api.expect_fetch_statuses()
            .times(2)
            .returning(|_| Ok(approved_response()));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_send_message()
            .times(1)
            .returning(|_| Err(NotifierError::Notification("chat not found".to_string())));

        let mut poller = poller(api, notifier);
        assert!(matches!(poller.tick().await, TickOutcome::Sent(_)));
        // The message is remembered even though delivery failed.
        assert_eq!(poller.tick().await, TickOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_cursor_kept_when_current_date_missing() {
        let mut api = MockHomeworkApi::new();
        api.expect_fetch_statuses()
            .times(1)
            .returning(|_| Ok(json!({"homeworks": [{"homework_name": "hw1", "status": "reviewing"}]})));

        let mut notifier = MockNotifier::new();
        notifier.expect_send_message().times(1).returning(|_| Ok(()));

        let mut poller = poller(api, notifier);
        poller.tick().await;
        assert_eq!(poller.cursor(), T0);
    }

    #[tokio::test]
    async fn test_cursor_advances_even_when_parsing_fails() {
        let mut api = MockHomeworkApi::new();
        api.expect_fetch_statuses()
            .times(1)
            .returning(|_| Ok(json!({"homeworks": [], "current_date": T1})));

        let mut notifier = MockNotifier::new();
        notifier.expect_send_message().times(1).returning(|_| Ok(()));

        let mut poller = poller(api, notifier);
        assert!(matches!(poller.tick().await, TickOutcome::Failed { .. }));
        assert_eq!(poller.cursor(), T1);
    }

    #[tokio::test]
    async fn test_run_until_stops_on_shutdown() {
        let mut api = MockHomeworkApi::new();
        api.expect_fetch_statuses()
            .returning(|_| Ok(approved_response()));

        let mut notifier = MockNotifier::new();
        notifier.expect_send_message().times(1).returning(|_| Ok(()));

        let mut poller =
            StatusPoller::with_cursor(api, notifier, Duration::from_millis(10), T0);
        poller
            .run_until(tokio::time::sleep(Duration::from_millis(50)))
            .await;

        assert!(poller.last_status().is_some());
    }
}

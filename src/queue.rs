use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::model::QueueMessage;
use crate::model::queue::MAX_BATCH_SEND;

/// Collaborator interface for the message broker driving queue mode
/// (§6.5). A production deployment swaps in a real broker behind this
/// trait; `MemoryQueue` is the in-process reference implementation used
/// to exercise the retry/backoff/DLQ contract end to end.
#[async_trait::async_trait]
pub trait Queue: Send + Sync {
    /// Sends at most `MAX_BATCH_SEND` messages. Implementations should
    /// reject or split larger batches rather than silently truncating.
    async fn send_batch(&self, messages: Vec<QueueMessage>);

    /// Receives up to `max_messages` currently visible messages, marking
    /// them invisible for `visibility_timeout`.
    async fn receive(&self, max_messages: usize, visibility_timeout: Duration) -> Vec<QueueMessage>;

    /// Permanently removes a message (successful handling).
    async fn ack(&self, message_id: uuid::Uuid);

    /// Re-delivers a message after `delay`, bumping its delivery attempt
    /// counter (§4.3 "Retries and DLQ").
    async fn retry_after(&self, message: QueueMessage, delay: Duration);

    /// Moves a message to the dead-letter queue and acks the original.
    async fn dead_letter(&self, message: QueueMessage);

    async fn dead_letters(&self) -> Vec<QueueMessage>;
}

struct Leased {
    message: QueueMessage,
    visible_at: Instant,
}

/// In-process, `parking_lot`-backed `Queue` with visibility-timeout style
/// redelivery: a received message becomes visible again if not acked
/// before its lease expires, the same semantics SQS-style brokers give a
/// production deployment (§E of SPEC_FULL.md).
#[derive(Default)]
pub struct MemoryQueue {
    inner: Mutex<VecDeque<Leased>>,
    dead_letters: Mutex<Vec<QueueMessage>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Queue for MemoryQueue {
    async fn send_batch(&self, messages: Vec<QueueMessage>) {
        debug_assert!(messages.len() <= MAX_BATCH_SEND, "queue batch exceeds the per-send cap");
        let now = Instant::now();
        let mut inner = self.inner.lock();
        for message in messages {
            inner.push_back(Leased { message, visible_at: now });
        }
    }

    async fn receive(&self, max_messages: usize, visibility_timeout: Duration) -> Vec<QueueMessage> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let mut received = Vec::new();
        for leased in inner.iter_mut() {
            if received.len() >= max_messages {
                break;
            }
            if leased.visible_at <= now {
                leased.visible_at = now + visibility_timeout;
                received.push(leased.message.clone());
            }
        }
        received
    }

    async fn ack(&self, message_id: uuid::Uuid) {
        self.inner.lock().retain(|leased| leased.message.id != message_id);
    }

    async fn retry_after(&self, mut message: QueueMessage, delay: Duration) {
        message.delivery_attempt += 1;
        let visible_at = Instant::now() + delay;
        self.inner.lock().push_back(Leased { message, visible_at });
    }

    async fn dead_letter(&self, message: QueueMessage) {
        self.inner.lock().retain(|leased| leased.message.id != message.id);
        self.dead_letters.lock().push(message);
    }

    async fn dead_letters(&self) -> Vec<QueueMessage> {
        self.dead_letters.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::model::chain::ChainId;
    use crate::model::queue::MessageBody;

    fn message() -> QueueMessage {
        QueueMessage::new(
            uuid::Uuid::new_v4(),
            ChainId::Konzum,
            MessageBody::Discover {
                business_date: NaiveDate::from_ymd_opt(2026, 1, 5),
                store_filter: None,
            },
        )
    }

    #[tokio::test]
    async fn a_received_message_is_invisible_until_its_lease_expires() {
        let queue = MemoryQueue::new();
        queue.send_batch(vec![message()]).await;

        let first = queue.receive(10, Duration::from_millis(50)).await;
        assert_eq!(first.len(), 1);

        let immediate = queue.receive(10, Duration::from_millis(50)).await;
        assert!(immediate.is_empty());

        tokio::time::sleep(Duration::from_millis(60)).await;
        let again = queue.receive(10, Duration::from_millis(50)).await;
        assert_eq!(again.len(), 1);
    }

    #[tokio::test]
    async fn acking_removes_a_message_permanently() {
        let queue = MemoryQueue::new();
        queue.send_batch(vec![message()]).await;
        let received = queue.receive(10, Duration::from_millis(50)).await;
        queue.ack(received[0].id).await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(queue.receive(10, Duration::from_millis(50)).await.is_empty());
    }

    #[tokio::test]
    async fn retry_after_bumps_the_delivery_attempt_counter() {
        let queue = MemoryQueue::new();
        let mut original = message();
        original.delivery_attempt = 1;
        queue.retry_after(original, Duration::from_millis(0)).await;

        let received = queue.receive(10, Duration::from_millis(50)).await;
        assert_eq!(received[0].delivery_attempt, 2);
    }

    #[tokio::test]
    async fn dead_lettering_removes_from_the_main_queue_and_records_it() {
        let queue = MemoryQueue::new();
        queue.send_batch(vec![message()]).await;
        let received = queue.receive(10, Duration::from_millis(50)).await;
        queue.dead_letter(received[0].clone()).await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(queue.receive(10, Duration::from_millis(50)).await.is_empty());
        assert_eq!(queue.dead_letters().await.len(), 1);
    }
}

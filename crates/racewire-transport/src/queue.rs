//! Thread-safe FIFO message queues with backpressure limits.

use std::collections::VecDeque;

use parking_lot::Mutex;
use racewire_protocol::Message;
use tracing::{error, warn};

use crate::TransportError;

/// Queue sizes at which a queue warns and gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermarks {
    /// At or above this many pending messages, every enqueue logs a warning.
    pub warn: usize,
    /// At or above this many pending messages, enqueues are rejected with
    /// [`TransportError::CapacityExceeded`].
    pub nuke: usize,
}

/// A FIFO of [`Message`]s shared between producers and one draining worker.
///
/// The lock is only held to move messages in or out; producers never wait on a network call.
#[derive(Debug)]
pub struct MessageQueue {
    inner: Mutex<VecDeque<Message>>,
    limits: Watermarks,
}

impl MessageQueue {
    /// A queue that warns at `warn` pending messages and rejects at `nuke`.
    pub fn bounded(warn: usize, nuke: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            limits: Watermarks { warn, nuke },
        }
    }

    pub fn limits(&self) -> Watermarks {
        self.limits
    }

    /// Appends one message. Returns the number of pending messages.
    pub fn push(&self, msg: Message) -> Result<usize, TransportError> {
        self.extend(std::iter::once(msg))
    }

    /// Appends a batch as one contiguous run, in iteration order.
    pub fn extend<I>(&self, msgs: I) -> Result<usize, TransportError>
    where
        I: IntoIterator<Item = Message>,
    {
        let batch: Vec<Message> = msgs.into_iter().collect();
        let pending = {
            let mut queue = self.inner.lock();
            if queue.len() >= self.limits.nuke {
                let pending = queue.len();
                drop(queue);
                error!(pending, "queue full, rejecting messages");
                return Err(TransportError::CapacityExceeded { pending });
            }
            queue.extend(batch);
            queue.len()
        };
        self.check_watermarks(pending)?;
        Ok(pending)
    }

    /// Puts a message ahead of everything already queued.
    pub fn push_front(&self, msg: Message) -> Result<usize, TransportError> {
        let pending = {
            let mut queue = self.inner.lock();
            queue.push_front(msg);
            queue.len()
        };
        self.check_watermarks(pending)?;
        Ok(pending)
    }

    /// Takes every pending message, oldest first, leaving the queue empty.
    pub fn drain(&self) -> VecDeque<Message> {
        std::mem::take(&mut *self.inner.lock())
    }

    /// Number of pending messages.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    fn check_watermarks(&self, pending: usize) -> Result<(), TransportError> {
        let Watermarks { warn, nuke } = self.limits;
        if pending >= nuke {
            error!(pending, nuke, "queue overflow");
            return Err(TransportError::CapacityExceeded { pending });
        }
        if pending >= warn {
            warn!(pending, warn, "queue backing up");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use racewire_protocol::{Chat, OrderClientList};

    use super::*;

    fn chat(n: usize) -> Message {
        Chat::broadcast(n.to_string()).into()
    }

    fn roomy() -> MessageQueue {
        MessageQueue::bounded(64, 128)
    }

    #[test]
    fn test_drain_is_fifo_and_empties_queue() {
        let q = roomy();
        for n in 0..5 {
            q.push(chat(n)).unwrap();
        }
        let drained: Vec<Message> = q.drain().into();
        assert_eq!(drained, (0..5).map(chat).collect::<Vec<_>>());
        assert!(q.is_empty());
    }

    #[test]
    fn test_batch_is_contiguous() {
        let q = roomy();
        q.push(chat(0)).unwrap();
        q.extend((1..4).map(chat)).unwrap();
        q.push(chat(4)).unwrap();
        let drained: Vec<Message> = q.drain().into();
        assert_eq!(drained, (0..5).map(chat).collect::<Vec<_>>());
    }

    #[test]
    fn test_push_front_jumps_the_line() {
        let q = roomy();
        q.push(chat(1)).unwrap();
        q.push_front(OrderClientList.into()).unwrap();
        let drained: Vec<Message> = q.drain().into();
        assert_eq!(drained[0], Message::OrderClientList(OrderClientList));
    }

    #[test]
    fn test_push_reports_pending_count() {
        let q = MessageQueue::bounded(2, 4);
        assert_eq!(q.push(chat(0)).unwrap(), 1);
        assert_eq!(q.push(chat(1)).unwrap(), 2);
        assert_eq!(q.len(), 2);
        assert_eq!(q.limits(), Watermarks { warn: 2, nuke: 4 });
    }

    #[test]
    fn test_reaching_nuke_level_is_an_error() {
        let q = MessageQueue::bounded(2, 4);
        q.extend((0..3).map(chat)).unwrap();
        let err = q.push(chat(3)).unwrap_err();
        assert!(matches!(err, TransportError::CapacityExceeded { pending: 4 }));
    }

    #[test]
    fn test_push_above_nuke_level_is_rejected() {
        let q = MessageQueue::bounded(2, 4);
        let _ = q.extend((0..4).map(chat));
        assert!(q.push(chat(9)).is_err());
        assert_eq!(q.len(), 4);
    }

    #[test]
    fn test_draining_makes_room_again() {
        let q = MessageQueue::bounded(2, 4);
        let _ = q.extend((0..4).map(chat));
        assert_eq!(q.drain().len(), 4);
        assert_eq!(q.push(chat(0)).unwrap(), 1);
    }
}

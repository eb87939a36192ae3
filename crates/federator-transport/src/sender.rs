//! The flow-controlled sender: a backpressure-aware wrapper around
//! the outbound half of a server-streaming RPC call.
//!
//! Stitches a `tokio::sync::mpsc` channel to the `Response` stream
//! tonic hands back to the caller, pulled out into its own struct so
//! the stall/backpressure/cancellation state machine is independently
//! testable.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tonic::Status;
use tracing::{debug, warn};

/// Default stall deadline: how long `send` may block waiting for the
/// transport to become ready before the call is failed outright.
pub const DEFAULT_STALL_DEADLINE: Duration = Duration::from_secs(120);

/// Safety wake-up interval: the sender re-polls readiness on this
/// cadence even if no `on-ready` signal arrives, so a missed wakeup
/// cannot deadlock the sender.
const SAFETY_TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SenderState {
    Open,
    Closed,
}

/// Backpressure-aware wrapper around a bounded `mpsc::Sender` feeding
/// the gRPC response stream.
pub struct FlowControlledSender<T> {
    inner: mpsc::Sender<Result<T, Status>>,
    notify: Arc<Notify>,
    cancel: CancellationToken,
    state: Mutex<SenderState>,
    stall_deadline: Duration,
}

impl<T: Send + 'static> FlowControlledSender<T> {
    pub fn new(inner: mpsc::Sender<Result<T, Status>>, cancel: CancellationToken) -> Self {
        Self::with_stall_deadline(inner, cancel, DEFAULT_STALL_DEADLINE)
    }

    pub fn with_stall_deadline(
        inner: mpsc::Sender<Result<T, Status>>,
        cancel: CancellationToken,
        stall_deadline: Duration,
    ) -> Self {
        FlowControlledSender {
            inner,
            notify: Arc::new(Notify::new()),
            cancel,
            state: Mutex::new(SenderState::Open),
            stall_deadline,
        }
    }

    /// Called whenever the transport reports newfound readiness,
    /// equivalent to tonic waking the response stream's waker; wakes
    /// any blocked `send`.
    pub fn notify_ready(&self) {
        self.notify.notify_waiters();
    }

    async fn is_closed(&self) -> bool {
        *self.state.lock().await == SenderState::Closed || self.cancel.is_cancelled()
    }

    async fn mark_closed(&self) {
        *self.state.lock().await = SenderState::Closed;
    }

    /// Blocks until the frame has been handed to the transport, the
    /// call is cancelled or closed, or the stall deadline elapses.
    pub async fn send(&self, frame: T) -> Result<(), Status> {
        let start = Instant::now();
        let result = timeout(self.stall_deadline, self.wait_and_send(frame)).await;
        match result {
            Ok(inner) => {
                let waited = start.elapsed();
                if waited > SAFETY_TICK {
                    debug!(waited_ms = waited.as_millis() as u64, "send waited for backpressure");
                }
                inner
            }
            Err(_elapsed) => {
                self.mark_closed().await;
                warn!(stall_deadline_ms = self.stall_deadline.as_millis() as u64, "send stalled past deadline");
                Err(Status::deadline_exceeded(
                    "transport did not become ready before the stall deadline",
                ))
            }
        }
    }

    async fn wait_and_send(&self, frame: T) -> Result<(), Status> {
        let mut frame = Some(frame);
        loop {
            if self.is_closed().await {
                return Err(Status::cancelled("stream is closed"));
            }
            match self.inner.try_reserve() {
                Ok(permit) => {
                    permit.send(Ok(frame.take().expect("frame consumed exactly once")));
                    return Ok(());
                }
                Err(TrySendError::Full(_)) => {
                    tokio::select! {
                        _ = self.notify.notified() => continue,
                        _ = self.cancel.cancelled() => {
                            self.mark_closed().await;
                            return Err(Status::cancelled("call cancelled while waiting for readiness"));
                        }
                        _ = sleep(SAFETY_TICK) => continue,
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    self.mark_closed().await;
                    return Err(Status::cancelled("transport closed"));
                }
            }
        }
    }

    /// Idempotent success termination: emits at most one terminal
    /// signal to the transport even under concurrent/repeated calls.
    pub async fn complete(&self) {
        let mut state = self.state.lock().await;
        if *state == SenderState::Open {
            *state = SenderState::Closed;
            drop(state);
            // Dropping the sender's last clone closes the stream; no
            // explicit terminal value is needed for a clean completion.
        }
    }

    /// Idempotent failure termination: sends the error at most once.
    pub async fn error(&self, status: Status) {
        let mut state = self.state.lock().await;
        if *state == SenderState::Open {
            *state = SenderState::Closed;
            drop(state);
            let _ = self.inner.send(Err(status)).await;
        }
    }

    pub async fn is_terminated(&self) -> bool {
        self.is_closed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_succeeds_when_ready() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = FlowControlledSender::new(tx, CancellationToken::new());
        sender.send(1u32).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn send_blocks_until_capacity_frees_then_succeeds() {
        let (tx, mut rx) = mpsc::channel(1);
        let sender = Arc::new(FlowControlledSender::new(tx, CancellationToken::new()));
        sender.send(1u32).await.unwrap(); // fills the only slot

        let sender2 = Arc::clone(&sender);
        let handle = tokio::spawn(async move { sender2.send(2u32).await });

        // Not ready yet: the channel is still full until we drain it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        assert_eq!(rx.recv().await.unwrap().unwrap(), 1);
        sender.notify_ready();
        let result = handle.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(rx.recv().await.unwrap().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn send_fails_with_deadline_exceeded_on_stall() {
        let (tx, _rx) = mpsc::channel(1);
        tx.try_send(Ok(0u32)).unwrap(); // fill the only slot, never drained
        let sender = FlowControlledSender::with_stall_deadline(
            tx,
            CancellationToken::new(),
            Duration::from_millis(500),
        );
        let result = sender.send(1u32).await;
        assert!(matches!(result, Err(status) if status.code() == tonic::Code::DeadlineExceeded));
        assert!(sender.is_terminated().await);
    }

    #[tokio::test]
    async fn cancellation_closes_sender_and_further_sends_are_cancelled() {
        let (tx, _rx) = mpsc::channel(1);
        tx.try_send(Ok(0u32)).unwrap();
        let cancel = CancellationToken::new();
        let sender = FlowControlledSender::new(tx, cancel.clone());
        cancel.cancel();
        let result = sender.send(1u32).await;
        assert!(matches!(result, Err(status) if status.code() == tonic::Code::Cancelled));
    }

    #[tokio::test]
    async fn complete_and_error_are_idempotent() {
        let (tx, _rx) = mpsc::channel(1);
        let sender = FlowControlledSender::new(tx, CancellationToken::new());
        sender.complete().await;
        sender.complete().await;
        sender.error(Status::internal("late error")).await;
        assert!(sender.is_terminated().await);
    }
}

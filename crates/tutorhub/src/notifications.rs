//! Fire-and-forget delivery of staff decisions to the affected user.
//!
//! Workflows only ever enqueue onto an unbounded channel, so a slow or broken
//! sink can never block or roll back the decision that produced the message.
//! A [`NotificationWorker`] drains the queue and hands each message to the
//! configured [`NotificationSink`], logging and absorbing any failure.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::workflows::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    TutorApplicationAccepted,
    TutorApplicationDenied,
    CoursePublished,
    CourseRejected,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationKind::TutorApplicationAccepted => "tutor_application_accepted",
            NotificationKind::TutorApplicationDenied => "tutor_application_denied",
            NotificationKind::CoursePublished => "course_published",
            NotificationKind::CourseRejected => "course_rejected",
        }
    }
}

/// Payload handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: UserId,
    /// Id of the application or course the decision concerns.
    pub subject_id: String,
    pub feedback: String,
}

/// Outbound delivery hook (e-mail, push, etc.).
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Producer half handed to the workflows.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::UnboundedSender<Notification>,
}

impl NotificationDispatcher {
    pub fn channel(sink: Arc<dyn NotificationSink>) -> (Self, NotificationWorker) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, NotificationWorker { receiver, sink })
    }

    /// Enqueue without waiting. A stopped worker is logged, never reported to the caller.
    pub fn dispatch(&self, notification: Notification) {
        if let Err(mpsc::error::SendError(dropped)) = self.sender.send(notification) {
            warn!(
                kind = dropped.kind.label(),
                recipient = %dropped.recipient,
                "notification worker stopped; dropping notification"
            );
        }
    }
}

/// Consumer half. Spawn [`NotificationWorker::run`] on the runtime, or call
/// [`NotificationWorker::drain`] to deliver whatever is queued right now.
pub struct NotificationWorker {
    receiver: mpsc::UnboundedReceiver<Notification>,
    sink: Arc<dyn NotificationSink>,
}

impl NotificationWorker {
    /// Deliver until every dispatcher has been dropped. Each delivery runs on
    /// the blocking pool, so a slow sink never stalls a runtime worker thread.
    pub async fn run(self) {
        let NotificationWorker { mut receiver, sink } = self;
        while let Some(notification) = receiver.recv().await {
            let sink = Arc::clone(&sink);
            let delivery =
                tokio::task::spawn_blocking(move || deliver(sink.as_ref(), &notification));
            if let Err(err) = delivery.await {
                warn!(%err, "notification delivery task aborted");
            }
        }
        debug!("notification queue closed");
    }

    /// Deliver queued notifications without waiting for more. Returns how many were delivered.
    pub fn drain(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(notification) = self.receiver.try_recv() {
            if deliver(self.sink.as_ref(), &notification) {
                delivered += 1;
            }
        }
        delivered
    }
}

fn deliver(sink: &dyn NotificationSink, notification: &Notification) -> bool {
    match sink.deliver(notification) {
        Ok(()) => {
            debug!(
                kind = notification.kind.label(),
                recipient = %notification.recipient,
                "notification delivered"
            );
            true
        }
        Err(err) => {
            warn!(
                %err,
                kind = notification.kind.label(),
                recipient = %notification.recipient,
                "notification delivery failed"
            );
            false
        }
    }
}

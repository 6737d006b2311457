use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;
use tutorhub::config::MarketplaceConfig;
use tutorhub::notifications::{
    Notification, NotificationDispatcher, NotificationError, NotificationSink, NotificationWorker,
};
use tutorhub::store::MemoryStore;
use tutorhub::workflows::courses::CourseService;
use tutorhub::workflows::enrollment::{
    EnrollmentService, IdentityError, IdentityResolver, PaymentError, PaymentInitiation,
    PaymentInitiator, PaymentRequest,
};
use tutorhub::workflows::tutors::TutorVettingService;
use tutorhub::workflows::UserId;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// The three workflow services wired over one shared store.
pub(crate) struct Marketplace {
    pub(crate) tutors: Arc<TutorVettingService<MemoryStore>>,
    pub(crate) courses: Arc<CourseService<MemoryStore>>,
    pub(crate) enrollments: Arc<EnrollmentService<MemoryStore>>,
}

pub(crate) fn build_marketplace(
    config: &MarketplaceConfig,
    payments: Arc<dyn PaymentInitiator>,
    identities: Arc<dyn IdentityResolver>,
    sink: Arc<dyn NotificationSink>,
) -> (Marketplace, NotificationWorker) {
    let store = Arc::new(MemoryStore::new());
    let (dispatcher, worker) = NotificationDispatcher::channel(sink);

    let tutors = Arc::new(TutorVettingService::new(store.clone(), dispatcher.clone()));
    let courses = Arc::new(CourseService::new(store.clone(), tutors.clone(), dispatcher));
    let enrollments = Arc::new(EnrollmentService::new(
        store.clone(),
        store,
        payments,
        identities,
        config,
    ));

    (
        Marketplace {
            tutors,
            courses,
            enrollments,
        },
        worker,
    )
}

/// Stand-in provider: accepts every charge except methods prefixed with `decline`.
#[derive(Default)]
pub(crate) struct SimulatedPaymentGateway {
    sequence: AtomicU64,
}

impl PaymentInitiator for SimulatedPaymentGateway {
    fn initiate(&self, request: &PaymentRequest) -> Result<PaymentInitiation, PaymentError> {
        if request.method.to_ascii_lowercase().starts_with("decline") {
            return Ok(PaymentInitiation {
                accepted: false,
                reference: None,
            });
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let reference = format!("sim-{}-{sequence:04}", Utc::now().format("%Y%m%d"));
        info!(
            enrollment_id = %request.enrollment_id.0,
            amount = %request.amount,
            currency = %request.currency,
            %reference,
            "simulated payment initiated"
        );
        Ok(PaymentInitiation {
            accepted: true,
            reference: Some(reference),
        })
    }
}

/// Forwards to another provider and keeps every request it saw. The ledger is
/// unbounded, so this is for the demo run and tests, not the server.
#[derive(Default)]
pub(crate) struct RecordingPaymentGateway<P> {
    inner: P,
    requests: Mutex<Vec<PaymentRequest>>,
}

impl<P> RecordingPaymentGateway<P> {
    pub(crate) fn requests(&self) -> Vec<PaymentRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl<P: PaymentInitiator> PaymentInitiator for RecordingPaymentGateway<P> {
    fn initiate(&self, request: &PaymentRequest) -> Result<PaymentInitiation, PaymentError> {
        self.requests
            .lock()
            .map_err(|_| PaymentError::Unavailable("gateway ledger poisoned".to_string()))?
            .push(request.clone());
        self.inner.initiate(request)
    }
}

/// Delivers notifications to the log stream.
pub(crate) struct LoggingNotificationSink;

impl NotificationSink for LoggingNotificationSink {
    fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            kind = notification.kind.label(),
            recipient = %notification.recipient,
            subject_id = %notification.subject_id,
            feedback = %notification.feedback,
            "notification sent"
        );
        Ok(())
    }
}

/// Collects notifications so the demo can print them.
#[derive(Default)]
pub(crate) struct InMemoryNotificationSink {
    events: Mutex<Vec<Notification>>,
}

impl InMemoryNotificationSink {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for InMemoryNotificationSink {
    fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .map_err(|_| NotificationError::Transport("inbox poisoned".to_string()))?
            .push(notification.clone());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct StaticIdentityDirectory {
    names: HashMap<UserId, String>,
}

impl StaticIdentityDirectory {
    pub(crate) fn with_name(mut self, user: &str, display: &str) -> Self {
        self.names.insert(UserId::new(user), display.to_string());
        self
    }
}

impl IdentityResolver for StaticIdentityDirectory {
    fn display_name(&self, user: &UserId) -> Result<String, IdentityError> {
        self.names
            .get(user)
            .cloned()
            .ok_or_else(|| IdentityError::UnknownUser(user.clone()))
    }
}

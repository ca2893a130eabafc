//! Image order state and the background task that polls for the finished image.

use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    art::ImageGenerator,
    model::{OrderId, OrderStatus},
};

/// Where the image for the current weather is at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// Order submitted, no image yet.
    Pending { order: OrderId },
    /// Image generated.
    Ready { order: OrderId, image_url: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageStateError {
    #[error("an image order ({0}) is already pending")]
    AlreadyPending(OrderId),
    #[error("no image order is pending")]
    NotPending,
    #[error("image received for order {received}, but order {expected} is pending")]
    OrderMismatch { expected: OrderId, received: OrderId },
}

impl ImageState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ImageState::Pending { .. })
    }

    pub fn order(&self) -> Option<&OrderId> {
        match self {
            ImageState::Idle => None,
            ImageState::Pending { order } | ImageState::Ready { order, .. } => Some(order),
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            ImageState::Ready { image_url, .. } => Some(image_url),
            _ => None,
        }
    }

    /// `Idle | Ready -> Pending`.
    pub fn submitted(&self, order: OrderId) -> Result<ImageState, ImageStateError> {
        match self {
            ImageState::Pending { order: pending } => {
                Err(ImageStateError::AlreadyPending(pending.clone()))
            }
            ImageState::Idle | ImageState::Ready { .. } => Ok(ImageState::Pending { order }),
        }
    }

    /// `Pending -> Ready`, only for the order that is pending.
    pub fn completed(
        &self,
        order: &OrderId,
        image_url: String,
    ) -> Result<ImageState, ImageStateError> {
        match self {
            ImageState::Pending { order: pending } if pending == order => {
                Ok(ImageState::Ready { order: order.clone(), image_url })
            }
            ImageState::Pending { order: pending } => Err(ImageStateError::OrderMismatch {
                expected: pending.clone(),
                received: order.clone(),
            }),
            _ => Err(ImageStateError::NotPending),
        }
    }
}

/// Background poll for one order. Dropping it stops the polling.
#[derive(Debug)]
pub struct PollTask {
    order: OrderId,
    handle: JoinHandle<()>,
}

impl PollTask {
    /// Polls `order` every `period` (first check one period from now) until the generator
    /// reports the image, then moves `state` to [`ImageState::Ready`] and stops.
    ///
    /// Failed checks are logged and retried on the next tick; there is no attempt limit.
    pub fn spawn(
        generator: Arc<dyn ImageGenerator>,
        order: OrderId,
        period: Duration,
        state: watch::Sender<ImageState>,
    ) -> Self {
        let task_order = order.clone();
        let first_check = Instant::now() + period;
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(first_check, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                debug!(order_id = %task_order, "Checking image order");

                let image_url = match generator.order_status(&task_order).await {
                    Ok(OrderStatus::Ready { image_url }) => image_url,
                    Ok(OrderStatus::InProgress) => continue,
                    Err(err) => {
                        warn!(order_id = %task_order, "Error retrieving generated image: {err:#}");
                        continue;
                    }
                };

                let mut outcome = Ok(());
                state.send_if_modified(|current| match current.completed(&task_order, image_url) {
                    Ok(next) => {
                        *current = next;
                        true
                    }
                    Err(err) => {
                        outcome = Err(err);
                        false
                    }
                });

                match outcome {
                    Ok(()) => info!(order_id = %task_order, "Image ready"),
                    Err(err) => warn!(order_id = %task_order, "Dropping generated image: {err}"),
                }
                break;
            }
        });

        Self { order, handle }
    }

    pub fn order(&self) -> &OrderId {
        &self.order
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            debug!(order_id = %self.order, "Cancelling image poll");
            self.handle.abort();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::{
        collections::VecDeque,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    /// Image generator that answers from a script and counts calls.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedGenerator {
        pub submissions: Mutex<Vec<String>>,
        pub submit_results: Mutex<VecDeque<anyhow::Result<OrderId>>>,
        pub status_results: Mutex<VecDeque<anyhow::Result<OrderStatus>>>,
        pub status_calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        pub fn with_statuses(statuses: Vec<anyhow::Result<OrderStatus>>) -> Self {
            Self { status_results: Mutex::new(statuses.into()), ..Default::default() }
        }

        pub fn status_calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }

        pub fn submit_calls(&self) -> usize {
            self.submissions.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ImageGenerator for ScriptedGenerator {
        async fn submit(&self, prompt: &str) -> anyhow::Result<OrderId> {
            self.submissions.lock().unwrap().push(prompt.to_string());
            self.submit_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(OrderId::new("order-1")))
        }

        async fn order_status(&self, _order: &OrderId) -> anyhow::Result<OrderStatus> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            self.status_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(OrderStatus::InProgress))
        }
    }

    pub(crate) fn ready(url: &str) -> anyhow::Result<OrderStatus> {
        Ok(OrderStatus::Ready { image_url: url.to_string() })
    }

    pub(crate) const PERIOD: Duration = Duration::from_secs(30);

    /// Lets spawned tasks run after time moved.
    pub(crate) async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn pending(order: &str) -> (watch::Sender<ImageState>, watch::Receiver<ImageState>) {
        watch::channel(ImageState::Pending { order: OrderId::new(order) })
    }

    #[test]
    fn transitions_follow_idle_pending_ready() {
        let order = OrderId::new("a");

        let pending = ImageState::Idle.submitted(order.clone()).unwrap();
        assert!(pending.is_pending());
        assert_eq!(
            pending.submitted(OrderId::new("b")),
            Err(ImageStateError::AlreadyPending(order.clone()))
        );

        let ready = pending.completed(&order, "https://img".into()).unwrap();
        assert_eq!(ready.image_url(), Some("https://img"));
        assert_eq!(ready.order(), Some(&order));

        let again = ready.submitted(OrderId::new("b")).unwrap();
        assert_eq!(again, ImageState::Pending { order: OrderId::new("b") });
    }

    #[test]
    fn completion_requires_matching_pending_order() {
        assert_eq!(
            ImageState::Idle.completed(&OrderId::new("a"), "u".into()),
            Err(ImageStateError::NotPending)
        );

        let pending = ImageState::Pending { order: OrderId::new("a") };
        assert!(matches!(
            pending.completed(&OrderId::new("b"), "u".into()),
            Err(ImageStateError::OrderMismatch { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn first_check_happens_after_one_period() {
        let generator = Arc::new(ScriptedGenerator::default());
        let (tx, _rx) = pending("a");

        let _task = PollTask::spawn(generator.clone(), OrderId::new("a"), PERIOD, tx);

        settle().await;
        assert_eq!(generator.status_calls(), 0);

        time::advance(PERIOD).await;
        settle().await;
        assert_eq!(generator.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_polling_once_image_is_ready() {
        let generator = Arc::new(ScriptedGenerator::with_statuses(vec![
            Ok(OrderStatus::InProgress),
            Err(anyhow::anyhow!("502 Bad Gateway")),
            ready("https://img/full.jpg"),
        ]));
        let (tx, rx) = pending("a");

        let task = PollTask::spawn(generator.clone(), OrderId::new("a"), PERIOD, tx);

        for _ in 0..3 {
            time::advance(PERIOD).await;
            settle().await;
        }
        assert_eq!(generator.status_calls(), 3);
        assert_eq!(rx.borrow().image_url(), Some("https://img/full.jpg"));
        assert!(task.is_finished());

        for _ in 0..5 {
            time::advance(PERIOD).await;
            settle().await;
        }
        assert_eq!(generator.status_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_task_cancels_the_timer() {
        let generator = Arc::new(ScriptedGenerator::default());
        let (tx, rx) = pending("a");

        let task = PollTask::spawn(generator.clone(), OrderId::new("a"), PERIOD, tx);

        time::advance(PERIOD).await;
        settle().await;
        assert_eq!(generator.status_calls(), 1);

        task.cancel();
        for _ in 0..5 {
            time::advance(PERIOD).await;
            settle().await;
        }

        assert_eq!(generator.status_calls(), 1);
        assert!(rx.borrow().is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn image_for_replaced_order_is_dropped() {
        let generator = Arc::new(ScriptedGenerator::with_statuses(vec![ready("https://old")]));
        let (tx, rx) = pending("new");

        let task = PollTask::spawn(generator.clone(), OrderId::new("old"), PERIOD, tx);

        time::advance(PERIOD).await;
        settle().await;

        assert!(task.is_finished());
        assert_eq!(*rx.borrow(), ImageState::Pending { order: OrderId::new("new") });
    }
}

use std::sync::Arc;

use quiz_core::model::{Level, TopicId};
use quiz_core::quiz::QuizSnapshot;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::LoadError;

use super::events::QuizEvent;
use super::loader::QuizLoader;
use super::timer::Timer;

const EVENT_QUEUE_CAPACITY: usize = 32;

/// What the presentation layer should show for an attempt.
#[derive(Debug, Clone)]
pub enum QuizView {
    Loading,
    LoadFailed(Arc<LoadError>),
    Ready(Box<QuizSnapshot>),
}

impl QuizView {
    #[must_use]
    pub fn snapshot(&self) -> Option<&QuizSnapshot> {
        match self {
            Self::Ready(snapshot) => Some(&**snapshot),
            _ => None,
        }
    }
}

/// Single consumer of an attempt's event queue.
///
/// Loads the quiz, then applies learner intents and timer ticks strictly in
/// arrival order, publishing a fresh [`QuizView`] after each change. The
/// loop ends on `QuizEvent::Teardown` or once every sender is gone; either
/// way the timer is cancelled and a pending result report is awaited.
pub struct QuizRunner {
    events: mpsc::Sender<QuizEvent>,
    view: watch::Receiver<QuizView>,
    task: JoinHandle<()>,
}

impl QuizRunner {
    /// Spawn the loop for a quiz on `topic` at `level`.
    #[must_use]
    pub fn spawn(
        loader: QuizLoader,
        topic: TopicId,
        level: Level,
        total_seconds: u32,
        timer: Arc<dyn Timer>,
    ) -> Self {
        let (events, mut inbox) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (publish, view) = watch::channel(QuizView::Loading);
        let ticks = events.downgrade();

        let task = tokio::spawn(async move {
            let started = loader
                .start(topic, level, total_seconds, timer.as_ref(), ticks)
                .await;
            let mut controller = match started {
                Ok(controller) => controller,
                Err(err) => {
                    tracing::warn!(%topic, %level, %err, "failed to start quiz");
                    publish.send_replace(QuizView::LoadFailed(Arc::new(err)));
                    return;
                }
            };
            publish.send_replace(QuizView::Ready(Box::new(controller.snapshot())));

            while let Some(event) = inbox.recv().await {
                let stop = event == QuizEvent::Teardown;
                if controller.handle(event) {
                    publish.send_replace(QuizView::Ready(Box::new(controller.snapshot())));
                }
                if stop {
                    break;
                }
            }

            controller.teardown();
            controller.flush_report().await;
        });

        Self { events, view, task }
    }

    /// A sender for intents, e.g. for an input task.
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<QuizEvent> {
        self.events.clone()
    }

    /// Enqueue one event. Returns `false` once the loop has ended.
    pub async fn send(&self, event: QuizEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<QuizView> {
        self.view.clone()
    }

    #[must_use]
    pub fn current(&self) -> QuizView {
        self.view.borrow().clone()
    }

    /// Tear the attempt down and wait for the loop to finish.
    pub async fn shutdown(self) {
        let _ = self.events.send(QuizEvent::Teardown).await;
        drop(self.events);
        if let Err(err) = self.task.await {
            tracing::warn!(%err, "quiz loop ended abnormally");
        }
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Message loop driving [`AppModel`]
//!
//! Every message goes through [`AppModel::update`] on the thread that owns the
//! dispatcher. Tasks returned from `update` run on tokio and report back over an
//! unbounded channel, so the model has a single writer.

use super::state::{AppModel, Message};
use super::task::Task;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Notify, mpsc};
use tracing::trace;

pub struct Dispatcher {
    sender: mpsc::UnboundedSender<Message>,
    receiver: mpsc::UnboundedReceiver<Message>,
    /// Messages owed by spawned futures and not yet taken off the channel
    pending: Arc<AtomicUsize>,
    /// Signalled when a future ends without queueing its message
    dropped: Arc<Notify>,
}

/// Releases a future's claim on `pending` unless its message was queued
///
/// A queued message is released by the receiving side instead, so `pending`
/// only drops to zero once every message has been handed to the model.
struct Delivery {
    pending: Arc<AtomicUsize>,
    dropped: Arc<Notify>,
    queued: bool,
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if !self.queued {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            self.dropped.notify_one();
        }
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver,
            pending: Arc::new(AtomicUsize::new(0)),
            dropped: Arc::new(Notify::new()),
        }
    }

    /// Run a task's futures; requires a tokio runtime context
    pub fn spawn(&self, task: Task<Message>) {
        for future in task.into_futures() {
            self.pending.fetch_add(1, Ordering::SeqCst);
            let sender = self.sender.clone();
            let mut delivery = Delivery {
                pending: Arc::clone(&self.pending),
                dropped: Arc::clone(&self.dropped),
                queued: false,
            };
            tokio::spawn(async move {
                let message = future.await;
                delivery.queued = sender.send(message).is_ok();
            });
        }
    }

    /// Feed one message to the model and start the work it returns
    pub fn dispatch(&self, model: &mut AppModel, message: Message) {
        trace!(?message, "Dispatching");
        let task = model.update(message);
        self.spawn(task);
    }

    /// Hand a message taken off the channel to the model
    fn deliver(&self, model: &mut AppModel, message: Message) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.dispatch(model, message);
    }

    /// Apply every completion that has already arrived, without waiting
    pub fn pump(&mut self, model: &mut AppModel) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.receiver.try_recv() {
            self.deliver(model, message);
            handled += 1;
        }
        handled
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Process messages until no task is outstanding
    pub async fn settle(&mut self, model: &mut AppModel) {
        loop {
            self.pump(model);
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            let received = tokio::select! {
                message = self.receiver.recv() => message,
                _ = self.dropped.notified() => None,
            };
            if let Some(message) = received {
                self.deliver(model, message);
            }
        }
    }

    /// Dispatch `message`, then settle
    pub async fn run(&mut self, model: &mut AppModel, message: Message) {
        self.dispatch(model, message);
        self.settle(model).await;
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::CameraBackendManager;
    use crate::backends::camera::types::CameraBackendType;
    use crate::backends::playback::PlaybackManager;
    use crate::config::Config;
    use crate::storage::{FsMediaStore, SystemClock};
    use std::time::Duration;

    fn model(dir: &std::path::Path) -> AppModel {
        AppModel::new(
            Config::default(),
            CameraBackendManager::new(CameraBackendType::TestPattern),
            PlaybackManager::new(),
            Arc::new(FsMediaStore::new(dir.join("media"))),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn test_settle_returns_when_a_future_panics() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model(dir.path());
        let mut dispatcher = Dispatcher::new();

        dispatcher.spawn(Task::batch([
            Task::perform(
                async {
                    panic!("task failed");
                },
                |_: ()| Message::DismissError,
            ),
            Task::perform(async {}, |_| Message::DismissError),
        ]));
        assert_eq!(dispatcher.pending(), 2);

        tokio::time::timeout(Duration::from_secs(2), dispatcher.settle(&mut model))
            .await
            .expect("settle did not return");
        assert_eq!(dispatcher.pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pending_counts_until_message_is_handled() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model(dir.path());
        let mut dispatcher = Dispatcher::new();

        for _ in 0..1000 {
            dispatcher.spawn(Task::perform(async {}, |_| Message::DismissError));
            tokio::time::timeout(Duration::from_secs(2), dispatcher.settle(&mut model))
                .await
                .expect("settle did not return");
            assert_eq!(dispatcher.pending(), 0);
        }
    }
}

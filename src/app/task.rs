// SPDX-License-Identifier: GPL-3.0-only

//! Deferred work returned from [`AppModel::update`](crate::app::AppModel::update)
//!
//! A task is a set of futures that each resolve to one message. The
//! [`Dispatcher`](crate::app::Dispatcher) runs them on tokio and feeds the
//! messages back into the model.

use crate::errors::{AppError, AppResult};
use futures::future::BoxFuture;
use std::future::Future;

/// Futures resolving to messages
#[must_use = "a task does nothing unless handed to the dispatcher"]
pub struct Task<M> {
    futures: Vec<BoxFuture<'static, M>>,
}

impl<M: Send + 'static> Task<M> {
    /// No follow-up work
    pub fn none() -> Self {
        Self {
            futures: Vec::new(),
        }
    }

    /// Run `future` and map its output to a message
    pub fn perform<T, F>(future: F, map: impl FnOnce(T) -> M + Send + 'static) -> Self
    where
        F: Future<Output = T> + Send + 'static,
        T: 'static,
    {
        Self {
            futures: vec![Box::pin(async move { map(future.await) })],
        }
    }

    /// Run a blocking device or filesystem job on the blocking pool
    pub fn blocking<T, J>(job: J, map: impl FnOnce(AppResult<T>) -> M + Send + 'static) -> Self
    where
        J: FnOnce() -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        Self::perform(
            async move {
                tokio::task::spawn_blocking(job)
                    .await
                    .unwrap_or_else(|e| Err(AppError::Other(format!("Worker task failed: {}", e))))
            },
            map,
        )
    }

    /// Combine tasks; their messages arrive in completion order
    pub fn batch(tasks: impl IntoIterator<Item = Task<M>>) -> Self {
        Self {
            futures: tasks.into_iter().flat_map(|t| t.futures).collect(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.futures.is_empty()
    }

    /// Number of messages this task will produce
    pub fn len(&self) -> usize {
        self.futures.len()
    }

    pub fn into_futures(self) -> Vec<BoxFuture<'static, M>> {
        self.futures
    }
}

impl<M> std::fmt::Debug for Task<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task({} pending)", self.futures.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_batch_flattens() {
        let task: Task<u32> = Task::batch([
            Task::none(),
            Task::perform(async { 1 }, |v| v),
            Task::blocking(|| Ok(2u32), |r| r.unwrap_or(0)),
        ]);
        assert_eq!(task.len(), 2);

        let mut out = Vec::new();
        for fut in task.into_futures() {
            out.push(fut.await);
        }
        out.sort();
        assert_eq!(out, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_blocking_panic_becomes_error() {
        let task: Task<AppResult<()>> = Task::blocking(|| -> AppResult<()> { panic!("boom") }, |r| r);
        let result = task.into_futures().remove(0).await;
        assert!(matches!(result, Err(AppError::Other(_))));
    }
}

//! Caller-facing completion handles.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{AggregateError, TaskFailure};

/// Settles with one task's own outcome, independent of what the hooks
/// decided to record. Dropping it does not cancel the task.
#[derive(Debug)]
pub struct TaskHandle<V, E> {
    rx: oneshot::Receiver<Result<V, TaskFailure<E>>>,
}

impl<V, E> TaskHandle<V, E> {
    pub(crate) fn new(rx: oneshot::Receiver<Result<V, TaskFailure<E>>>) -> Self {
        Self { rx }
    }
}

impl<V, E> Future for TaskHandle<V, E> {
    type Output = Result<V, TaskFailure<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TaskFailure::Dropped)))
    }
}

/// Settles exactly once, when the last live unit of a run finishes:
/// with the initializer's value, or with every captured failure.
#[derive(Debug)]
pub struct Completion<T, E> {
    id: Uuid,
    rx: oneshot::Receiver<Result<T, AggregateError<E>>>,
}

impl<T, E> Completion<T, E> {
    pub(crate) fn new(id: Uuid, rx: oneshot::Receiver<Result<T, AggregateError<E>>>) -> Self {
        Self { id, rx }
    }

    /// Id of the run this handle belongs to.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl<T, E> Future for Completion<T, E> {
    type Output = Result<T, AggregateError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| Err(AggregateError::new(vec![TaskFailure::Dropped])))
        })
    }
}

//! Futures for task results and operation completion.

use super::error::RuntimeError;
use crate::region::Point1;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared result of a finished operation.
pub type Outcome = Result<Arc<dyn Any + Send + Sync>, RuntimeError>;

/// Completion of an operation, awaitable any number of times.
pub type Completion = Shared<BoxFuture<'static, Outcome>>;

/// Wraps a spawned operation into a [`Completion`].
pub(crate) fn completion_of(
    name: String,
    handle: tokio::task::JoinHandle<Outcome>,
) -> Completion {
    async move {
        match handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => Err(RuntimeError::TaskPanicked { name }),
            Err(_) => Err(RuntimeError::Aborted(format!("{} was cancelled", name))),
        }
    }
    .boxed()
    .shared()
}

/// Runs CPU-bound work on tokio's blocking pool.
///
/// Accessor loops and codec copies hold std locks and can take a long time,
/// so they stay off the async worker threads. A panic in `f` surfaces as
/// [`RuntimeError::TaskPanicked`] named after `name`.
pub async fn run_blocking<T, F>(name: &str, f: F) -> Result<T, RuntimeError>
where
    F: FnOnce() -> Result<T, RuntimeError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(RuntimeError::TaskPanicked { name: name.to_string() }),
        Err(_) => Err(RuntimeError::Aborted(format!("{} was cancelled", name))),
    }
}

/// A completion that finishes when every one of `parts` has, failing with
/// the first failure in order.
pub(crate) fn join_completions(parts: Vec<Completion>) -> Completion {
    async move {
        let outcomes = futures::future::join_all(parts).await;
        match outcomes.into_iter().find_map(Result::err) {
            Some(e) => Err(e),
            None => Ok(Arc::new(()) as Arc<dyn Any + Send + Sync>),
        }
    }
    .boxed()
    .shared()
}

/// Future value of one task.
#[derive(Clone)]
pub struct TaskFuture {
    completion: Completion,
}

impl TaskFuture {
    pub(crate) fn new(completion: Completion) -> Self {
        Self { completion }
    }

    /// Waits for the task and returns its value as `T`.
    pub async fn get<T: Any + Clone>(&self) -> Result<T, RuntimeError> {
        let value = self.completion.clone().await?;
        value.downcast_ref::<T>().cloned().ok_or_else(|| {
            RuntimeError::invariant(format!(
                "task result is not a {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Waits for the task without reading its value.
    pub async fn wait(&self) -> Result<(), RuntimeError> {
        self.completion.clone().await.map(|_| ())
    }
}

/// Futures of every point task of an index launch.
#[derive(Clone)]
pub struct FutureMap {
    points: BTreeMap<Point1, Completion>,
}

impl FutureMap {
    pub(crate) fn new(points: BTreeMap<Point1, Completion>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Waits for every point task. Returns the first failure, in point order,
    /// after all of them have finished.
    pub async fn wait_all_results(&self) -> Result<(), RuntimeError> {
        let outcomes = futures::future::join_all(self.points.values().cloned()).await;
        outcomes.into_iter().try_for_each(|o| o.map(|_| ()))
    }

    /// Waits for the task at `point` and returns its value as `T`.
    pub async fn get_result<T: Any + Clone>(&self, point: Point1) -> Result<T, RuntimeError> {
        let completion = self
            .points
            .get(&point)
            .ok_or_else(|| RuntimeError::invariant(format!("no point {} in launch", point)))?;
        TaskFuture::new(completion.clone()).get::<T>().await
    }
}

/// Completion handle of an acquire, release or destroy operation.
#[derive(Clone)]
pub struct OperationHandle {
    completion: Completion,
}

impl OperationHandle {
    pub(crate) fn new(completion: Completion) -> Self {
        Self { completion }
    }

    pub async fn wait(&self) -> Result<(), RuntimeError> {
        self.completion.clone().await.map(|_| ())
    }
}

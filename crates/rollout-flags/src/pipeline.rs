// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One-shot background computations whose outcome is cached and replayed.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::error::{FlagsError, Result};

type Outcome<T> = Shared<BoxFuture<'static, Result<Arc<T>>>>;

/// A computation started once, whose result every caller observes.
///
/// The work runs as a tokio task from the moment the pipeline is created,
/// whether or not anyone awaits it. Success and failure are both final.
/// Dropping the pipeline aborts the task if it is still running.
pub struct Pipeline<T> {
	name: &'static str,
	outcome: Outcome<T>,
	abort: AbortHandle,
}

impl<T> Pipeline<T>
where
	T: Send + Sync + 'static,
{
	/// Starts `future` on `handle`'s runtime.
	pub fn spawn<F>(name: &'static str, handle: &Handle, future: F) -> Self
	where
		F: Future<Output = Result<T>> + Send + 'static,
	{
		let task = handle.spawn(future);
		let abort = task.abort_handle();

		let outcome = async move {
			match task.await {
				Ok(result) => result.map(Arc::new),
				Err(e) => Err(FlagsError::PipelineAborted {
					pipeline: name,
					reason: e.to_string(),
				}),
			}
		}
		.boxed()
		.shared();

		debug!(pipeline = name, "Pipeline started");

		Self {
			name,
			outcome,
			abort,
		}
	}

	/// Waits for the outcome. Later calls return the cached outcome.
	pub async fn get(&self) -> Result<Arc<T>> {
		self.outcome.clone().await
	}

	/// Returns the outcome if some caller has already observed it.
	pub fn peek(&self) -> Option<Result<Arc<T>>> {
		self.outcome.peek().cloned()
	}

	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl<T> Drop for Pipeline<T> {
	fn drop(&mut self) {
		self.abort.abort();
	}
}

impl<T> std::fmt::Debug for Pipeline<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Pipeline")
			.field("name", &self.name)
			.field("finished", &self.abort.is_finished())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	use crate::error::StoreError;

	#[tokio::test]
	async fn test_runs_once_and_replays() {
		let runs = Arc::new(AtomicUsize::new(0));
		let counter = runs.clone();
		let pipeline = Pipeline::spawn("count", &Handle::current(), async move {
			counter.fetch_add(1, Ordering::SeqCst);
			Ok(42u32)
		});

		for _ in 0..5 {
			assert_eq!(*pipeline.get().await.unwrap(), 42);
		}
		assert_eq!(runs.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_failure_is_replayed() {
		let pipeline: Pipeline<u32> = Pipeline::spawn("fail", &Handle::current(), async {
			Err(StoreError::transient("503").into())
		});

		let first = pipeline.get().await.unwrap_err();
		let second = pipeline.get().await.unwrap_err();
		assert_eq!(first, second);
		assert_eq!(pipeline.peek(), Some(Err(first)));
	}

	#[tokio::test]
	async fn test_starts_without_being_awaited() {
		let runs = Arc::new(AtomicUsize::new(0));
		let counter = runs.clone();
		let _pipeline = Pipeline::spawn("eager", &Handle::current(), async move {
			counter.fetch_add(1, Ordering::SeqCst);
			Ok(())
		});

		tokio::time::timeout(Duration::from_secs(5), async {
			while runs.load(Ordering::SeqCst) == 0 {
				tokio::task::yield_now().await;
			}
		})
		.await
		.unwrap();
	}

	#[tokio::test]
	async fn test_panic_surfaces_as_aborted() {
		let pipeline: Pipeline<u32> = Pipeline::spawn("boom", &Handle::current(), async {
			panic!("boom");
		});

		let err = pipeline.get().await.unwrap_err();
		assert!(matches!(
			err,
			FlagsError::PipelineAborted {
				pipeline: "boom",
				..
			}
		));
	}

	#[tokio::test]
	async fn test_drop_aborts_running_task() {
		struct Guard(Arc<AtomicUsize>);
		impl Drop for Guard {
			fn drop(&mut self) {
				self.0.fetch_add(1, Ordering::SeqCst);
			}
		}

		let dropped = Arc::new(AtomicUsize::new(0));
		let guard = Guard(dropped.clone());
		let pipeline: Pipeline<()> = Pipeline::spawn("stuck", &Handle::current(), async move {
			let _guard = guard;
			futures::future::pending::<()>().await;
			Ok(())
		});

		assert!(pipeline.peek().is_none());
		drop(pipeline);

		tokio::time::timeout(Duration::from_secs(5), async {
			while dropped.load(Ordering::SeqCst) == 0 {
				tokio::task::yield_now().await;
			}
		})
		.await
		.unwrap();
	}
}

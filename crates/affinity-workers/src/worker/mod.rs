use std::{
	fmt,
	panic::AssertUnwindSafe,
	sync::{Arc, Mutex},
};

use futures::{future::BoxFuture, FutureExt};

use crate::{
	args::ArgBundle,
	executor::{shared_pool, Executor, WorkFuture},
};

mod future;
mod pool;
mod service;

pub use future::FutureWorker;
pub use pool::PoolWorker;
pub use service::{ServiceState, ServiceWorker};

/// Marker bound for faults raised by user computations.
pub trait Fault: fmt::Debug + fmt::Display + Send + Sync + 'static {}

impl<E: fmt::Debug + fmt::Display + Send + Sync + 'static> Fault for E {}

/// A worker's computation: consumes the invocation's argument bundle off the
/// affinity thread and resolves to a value or a fault.
pub type ComputeFn<A, B, R, E> =
	Arc<dyn Fn(ArgBundle<A, B>) -> BoxFuture<'static, Result<R, E>> + Send + Sync>;

/// Capability shared by every execution strategy.
pub trait Worker {
	/// Routes computations to `executor` instead of the shared pool, for
	/// invocations started after this call.
	fn set_executor(&self, executor: Arc<dyn Executor>);
}

/// Zero-argument entry point.
pub trait ZeroArgWorker: Worker {
	fn run(&self);
}

/// One-argument entry point.
pub trait UniArgWorker<A>: Worker {
	fn run1(&self, first: A);
}

/// Two-argument entry point.
pub trait BiArgWorker<A, B>: Worker {
	fn run2(&self, first: A, second: B);
}

/// Custom-executor slot shared by the strategies. Empty means the shared
/// pool.
pub(crate) struct ExecutorSlot(Mutex<Option<Arc<dyn Executor>>>);

impl ExecutorSlot {
	pub(crate) const fn empty() -> Self {
		Self(Mutex::new(None))
	}

	pub(crate) fn set(&self, executor: Arc<dyn Executor>) {
		*self.0.lock().expect("Executor slot poisoned") = Some(executor);
	}

	pub(crate) fn execute(&self, unit: WorkFuture) {
		let custom = self.0.lock().expect("Executor slot poisoned").clone();

		match custom {
			Some(executor) => executor.execute(unit),
			None => shared_pool().execute(unit),
		}
	}
}

/// How one unit resolved, before the invocation gate has had its say.
pub(crate) enum UnitOutcome<R, E> {
	Computed(Result<R, E>),
	Cancelled,
	Panicked,
}

/// Drives the computation with a panic guard, so a blown-up computation
/// reports like a cancellation instead of killing a pool thread.
pub(crate) async fn guarded_compute<R, E>(
	computation: BoxFuture<'static, Result<R, E>>,
) -> UnitOutcome<R, E> {
	match AssertUnwindSafe(computation).catch_unwind().await {
		Ok(outcome) => UnitOutcome::Computed(outcome),
		Err(_panic) => UnitOutcome::Panicked,
	}
}

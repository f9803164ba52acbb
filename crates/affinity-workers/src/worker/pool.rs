use std::{
	fmt,
	future::Future,
	sync::{Arc, Mutex},
};

use futures::FutureExt;
use futures_concurrency::future::Race;
use tracing::{error, trace};

use crate::{
	args::ArgBundle,
	callbacks::Callbacks,
	dispatch::AffinityDispatcher,
	executor::Executor,
	invocation::{cancel_pair, CancelHandle, Invocation},
};

use super::{
	guarded_compute, BiArgWorker, ComputeFn, ExecutorSlot, Fault, UniArgWorker, UnitOutcome,
	Worker, ZeroArgWorker,
};

/// The pool-future strategy: cancellable units submitted to the shared pool,
/// or to a custom executor when one is set.
///
/// On-start runs inline when the caller is already on the affinity thread and
/// is marshaled there otherwise; supersession then cancels the previous unit
/// before the new one is submitted.
pub struct PoolWorker<A, B, R, E>
where
	A: Send + 'static,
	B: Send + 'static,
	R: Send + 'static,
	E: Fault,
{
	compute: ComputeFn<A, B, R, E>,
	callbacks: Callbacks<R, E>,
	dispatcher: Arc<dyn AffinityDispatcher>,
	executor: ExecutorSlot,
	live: Mutex<Option<LiveUnit<R, E>>>,
}

struct LiveUnit<R, E> {
	invocation: Arc<Invocation<R, E>>,
	cancel: CancelHandle,
}

impl<A, B, R, E> PoolWorker<A, B, R, E>
where
	A: Send + 'static,
	B: Send + 'static,
	R: Send + 'static,
	E: Fault,
{
	pub fn new<F, Fut>(
		compute: F,
		callbacks: Callbacks<R, E>,
		dispatcher: Arc<dyn AffinityDispatcher>,
	) -> Self
	where
		F: Fn(ArgBundle<A, B>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<R, E>> + Send + 'static,
	{
		Self {
			compute: Arc::new(move |bundle| compute(bundle).boxed()),
			callbacks,
			dispatcher,
			executor: ExecutorSlot::empty(),
			live: Mutex::new(None),
		}
	}

	fn do_run(&self, bundle: ArgBundle<A, B>) {
		// On-start first, inline when already on the affinity thread.
		if self.dispatcher.is_current() {
			(self.callbacks.on_start)();
		} else {
			let on_start = Arc::clone(&self.callbacks.on_start);
			self.dispatcher.schedule(Box::new(move || on_start()));
		}

		let mut live = self.live.lock().expect("Pool worker live slot poisoned");

		if let Some(previous) = live.take() {
			if previous.invocation.retire(|| {}) {
				trace!(invocation_id = %previous.invocation.id(), "Superseded a live pool unit");
			}
			previous.cancel.cancel();
		}

		let invocation = Invocation::new(self.callbacks.clone(), Arc::clone(&self.dispatcher));
		let (cancel, signal) = cancel_pair();

		let unit = {
			let invocation = Arc::clone(&invocation);
			let compute = Arc::clone(&self.compute);

			async move {
				if !invocation.is_open() {
					trace!(invocation_id = %invocation.id(), "Pool unit superseded before starting");
					return;
				}

				let computation = guarded_compute(compute(bundle));
				let cancellation = async {
					(&signal).await;
					UnitOutcome::Cancelled
				};

				match (computation, cancellation).race().await {
					UnitOutcome::Computed(outcome) => {
						invocation.settle(outcome, |_| {});
					}

					UnitOutcome::Cancelled => {
						trace!(invocation_id = %invocation.id(), "Pool unit cancelled mid-computation");
					}

					UnitOutcome::Panicked => {
						error!(invocation_id = %invocation.id(), "Pool computation panicked; completing silently");
						invocation.retire(|| {});
					}
				}
			}
			.boxed()
		};

		self.executor.execute(unit);

		*live = Some(LiveUnit { invocation, cancel });
	}
}

impl<A, B, R, E> Worker for PoolWorker<A, B, R, E>
where
	A: Send + 'static,
	B: Send + 'static,
	R: Send + 'static,
	E: Fault,
{
	fn set_executor(&self, executor: Arc<dyn Executor>) {
		self.executor.set(executor);
	}
}

impl<A, B, R, E> ZeroArgWorker for PoolWorker<A, B, R, E>
where
	A: Send + 'static,
	B: Send + 'static,
	R: Send + 'static,
	E: Fault,
{
	fn run(&self) {
		self.do_run(ArgBundle::empty());
	}
}

impl<A, B, R, E> UniArgWorker<A> for PoolWorker<A, B, R, E>
where
	A: Send + 'static,
	B: Send + 'static,
	R: Send + 'static,
	E: Fault,
{
	fn run1(&self, first: A) {
		self.do_run(ArgBundle::one(first));
	}
}

impl<A, B, R, E> BiArgWorker<A, B> for PoolWorker<A, B, R, E>
where
	A: Send + 'static,
	B: Send + 'static,
	R: Send + 'static,
	E: Fault,
{
	fn run2(&self, first: A, second: B) {
		self.do_run(ArgBundle::two(first, second));
	}
}

impl<A, B, R, E> Drop for PoolWorker<A, B, R, E>
where
	A: Send + 'static,
	B: Send + 'static,
	R: Send + 'static,
	E: Fault,
{
	fn drop(&mut self) {
		let Ok(mut live) = self.live.lock() else {
			return;
		};

		if let Some(previous) = live.take() {
			previous.invocation.retire(|| {});
			previous.cancel.cancel();
		}
	}
}

impl<A, B, R, E> fmt::Debug for PoolWorker<A, B, R, E>
where
	A: Send + 'static,
	B: Send + 'static,
	R: Send + 'static,
	E: Fault,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PoolWorker").finish_non_exhaustive()
	}
}

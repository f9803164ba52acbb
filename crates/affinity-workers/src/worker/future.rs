use std::{
	fmt,
	future::Future,
	panic::AssertUnwindSafe,
	sync::{Arc, Mutex},
};

use futures::{
	future::{AbortHandle, Abortable, Aborted},
	FutureExt,
};
use tracing::{error, trace};

use crate::{
	args::ArgBundle, callbacks::Callbacks, dispatch::AffinityDispatcher, executor::Executor,
	invocation::Invocation,
};

use super::{BiArgWorker, ComputeFn, ExecutorSlot, Fault, UniArgWorker, Worker, ZeroArgWorker};

/// The cancellable-future strategy: each run's abort handle is held directly,
/// and a restart aborts the live future before submitting the next one.
///
/// On-start is scheduled at submission time, not when the computation actually
/// begins executing.
pub struct FutureWorker<A, B, R, E>
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
	live: Mutex<Option<LiveFuture<R, E>>>,
}

struct LiveFuture<R, E> {
	invocation: Arc<Invocation<R, E>>,
	abort: AbortHandle,
}

impl<A, B, R, E> FutureWorker<A, B, R, E>
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
		let mut live = self.live.lock().expect("Future worker live slot poisoned");

		if let Some(previous) = live.take() {
			if previous.invocation.retire(|| {}) {
				trace!(invocation_id = %previous.invocation.id(), "Superseded a live future");
			}
			previous.abort.abort();
		}

		let invocation = Invocation::new(self.callbacks.clone(), Arc::clone(&self.dispatcher));
		let (abort, registration) = AbortHandle::new_pair();

		// On-start reports submission, ahead of the unit reaching a pool
		// thread; FIFO scheduling keeps it ahead of this run's outcome.
		invocation.report_started();

		let unit = {
			let invocation = Arc::clone(&invocation);
			let compute = Arc::clone(&self.compute);

			async move {
				if !invocation.is_open() {
					trace!(invocation_id = %invocation.id(), "Future superseded before starting");
					return;
				}

				let computation =
					Abortable::new(AssertUnwindSafe(compute(bundle)).catch_unwind(), registration);

				match computation.await {
					Ok(Ok(outcome)) => {
						invocation.settle(outcome, |_| {});
					}

					Ok(Err(_panic)) => {
						error!(invocation_id = %invocation.id(), "Future computation panicked; completing silently");
						invocation.retire(|| {});
					}

					Err(Aborted) => {
						trace!(invocation_id = %invocation.id(), "Future aborted after supersession");
					}
				}
			}
			.boxed()
		};

		self.executor.execute(unit);

		*live = Some(LiveFuture { invocation, abort });
	}
}

impl<A, B, R, E> Worker for FutureWorker<A, B, R, E>
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

impl<A, B, R, E> ZeroArgWorker for FutureWorker<A, B, R, E>
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

impl<A, B, R, E> UniArgWorker<A> for FutureWorker<A, B, R, E>
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

impl<A, B, R, E> BiArgWorker<A, B> for FutureWorker<A, B, R, E>
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

impl<A, B, R, E> Drop for FutureWorker<A, B, R, E>
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
			previous.abort.abort();
		}
	}
}

impl<A, B, R, E> fmt::Debug for FutureWorker<A, B, R, E>
where
	A: Send + 'static,
	B: Send + 'static,
	R: Send + 'static,
	E: Fault,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FutureWorker").finish_non_exhaustive()
	}
}

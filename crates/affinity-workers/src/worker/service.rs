use std::{
	fmt,
	future::Future,
	sync::{Arc, Mutex},
};

use futures::FutureExt;
use futures_concurrency::future::Race;
use tokio::sync::watch;
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

/// Observable lifecycle of the state-machine strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
	/// Built, never run.
	Ready,
	/// A run was requested and its unit submitted.
	Scheduled,
	/// The computation is executing.
	Running,
	Succeeded,
	Failed,
	Cancelled,
}

/// The state-machine strategy: a restartable task with observable states.
///
/// Every run loops the state back through `Scheduled`; a run arriving while a
/// previous one is live retires it first, cancelling its computation
/// cooperatively. Restarts are serialized on the live slot, so two rapid calls
/// can never yield two concurrent running computations.
pub struct ServiceWorker<A, B, R, E>
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
	live: Mutex<Option<LiveRun<R, E>>>,
	state_tx: Arc<watch::Sender<ServiceState>>,
}

struct LiveRun<R, E> {
	invocation: Arc<Invocation<R, E>>,
	cancel: CancelHandle,
}

impl<A, B, R, E> ServiceWorker<A, B, R, E>
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
		let (state_tx, _) = watch::channel(ServiceState::Ready);

		Self {
			compute: Arc::new(move |bundle| compute(bundle).boxed()),
			callbacks,
			dispatcher,
			executor: ExecutorSlot::empty(),
			live: Mutex::new(None),
			state_tx: Arc::new(state_tx),
		}
	}

	/// Current lifecycle state.
	#[must_use]
	pub fn state(&self) -> ServiceState {
		*self.state_tx.borrow()
	}

	/// Watches lifecycle transitions as they happen.
	#[must_use]
	pub fn watch_state(&self) -> watch::Receiver<ServiceState> {
		self.state_tx.subscribe()
	}

	fn transition(&self, from: &[ServiceState], to: ServiceState) {
		self.state_tx.send_if_modified(|state| {
			if from.contains(state) {
				*state = to;
				true
			} else {
				false
			}
		});
	}

	fn do_run(&self, bundle: ArgBundle<A, B>) {
		let mut live = self.live.lock().expect("Service live slot poisoned");

		if let Some(previous) = live.take() {
			let superseded = previous.invocation.retire(|| {
				self.transition(
					&[ServiceState::Scheduled, ServiceState::Running],
					ServiceState::Cancelled,
				);
			});
			previous.cancel.cancel();

			if superseded {
				trace!(invocation_id = %previous.invocation.id(), "Superseded a live service run");
			}
		}

		self.state_tx.send_replace(ServiceState::Scheduled);

		let invocation = Invocation::new(self.callbacks.clone(), Arc::clone(&self.dispatcher));
		let (cancel, signal) = cancel_pair();

		let unit = {
			let invocation = Arc::clone(&invocation);
			let compute = Arc::clone(&self.compute);
			let state_tx = Arc::clone(&self.state_tx);

			async move {
				let started = invocation.report_started_if_open(|| {
					state_tx.send_replace(ServiceState::Running);
				});
				if !started {
					trace!(invocation_id = %invocation.id(), "Service run superseded before starting");
					return;
				}

				let computation = guarded_compute(compute(bundle));
				let cancellation = async {
					(&signal).await;
					UnitOutcome::Cancelled
				};

				match (computation, cancellation).race().await {
					UnitOutcome::Computed(outcome) => {
						invocation.settle(outcome, |outcome| {
							state_tx.send_replace(if outcome.is_ok() {
								ServiceState::Succeeded
							} else {
								ServiceState::Failed
							});
						});
					}

					UnitOutcome::Cancelled => {
						trace!(invocation_id = %invocation.id(), "Service run cancelled mid-computation");
					}

					UnitOutcome::Panicked => {
						error!(invocation_id = %invocation.id(), "Service computation panicked; completing silently");
						invocation.retire(|| {
							state_tx.send_replace(ServiceState::Cancelled);
						});
					}
				}
			}
			.boxed()
		};

		self.executor.execute(unit);

		*live = Some(LiveRun { invocation, cancel });
	}
}

impl<A, B, R, E> Worker for ServiceWorker<A, B, R, E>
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

impl<A, B, R, E> ZeroArgWorker for ServiceWorker<A, B, R, E>
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

impl<A, B, R, E> UniArgWorker<A> for ServiceWorker<A, B, R, E>
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

impl<A, B, R, E> BiArgWorker<A, B> for ServiceWorker<A, B, R, E>
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

impl<A, B, R, E> Drop for ServiceWorker<A, B, R, E>
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
			previous.invocation.retire(|| {
				self.transition(
					&[ServiceState::Scheduled, ServiceState::Running],
					ServiceState::Cancelled,
				);
			});
			previous.cancel.cancel();
		}
	}
}

impl<A, B, R, E> fmt::Debug for ServiceWorker<A, B, R, E>
where
	A: Send + 'static,
	B: Send + 'static,
	R: Send + 'static,
	E: Fault,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ServiceWorker")
			.field("state", &self.state())
			.finish_non_exhaustive()
	}
}

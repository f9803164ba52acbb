use std::{
	future::{Future, IntoFuture},
	pin::Pin,
	sync::{Arc, Mutex},
	task::{Context, Poll},
};

use async_channel as chan;
use pin_project_lite::pin_project;
use tracing::{trace, warn};
use uuid::Uuid;

use crate::{callbacks::Callbacks, dispatch::AffinityDispatcher};

/// Phases of one invocation's delivery gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
	/// No terminal callbacks delivered yet.
	Open,
	/// Outcome delivered: success or error, then complete.
	Settled,
	/// Superseded, panicked or abandoned: complete alone.
	Retired,
}

/// One invocation's delivery token.
///
/// Owns the exactly-once discipline shared by every strategy: deciding the
/// terminal phase and enqueueing the matching callbacks happen as one step
/// under the gate lock, so a finishing computation and a superseding run can
/// never both report for the same invocation. The terminal pair (success or
/// error, then complete) is enqueued as a single job, keeping it contiguous in
/// the dispatcher's FIFO.
pub(crate) struct Invocation<R, E> {
	id: Uuid,
	gate: Mutex<Phase>,
	callbacks: Callbacks<R, E>,
	dispatcher: Arc<dyn AffinityDispatcher>,
}

impl<R, E> Invocation<R, E>
where
	R: Send + 'static,
	E: Send + 'static,
{
	pub(crate) fn new(
		callbacks: Callbacks<R, E>,
		dispatcher: Arc<dyn AffinityDispatcher>,
	) -> Arc<Self> {
		Arc::new(Self {
			id: Uuid::new_v4(),
			gate: Mutex::new(Phase::Open),
			callbacks,
			dispatcher,
		})
	}

	pub(crate) const fn id(&self) -> Uuid {
		self.id
	}

	pub(crate) fn is_open(&self) -> bool {
		matches!(
			*self.gate.lock().expect("Invocation gate poisoned"),
			Phase::Open
		)
	}

	/// Schedules on-start unconditionally.
	pub(crate) fn report_started(&self) {
		let on_start = Arc::clone(&self.callbacks.on_start);
		self.dispatcher.schedule(Box::new(move || on_start()));
	}

	/// Schedules on-start only while the gate is still open, running
	/// `while_open` under the gate lock first. Returns whether the run may
	/// proceed.
	pub(crate) fn report_started_if_open(&self, while_open: impl FnOnce()) -> bool {
		let gate = self.gate.lock().expect("Invocation gate poisoned");
		if !matches!(*gate, Phase::Open) {
			return false;
		}

		while_open();

		let on_start = Arc::clone(&self.callbacks.on_start);
		self.dispatcher.schedule(Box::new(move || on_start()));

		true
	}

	/// Delivers the outcome: on-success or on-error, then on-complete, as one
	/// scheduled job. Returns false when the gate was already closed and the
	/// outcome got discarded.
	pub(crate) fn settle(
		&self,
		outcome: Result<R, E>,
		while_open: impl FnOnce(&Result<R, E>),
	) -> bool {
		let mut gate = self.gate.lock().expect("Invocation gate poisoned");
		if !matches!(*gate, Phase::Open) {
			trace!(invocation_id = %self.id, "Discarding the outcome of a superseded invocation");
			return false;
		}

		while_open(&outcome);
		*gate = Phase::Settled;

		let on_success = Arc::clone(&self.callbacks.on_success);
		let on_error = Arc::clone(&self.callbacks.on_error);
		let on_complete = Arc::clone(&self.callbacks.on_complete);

		self.dispatcher.schedule(Box::new(move || {
			match outcome {
				Ok(value) => on_success(value),
				Err(fault) => on_error(fault),
			}

			on_complete();
		}));

		true
	}

	/// Closes the gate without an outcome: on-complete alone. Returns false
	/// when the invocation had already settled or retired.
	pub(crate) fn retire(&self, while_open: impl FnOnce()) -> bool {
		let mut gate = self.gate.lock().expect("Invocation gate poisoned");
		if !matches!(*gate, Phase::Open) {
			return false;
		}

		while_open();
		*gate = Phase::Retired;

		let on_complete = Arc::clone(&self.callbacks.on_complete);
		self.dispatcher.schedule(Box::new(move || on_complete()));

		trace!(invocation_id = %self.id, "Invocation retired");

		true
	}
}

impl<R, E> Drop for Invocation<R, E> {
	fn drop(&mut self) {
		// An invocation abandoned while open still owes its completion,
		// e.g. when an executor discarded the unit without polling it.
		let Ok(gate) = self.gate.get_mut() else {
			return;
		};

		if matches!(*gate, Phase::Open) {
			warn!(
				invocation_id = %self.id,
				"Invocation dropped while still open; delivering completion"
			);

			let on_complete = Arc::clone(&self.callbacks.on_complete);
			self.dispatcher.schedule(Box::new(move || on_complete()));
		}
	}
}

/// Creates the cancellation pair for one invocation. Firing the handle, or
/// just dropping it, resolves the signal.
pub(crate) fn cancel_pair() -> (CancelHandle, CancelSignal) {
	let (tx, rx) = chan::bounded(1);

	(CancelHandle { tx }, CancelSignal { rx })
}

/// Sender half, held in the worker's live slot.
pub(crate) struct CancelHandle {
	tx: chan::Sender<()>,
}

impl CancelHandle {
	pub(crate) fn cancel(&self) {
		self.tx.close();
	}
}

/// Receiver half, raced against the computation inside a unit.
pub(crate) struct CancelSignal {
	rx: chan::Receiver<()>,
}

pin_project! {
	pub(crate) struct CancelledFuture<'recv> {
		#[pin]
		fut: chan::Recv<'recv, ()>,
	}
}

impl Future for CancelledFuture<'_> {
	type Output = ();

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		// Both a sent unit and a closed channel mean cancellation.
		self.project().fut.poll(cx).map(|_| ())
	}
}

impl<'recv> IntoFuture for &'recv CancelSignal {
	type Output = ();
	type IntoFuture = CancelledFuture<'recv>;

	fn into_future(self) -> Self::IntoFuture {
		CancelledFuture {
			fut: self.rx.recv(),
		}
	}
}

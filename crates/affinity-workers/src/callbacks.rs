use std::{fmt, sync::Arc};

/// The four lifecycle callbacks a collaborator wires into a worker.
///
/// Every slot is populated; constructing the set defaults each one to a no-op,
/// so strategies never check for a missing handler. All four run on the
/// affinity thread, never on a background thread.
pub struct Callbacks<R, E> {
	pub(crate) on_start: Arc<dyn Fn() + Send + Sync>,
	pub(crate) on_success: Arc<dyn Fn(R) + Send + Sync>,
	pub(crate) on_error: Arc<dyn Fn(E) + Send + Sync>,
	pub(crate) on_complete: Arc<dyn Fn() + Send + Sync>,
}

impl<R, E> Callbacks<R, E> {
	/// Replaces the handler fired when a run actually begins.
	#[must_use]
	pub fn with_on_start(mut self, on_start: impl Fn() + Send + Sync + 'static) -> Self {
		self.on_start = Arc::new(on_start);
		self
	}

	/// Replaces the handler receiving the computed value of a successful run.
	#[must_use]
	pub fn with_on_success(mut self, on_success: impl Fn(R) + Send + Sync + 'static) -> Self {
		self.on_success = Arc::new(on_success);
		self
	}

	/// Replaces the handler receiving the fault of a failed run.
	#[must_use]
	pub fn with_on_error(mut self, on_error: impl Fn(E) + Send + Sync + 'static) -> Self {
		self.on_error = Arc::new(on_error);
		self
	}

	/// Replaces the handler fired exactly once per invocation that reaches a
	/// terminal outcome, cancellation included.
	#[must_use]
	pub fn with_on_complete(mut self, on_complete: impl Fn() + Send + Sync + 'static) -> Self {
		self.on_complete = Arc::new(on_complete);
		self
	}
}

impl<R, E> Default for Callbacks<R, E> {
	fn default() -> Self {
		Self {
			on_start: Arc::new(|| {}),
			on_success: Arc::new(|_| {}),
			on_error: Arc::new(|_| {}),
			on_complete: Arc::new(|| {}),
		}
	}
}

impl<R, E> Clone for Callbacks<R, E> {
	fn clone(&self) -> Self {
		Self {
			on_start: Arc::clone(&self.on_start),
			on_success: Arc::clone(&self.on_success),
			on_error: Arc::clone(&self.on_error),
			on_complete: Arc::clone(&self.on_complete),
		}
	}
}

impl<R, E> fmt::Debug for Callbacks<R, E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Callbacks").finish_non_exhaustive()
	}
}

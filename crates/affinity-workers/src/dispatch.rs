use std::{
	panic::{self, AssertUnwindSafe},
	thread::{self, JoinHandle, ThreadId},
};

use async_channel as chan;
use tracing::{error, instrument, trace, warn};

use crate::{error::Error, message::LoopMessage};

const THREAD_NAME: &str = "affinity-event-loop";

/// A unit of callback work scheduled onto the affinity thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Marshals callbacks onto the single thread that owns UI state.
///
/// Implementations execute scheduled jobs one at a time, in submission order,
/// on one designated thread. Workers only ever touch lifecycle callbacks
/// through this contract.
pub trait AffinityDispatcher: Send + Sync + 'static {
	/// Schedules `job` to run later on the affinity thread.
	fn schedule(&self, job: Job);

	/// Whether the calling thread is the affinity thread.
	fn is_current(&self) -> bool;
}

/// A dedicated affinity thread draining scheduled jobs in FIFO order.
///
/// Stands in for the host environment's UI thread when there is none, and is
/// what the integration tests drive. A panicking job is caught and logged; the
/// loop keeps serving.
#[derive(Debug)]
pub struct EventLoop {
	msgs_tx: chan::Sender<LoopMessage>,
	thread_id: ThreadId,
	handle: Option<JoinHandle<()>>,
}

impl EventLoop {
	/// Spawns the affinity thread.
	#[instrument(name = "affinity_event_loop_start")]
	pub fn start() -> Result<Self, Error> {
		let (msgs_tx, msgs_rx) = chan::unbounded();

		let handle = thread::Builder::new()
			.name(THREAD_NAME.to_string())
			.spawn(move || Self::run(&msgs_rx))
			.map_err(|source| Error::SpawnThread {
				name: THREAD_NAME.to_string(),
				source,
			})?;

		let thread_id = handle.thread().id();

		trace!(?thread_id, "Affinity event loop started");

		Ok(Self {
			msgs_tx,
			thread_id,
			handle: Some(handle),
		})
	}

	fn run(msgs_rx: &chan::Receiver<LoopMessage>) {
		while let Ok(msg) = msgs_rx.recv_blocking() {
			match msg {
				LoopMessage::Job(job) => {
					if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
						error!("Scheduled callback panicked on the affinity thread");
					}
				}

				LoopMessage::Shutdown => {
					trace!("Affinity event loop shutting down");
					return;
				}
			}
		}
	}

	/// A cloneable scheduling handle onto this loop.
	#[must_use]
	pub fn handle(&self) -> EventLoopHandle {
		EventLoopHandle {
			msgs_tx: self.msgs_tx.clone(),
			thread_id: self.thread_id,
		}
	}

	/// Runs every job scheduled so far, then stops and joins the affinity
	/// thread. Jobs scheduled after this call are dropped.
	pub fn shutdown(mut self) -> Result<(), Error> {
		self.msgs_tx.send_blocking(LoopMessage::Shutdown).ok();

		if let Some(handle) = self.handle.take() {
			handle.join().map_err(|_| Error::ThreadPanicked {
				name: THREAD_NAME.to_string(),
			})?;
		}

		Ok(())
	}
}

impl Drop for EventLoop {
	fn drop(&mut self) {
		// Not shut down explicitly; the thread drains what is queued and exits
		// detached once the channel closes.
		if self.handle.is_some() {
			self.msgs_tx.close();
		}
	}
}

/// Scheduling handle implementing [`AffinityDispatcher`] over a running
/// [`EventLoop`].
#[derive(Debug, Clone)]
pub struct EventLoopHandle {
	msgs_tx: chan::Sender<LoopMessage>,
	thread_id: ThreadId,
}

impl AffinityDispatcher for EventLoopHandle {
	fn schedule(&self, job: Job) {
		if self.msgs_tx.try_send(LoopMessage::Job(job)).is_err() {
			warn!("Affinity event loop is gone; dropping a scheduled callback");
		}
	}

	fn is_current(&self) -> bool {
		thread::current().id() == self.thread_id
	}
}

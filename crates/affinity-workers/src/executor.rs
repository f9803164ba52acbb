use std::thread::{self, JoinHandle};

use async_channel as chan;
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use tokio::runtime;
use tracing::{instrument, trace, warn};

use crate::{error::Error, message::PoolMessage};

/// Threads backing the process-wide default pool.
pub const SHARED_POOL_SIZE: usize = 8;

static SHARED_POOL: Lazy<PoolExecutor> = Lazy::new(|| {
	PoolExecutor::new(SHARED_POOL_SIZE).expect("Failed to start the shared worker pool")
});

/// A boxed unit of background work: one invocation's computation plus its
/// settlement logic.
pub type WorkFuture = BoxFuture<'static, ()>;

/// Runs units of background work off the affinity thread.
///
/// Cancellation and outcome reporting live inside the unit itself, so a single
/// fire-and-forget method is the whole contract and any pool can satisfy it.
pub trait Executor: Send + Sync + 'static {
	/// Accepts `unit` for execution on some worker thread.
	fn execute(&self, unit: WorkFuture);
}

/// The process-wide pool backing every worker without a custom executor.
/// Started lazily on first use, sized once, never reconfigured.
pub fn shared_pool() -> &'static PoolExecutor {
	&SHARED_POOL
}

/// A fixed set of named OS threads, each driving one unit at a time to
/// completion on its own current-thread runtime.
///
/// `size` units run concurrently; further submissions queue in FIFO order
/// until a thread frees up.
#[derive(Debug)]
pub struct PoolExecutor {
	units_tx: chan::Sender<PoolMessage>,
	handles: Vec<JoinHandle<()>>,
}

impl PoolExecutor {
	/// Spawns `size` pool threads.
	#[instrument(name = "worker_pool_start")]
	pub fn new(size: usize) -> Result<Self, Error> {
		let (units_tx, units_rx) = chan::unbounded();

		let handles = (0..size)
			.map(|index| {
				let name = format!("background-worker-{index}");

				let rt = runtime::Builder::new_current_thread()
					.enable_all()
					.build()
					.map_err(|source| Error::BuildRuntime {
						name: name.clone(),
						source,
					})?;

				let units_rx = units_rx.clone();

				thread::Builder::new()
					.name(name.clone())
					.spawn(move || Self::run(&rt, &units_rx))
					.map_err(|source| Error::SpawnThread { name, source })
			})
			.collect::<Result<Vec<_>, _>>()?;

		trace!(size, "Worker pool started");

		Ok(Self { units_tx, handles })
	}

	fn run(rt: &runtime::Runtime, units_rx: &chan::Receiver<PoolMessage>) {
		while let Ok(msg) = units_rx.recv_blocking() {
			match msg {
				PoolMessage::Unit(unit) => rt.block_on(unit),
				PoolMessage::Shutdown => return,
			}
		}
	}

	/// Stops the pool after draining already-queued units, then joins its
	/// threads.
	pub fn shutdown(mut self) -> Result<(), Error> {
		for _ in 0..self.handles.len() {
			self.units_tx.send_blocking(PoolMessage::Shutdown).ok();
		}

		for handle in self.handles.drain(..) {
			let name = handle
				.thread()
				.name()
				.unwrap_or("background-worker")
				.to_string();

			handle.join().map_err(|_| Error::ThreadPanicked { name })?;
		}

		Ok(())
	}
}

impl Executor for PoolExecutor {
	fn execute(&self, unit: WorkFuture) {
		if self.units_tx.try_send(PoolMessage::Unit(unit)).is_err() {
			warn!("Worker pool is shut down; dropping a background unit");
		}
	}
}

impl Drop for PoolExecutor {
	fn drop(&mut self) {
		// Not shut down explicitly; threads drain what is queued and exit
		// detached once the channel closes.
		if !self.handles.is_empty() {
			self.units_tx.close();
		}
	}
}

/// Executor delegating units to a tokio runtime, for hosts that already run
/// one and want computations on its worker threads.
#[derive(Debug, Clone)]
pub struct RuntimeExecutor {
	handle: runtime::Handle,
}

impl RuntimeExecutor {
	/// Executor over the runtime of the calling context.
	pub fn current() -> Result<Self, Error> {
		Ok(Self {
			handle: runtime::Handle::try_current()?,
		})
	}

	#[must_use]
	pub const fn new(handle: runtime::Handle) -> Self {
		Self { handle }
	}
}

impl Executor for RuntimeExecutor {
	fn execute(&self, unit: WorkFuture) {
		self.handle.spawn(unit);
	}
}

use crate::{dispatch::Job, executor::WorkFuture};

/// Messages drained by the affinity event loop thread.
pub(crate) enum LoopMessage {
	Job(Job),
	Shutdown,
}

/// Messages drained by pool executor threads. On shutdown the pool sends one
/// `Shutdown` per thread; queued units ahead of the marker still run.
pub(crate) enum PoolMessage {
	Unit(WorkFuture),
	Shutdown,
}

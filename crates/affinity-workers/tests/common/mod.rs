#![allow(dead_code)]

use std::{
	future::Future,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc, Mutex,
	},
	time::Duration,
};

use affinity_workers::{
	AffinityDispatcher, ArgBundle, BiArgWorker, Callbacks, EventLoopHandle, Executor,
	FutureWorker, PoolWorker, ServiceWorker, UniArgWorker, WorkFuture, Worker, ZeroArgWorker,
};
use async_channel as chan;
use thiserror::Error;

/// Argument shape used by every worker in these tests.
pub type TestBundle = ArgBundle<u32, u32>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleFault {
	#[error("sample fault: {0}")]
	Boom(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	Started,
	Succeeded(u32),
	Failed(SampleFault),
	Completed,
}

/// Observes lifecycle callbacks: asserts affinity confinement on every
/// delivery, counts per kind, and streams events for ordered assertions.
pub struct Recorder {
	events_tx: chan::Sender<Event>,
	events_rx: chan::Receiver<Event>,
	starts: AtomicUsize,
	successes: AtomicUsize,
	failures: AtomicUsize,
	completions: AtomicUsize,
	affinity: EventLoopHandle,
}

impl Recorder {
	pub fn new(affinity: EventLoopHandle) -> Arc<Self> {
		let (events_tx, events_rx) = chan::unbounded();

		Arc::new(Self {
			events_tx,
			events_rx,
			starts: AtomicUsize::new(0),
			successes: AtomicUsize::new(0),
			failures: AtomicUsize::new(0),
			completions: AtomicUsize::new(0),
			affinity,
		})
	}

	pub fn callbacks(self: &Arc<Self>) -> Callbacks<u32, SampleFault> {
		Callbacks::default()
			.with_on_start({
				let recorder = Arc::clone(self);
				move || recorder.record(Event::Started)
			})
			.with_on_success({
				let recorder = Arc::clone(self);
				move |value| recorder.record(Event::Succeeded(value))
			})
			.with_on_error({
				let recorder = Arc::clone(self);
				move |fault| recorder.record(Event::Failed(fault))
			})
			.with_on_complete({
				let recorder = Arc::clone(self);
				move || recorder.record(Event::Completed)
			})
	}

	fn record(&self, event: Event) {
		assert!(
			self.affinity.is_current(),
			"lifecycle callback escaped the affinity thread"
		);

		match &event {
			Event::Started => &self.starts,
			Event::Succeeded(_) => &self.successes,
			Event::Failed(_) => &self.failures,
			Event::Completed => &self.completions,
		}
		.fetch_add(1, Ordering::SeqCst);

		self.events_tx.try_send(event).expect("event sink closed");
	}

	pub async fn next_event(&self) -> Event {
		tokio::time::timeout(Duration::from_secs(5), self.events_rx.recv())
			.await
			.expect("timed out waiting for a lifecycle event")
			.expect("event sink closed")
	}

	pub async fn take_events(&self, count: usize) -> Vec<Event> {
		let mut events = Vec::with_capacity(count);

		for _ in 0..count {
			events.push(self.next_event().await);
		}

		events
	}

	pub async fn wait_for_completions(&self, want: usize) {
		let mut seen = 0;

		while seen < want {
			if matches!(self.next_event().await, Event::Completed) {
				seen += 1;
			}
		}
	}

	pub fn starts(&self) -> usize {
		self.starts.load(Ordering::SeqCst)
	}

	pub fn successes(&self) -> usize {
		self.successes.load(Ordering::SeqCst)
	}

	pub fn failures(&self) -> usize {
		self.failures.load(Ordering::SeqCst)
	}

	pub fn completions(&self) -> usize {
		self.completions.load(Ordering::SeqCst)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
	Service,
	Future,
	Pool,
}

pub const ALL_STRATEGIES: [Strategy; 3] = [Strategy::Service, Strategy::Future, Strategy::Pool];

/// One worker of any strategy, so tests can drive all three through the same
/// entry points.
pub enum AnyWorker {
	Service(ServiceWorker<u32, u32, u32, SampleFault>),
	Future(FutureWorker<u32, u32, u32, SampleFault>),
	Pool(PoolWorker<u32, u32, u32, SampleFault>),
}

impl AnyWorker {
	pub fn build<F, Fut>(
		strategy: Strategy,
		compute: F,
		callbacks: Callbacks<u32, SampleFault>,
		dispatcher: Arc<dyn AffinityDispatcher>,
	) -> Self
	where
		F: Fn(TestBundle) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<u32, SampleFault>> + Send + 'static,
	{
		match strategy {
			Strategy::Service => Self::Service(ServiceWorker::new(compute, callbacks, dispatcher)),
			Strategy::Future => Self::Future(FutureWorker::new(compute, callbacks, dispatcher)),
			Strategy::Pool => Self::Pool(PoolWorker::new(compute, callbacks, dispatcher)),
		}
	}

	pub fn run(&self) {
		match self {
			Self::Service(worker) => worker.run(),
			Self::Future(worker) => worker.run(),
			Self::Pool(worker) => worker.run(),
		}
	}

	pub fn run1(&self, first: u32) {
		match self {
			Self::Service(worker) => worker.run1(first),
			Self::Future(worker) => worker.run1(first),
			Self::Pool(worker) => worker.run1(first),
		}
	}

	pub fn run2(&self, first: u32, second: u32) {
		match self {
			Self::Service(worker) => worker.run2(first, second),
			Self::Future(worker) => worker.run2(first, second),
			Self::Pool(worker) => worker.run2(first, second),
		}
	}

	pub fn set_executor(&self, executor: Arc<dyn Executor>) {
		match self {
			Self::Service(worker) => worker.set_executor(executor),
			Self::Future(worker) => worker.set_executor(executor),
			Self::Pool(worker) => worker.set_executor(executor),
		}
	}
}

/// Executor that parks submitted units until the test releases them, making
/// supersession windows deterministic.
#[derive(Default)]
pub struct ManualExecutor {
	units: Mutex<Vec<WorkFuture>>,
}

impl ManualExecutor {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn queued(&self) -> usize {
		self.units.lock().unwrap().len()
	}

	/// Drives every parked unit to completion, in submission order.
	pub async fn release_all(&self) {
		let units = std::mem::take(&mut *self.units.lock().unwrap());

		for unit in units {
			unit.await;
		}
	}
}

impl Executor for ManualExecutor {
	fn execute(&self, unit: WorkFuture) {
		self.units.lock().unwrap().push(unit);
	}
}

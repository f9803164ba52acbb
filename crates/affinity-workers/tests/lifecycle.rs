mod common;

use std::sync::Arc;

use affinity_workers::{
	AffinityDispatcher, Callbacks, EventLoop, ServiceState, ServiceWorker, ZeroArgWorker,
};
use async_channel as chan;
use tracing::info;
use tracing_test::traced_test;

use common::{AnyWorker, Event, Recorder, SampleFault, TestBundle, ALL_STRATEGIES};

#[tokio::test(flavor = "multi_thread")]
#[traced_test]
async fn single_run_reports_start_success_complete_in_order() {
	for strategy in ALL_STRATEGIES {
		info!(?strategy, "single run");

		let event_loop = EventLoop::start().unwrap();
		let recorder = Recorder::new(event_loop.handle());
		let affinity = event_loop.handle();

		let worker = AnyWorker::build(
			strategy,
			move |_bundle: TestBundle| {
				let affinity = affinity.clone();
				async move {
					// The computation must be off the affinity thread; a wrong
					// answer here fails the Succeeded assertion below.
					Ok(if affinity.is_current() { 0 } else { 42 })
				}
			},
			recorder.callbacks(),
			Arc::new(event_loop.handle()),
		);

		worker.run();

		assert_eq!(recorder.next_event().await, Event::Started, "{strategy:?}");
		assert_eq!(
			recorder.next_event().await,
			Event::Succeeded(42),
			"{strategy:?}"
		);
		assert_eq!(recorder.next_event().await, Event::Completed, "{strategy:?}");

		assert_eq!(recorder.starts(), 1, "{strategy:?}");
		assert_eq!(recorder.successes(), 1, "{strategy:?}");
		assert_eq!(recorder.failures(), 0, "{strategy:?}");
		assert_eq!(recorder.completions(), 1, "{strategy:?}");
	}
}

#[tokio::test(flavor = "multi_thread")]
#[traced_test]
async fn faulted_run_reports_error_then_complete() {
	for strategy in ALL_STRATEGIES {
		info!(?strategy, "faulted run");

		let event_loop = EventLoop::start().unwrap();
		let recorder = Recorder::new(event_loop.handle());

		let worker = AnyWorker::build(
			strategy,
			|_bundle: TestBundle| async { Err(SampleFault::Boom("Test")) },
			recorder.callbacks(),
			Arc::new(event_loop.handle()),
		);

		worker.run();

		assert_eq!(recorder.next_event().await, Event::Started, "{strategy:?}");
		assert_eq!(
			recorder.next_event().await,
			Event::Failed(SampleFault::Boom("Test")),
			"{strategy:?}"
		);
		assert_eq!(recorder.next_event().await, Event::Completed, "{strategy:?}");

		assert_eq!(recorder.successes(), 0, "{strategy:?}");
		assert_eq!(recorder.failures(), 1, "{strategy:?}");
	}
}

#[tokio::test(flavor = "multi_thread")]
#[traced_test]
async fn single_argument_reaches_the_computation() {
	for strategy in ALL_STRATEGIES {
		info!(?strategy, "one-arg run");

		let event_loop = EventLoop::start().unwrap();
		let recorder = Recorder::new(event_loop.handle());

		let worker = AnyWorker::build(
			strategy,
			|bundle: TestBundle| async move {
				Ok(match bundle.into_pair() {
					(Some(first), None) => first,
					_ => 0,
				})
			},
			recorder.callbacks(),
			Arc::new(event_loop.handle()),
		);

		worker.run1(7);

		assert_eq!(recorder.next_event().await, Event::Started, "{strategy:?}");
		assert_eq!(
			recorder.next_event().await,
			Event::Succeeded(7),
			"{strategy:?}"
		);
		assert_eq!(recorder.next_event().await, Event::Completed, "{strategy:?}");
	}
}

#[tokio::test(flavor = "multi_thread")]
#[traced_test]
async fn both_arguments_reach_the_computation() {
	for strategy in ALL_STRATEGIES {
		info!(?strategy, "two-arg run");

		let event_loop = EventLoop::start().unwrap();
		let recorder = Recorder::new(event_loop.handle());

		let worker = AnyWorker::build(
			strategy,
			|bundle: TestBundle| async move {
				Ok(match bundle.into_pair() {
					(Some(first), Some(second)) => first + second,
					_ => 0,
				})
			},
			recorder.callbacks(),
			Arc::new(event_loop.handle()),
		);

		worker.run2(3, 4);

		assert_eq!(recorder.next_event().await, Event::Started, "{strategy:?}");
		assert_eq!(
			recorder.next_event().await,
			Event::Succeeded(7),
			"{strategy:?}"
		);
		assert_eq!(recorder.next_event().await, Event::Completed, "{strategy:?}");
	}
}

#[tokio::test(flavor = "multi_thread")]
#[traced_test]
async fn default_callbacks_are_noops() {
	for strategy in ALL_STRATEGIES {
		info!(?strategy, "default callbacks");

		let event_loop = EventLoop::start().unwrap();
		let (computed_tx, computed_rx) = chan::bounded(1);

		let worker = AnyWorker::build(
			strategy,
			move |_bundle: TestBundle| {
				let computed_tx = computed_tx.clone();
				async move {
					computed_tx.send(()).await.ok();
					Ok(42)
				}
			},
			Callbacks::default(),
			Arc::new(event_loop.handle()),
		);

		worker.run();

		computed_rx
			.recv()
			.await
			.expect("computation never ran with default callbacks");
	}
}

#[tokio::test(flavor = "multi_thread")]
#[traced_test]
async fn default_callbacks_still_settle_the_service() {
	let event_loop = EventLoop::start().unwrap();

	let worker = ServiceWorker::<u32, u32, u32, SampleFault>::new(
		|_bundle| async { Ok(42) },
		Callbacks::default(),
		Arc::new(event_loop.handle()),
	);

	let mut state = worker.watch_state();

	worker.run();

	state
		.wait_for(|state| matches!(state, ServiceState::Succeeded))
		.await
		.unwrap();
}

//!
//! # Affinity Workers
//!
//! Background workers that run a computation off the UI thread and deliver its
//! lifecycle callbacks (on-start, on-success, on-error, on-complete) back on a
//! single designated "affinity" thread, exactly once per invocation.
//!
//! A worker is built once from a computation taking zero, one or two arguments
//! plus a [`Callbacks`] set, then invoked repeatedly; every invocation
//! supersedes the previous one, cancelling its in-flight computation before
//! the new one begins. Cancellation is silent: a superseded invocation fires
//! only on-complete, never a success or error.
//!
//! Three interchangeable strategies implement the contract:
//! - [`ServiceWorker`]: a restartable task with observable lifecycle states;
//! - [`FutureWorker`]: a directly-held cancellable future;
//! - [`PoolWorker`]: cancellable units submitted to a shared pool of
//!   [`SHARED_POOL_SIZE`] threads.
//!
//! Callback delivery goes through an [`AffinityDispatcher`]; hosts without a
//! UI toolkit loop can use the bundled [`EventLoop`]. Computations run on a
//! [`Executor`], by default the shared pool, replaceable per worker via
//! [`Worker::set_executor`].
//!
//! ## Basic example
//!
//! ```
//! use std::sync::Arc;
//!
//! use affinity_workers::{ArgBundle, Callbacks, EventLoop, PoolWorker, ZeroArgWorker};
//!
//! let event_loop = EventLoop::start().unwrap();
//! let (done_tx, done_rx) = std::sync::mpsc::channel();
//!
//! let callbacks = Callbacks::default()
//!     .with_on_success(|answer: u32| println!("computed {answer}"))
//!     .with_on_complete(move || done_tx.send(()).unwrap());
//!
//! let worker = PoolWorker::new(
//!     |_args: ArgBundle| async move { Ok::<_, String>(42) },
//!     callbacks,
//!     Arc::new(event_loop.handle()),
//! );
//!
//! worker.run();
//!
//! done_rx.recv().unwrap();
//! event_loop.shutdown().unwrap();
//! ```

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod args;
mod callbacks;
mod dispatch;
mod error;
mod executor;
mod invocation;
mod message;
mod worker;

pub use args::ArgBundle;
pub use callbacks::Callbacks;
pub use dispatch::{AffinityDispatcher, EventLoop, EventLoopHandle, Job};
pub use error::Error;
pub use executor::{
	shared_pool, Executor, PoolExecutor, RuntimeExecutor, WorkFuture, SHARED_POOL_SIZE,
};
pub use worker::{
	BiArgWorker, ComputeFn, Fault, FutureWorker, PoolWorker, ServiceState, ServiceWorker,
	UniArgWorker, Worker, ZeroArgWorker,
};

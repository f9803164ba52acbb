use std::io;

use thiserror::Error;

/// Infrastructure failures while standing up or tearing down the threads that
/// back dispatchers and executors.
///
/// Faults raised by user computations never show up here; those flow through
/// the on-error lifecycle callback instead.
#[derive(Debug, Error)]
pub enum Error {
	#[error("failed to spawn thread <name='{name}'>")]
	SpawnThread {
		name: String,
		#[source]
		source: io::Error,
	},

	#[error("failed to build runtime for pool thread <name='{name}'>")]
	BuildRuntime {
		name: String,
		#[source]
		source: io::Error,
	},

	#[error("no tokio runtime available to back a runtime executor")]
	MissingRuntime(#[from] tokio::runtime::TryCurrentError),

	#[error("thread panicked before join <name='{name}'>")]
	ThreadPanicked { name: String },
}

//! Background Tasks Module
//!
//! Work that runs off the request path.
//!
//! # Tasks
//! - Worker pool: bounded executor for request handling and touches
//! - Touch dispatch: asynchronous last-accessed updates after reads
//! - Idle sweep: evicts namespaces idle past the threshold at configured intervals

mod pool;
mod sweep;
mod touch;

pub use pool::{Job, PoolError, TaskRunner, WorkerPool};
pub use sweep::{spawn_sweep_task, IdleSweeper, SweepPhase, SweepReport};
pub use touch::TouchDispatcher;

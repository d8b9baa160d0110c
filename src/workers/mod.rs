//! # Pool de Workers
//!
//! Desacopla la aceptación de conexiones de su procesamiento. El hilo de
//! accept encola una tarea por conexión y un conjunto fijo de workers la
//! ejecuta.
//!
//! ```text
//! accept → enqueue → [ TaskQueue (FIFO) ] → worker-0 .. worker-N
//! ```
//!
//! - `queue`: cola FIFO con `Mutex` + `Condvar`, opcionalmente acotada
//! - `pool`: threads con nombre `worker-<n>`, estadísticas y apagado

pub mod pool;
pub mod queue;

pub use pool::{PoolStats, StatsHandle, WorkerPool};
pub use queue::{AdmissionPolicy, QueueConfig, Task, TaskQueue};

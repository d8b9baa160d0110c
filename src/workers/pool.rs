//! # Pool Fijo de Workers
//! src/workers/pool.rs
//!
//! Un conjunto fijo de threads que drenan una [`TaskQueue`] compartida.
//! Cada worker toma la tarea más antigua, la ejecuta fuera del lock y vuelve
//! a esperar.
//!
//! Los panics dentro de una tarea no se atrapan: el panic termina ese worker
//! y el pool queda con un thread menos (no se repone). El guard del worker
//! lo registra en el log y en `live_workers`.
//!
//! Al destruir el pool se detiene la cola, se despierta a todos los workers y
//! se hace `join` de cada uno. Las tareas que seguían en cola se descartan
//! sin ejecutarse.

use super::queue::{QueueConfig, Task, TaskQueue};
use crate::error::PoolError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Instantánea del estado del pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Workers configurados
    pub workers: usize,
    /// Workers vivos (los que murieron por un panic no cuentan)
    pub live_workers: usize,
    /// Tareas esperando en cola
    pub queued: usize,
    /// Tareas ejecutadas hasta el final
    pub completed: u64,
    /// Tareas rechazadas por cola llena
    pub rejected: u64,
}

#[derive(Default)]
struct PoolCounters {
    live: AtomicUsize,
    completed: AtomicU64,
    rejected: AtomicU64,
}

struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

/// Pool fijo de workers con cola FIFO compartida
pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    workers: Vec<Worker>,
    counters: Arc<PoolCounters>,
}

impl WorkerPool {
    /// Número de workers por defecto: el doble del paralelismo del hardware
    pub fn default_size() -> usize {
        2 * num_cpus::get()
    }

    /// Crea un pool con cola sin límite
    pub fn new(size: usize) -> Self {
        Self::with_queue(size, QueueConfig::unbounded())
    }

    /// Crea un pool con la configuración de cola indicada
    pub fn with_queue(size: usize, config: QueueConfig) -> Self {
        let size = if size == 0 {
            warn!("worker pool requested with 0 workers, using 1");
            1
        } else {
            size
        };

        let mut pool = Self {
            queue: Arc::new(TaskQueue::new(config)),
            workers: Vec::with_capacity(size),
            counters: Arc::new(PoolCounters::default()),
        };
        pool.spawn_workers(size);

        info!(
            workers = pool.workers.len(),
            capacity = ?pool.queue.capacity(),
            admission = ?config.admission,
            "worker pool started"
        );
        pool
    }

    fn spawn_workers(&mut self, size: usize) {
        for id in 0..size {
            let queue = Arc::clone(&self.queue);
            let counters = Arc::clone(&self.counters);

            // Se cuenta antes de arrancar para que stats() sea inmediato
            self.counters.live.fetch_add(1, Ordering::SeqCst);

            let spawned = thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || Self::worker_loop(id, queue, counters));

            match spawned {
                Ok(handle) => self.workers.push(Worker {
                    id,
                    handle: Some(handle),
                }),
                Err(e) => {
                    self.counters.live.fetch_sub(1, Ordering::SeqCst);
                    error!(worker = id, error = %e, "could not spawn worker thread");
                }
            }
        }
    }

    /// Loop principal del worker
    fn worker_loop(id: usize, queue: Arc<TaskQueue>, counters: Arc<PoolCounters>) {
        let _guard = LiveGuard {
            id,
            counters: Arc::clone(&counters),
        };
        debug!(worker = id, "worker started");

        while let Some(task) = queue.pop() {
            task();
            counters.completed.fetch_add(1, Ordering::SeqCst);
        }

        debug!(worker = id, "worker stopped");
    }

    /// Encola una tarea
    ///
    /// Con cola sin límite nunca bloquea ni falla (salvo pool detenido).
    pub fn enqueue<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let task: Task = Box::new(task);
        let result = self.queue.push(task);

        if let Err(PoolError::QueueFull { .. }) = result {
            self.counters.rejected.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    /// Workers configurados (los que arrancaron)
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn live_workers(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PoolStats {
        self.stats_handle().stats()
    }

    /// Handle clonable para consultar estadísticas sin ser dueño del pool
    ///
    /// Sirve para handlers que reportan el estado: no mantiene vivos a los
    /// workers ni impide que el pool se destruya.
    pub fn stats_handle(&self) -> StatsHandle {
        StatsHandle {
            queue: Arc::clone(&self.queue),
            counters: Arc::clone(&self.counters),
            workers: self.workers.len(),
        }
    }
}

/// Vista de sólo lectura sobre los contadores del pool
#[derive(Clone)]
pub struct StatsHandle {
    queue: Arc<TaskQueue>,
    counters: Arc<PoolCounters>,
    workers: usize,
}

impl StatsHandle {
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.workers,
            live_workers: self.counters.live.load(Ordering::SeqCst),
            queued: self.queue.len(),
            completed: self.counters.completed.load(Ordering::SeqCst),
            rejected: self.counters.rejected.load(Ordering::SeqCst),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let dropped = self.queue.stop();
        if dropped > 0 {
            warn!(dropped, "worker pool stopped with queued tasks");
        }

        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                // Un worker que murió por panic ya quedó registrado por su guard
                if handle.join().is_err() {
                    debug!(worker = worker.id, "joined panicked worker");
                }
            }
        }

        debug!("all workers shut down");
    }
}

/// Descuenta al worker de `live` cuando su thread termina, incluso por panic
struct LiveGuard {
    id: usize,
    counters: Arc<PoolCounters>,
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
        if thread::panicking() {
            error!(worker = self.id, "worker terminated by a panicking task");
        }
    }
}

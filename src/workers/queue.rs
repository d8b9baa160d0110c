//! # Cola FIFO de Tareas
//! src/workers/queue.rs
//!
//! Cola thread-safe que comparten el hilo de accept (productor) y todos los
//! workers (consumidores). Un `Mutex` protege el `VecDeque` y dos `Condvar`
//! despiertan a quien espera:
//!
//! - `not_empty`: workers esperando una tarea
//! - `not_full`: productores esperando espacio (sólo con cola acotada y
//!   política `Block`)
//!
//! Por defecto la cola no tiene límite: `push` nunca bloquea.

use crate::error::PoolError;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// Unidad de trabajo diferida
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Qué hace `push` cuando la cola acotada está llena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AdmissionPolicy {
    /// El productor espera hasta que haya espacio
    #[default]
    Block,

    /// La tarea se rechaza con `PoolError::QueueFull`
    Reject,
}

/// Configuración de la cola
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueConfig {
    /// `None` (o `Some(0)`) = sin límite
    pub capacity: Option<usize>,
    pub admission: AdmissionPolicy,
}

impl QueueConfig {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn bounded(capacity: usize, admission: AdmissionPolicy) -> Self {
        Self {
            capacity: Some(capacity),
            admission,
        }
    }

    fn limit(&self) -> Option<usize> {
        self.capacity.filter(|capacity| *capacity > 0)
    }
}

struct QueueState {
    tasks: VecDeque<Task>,
    stopped: bool,
}

/// Cola FIFO de tareas
pub struct TaskQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    config: QueueConfig,
}

impl TaskQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                stopped: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            config,
        }
    }

    /// Encola una tarea al final y despierta a un worker
    pub fn push(&self, task: Task) -> Result<(), PoolError> {
        let mut state = self.state.lock();

        if state.stopped {
            return Err(PoolError::Stopped);
        }

        if let Some(capacity) = self.config.limit() {
            while state.tasks.len() >= capacity {
                match self.config.admission {
                    AdmissionPolicy::Reject => return Err(PoolError::QueueFull { capacity }),
                    AdmissionPolicy::Block => {
                        self.not_full.wait(&mut state);
                        if state.stopped {
                            return Err(PoolError::Stopped);
                        }
                    }
                }
            }
        }

        state.tasks.push_back(task);
        drop(state);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Desencola la tarea más antigua
    ///
    /// Bloquea hasta que haya una tarea. Retorna `None` cuando la cola se
    /// detuvo, aunque queden tareas pendientes.
    pub fn pop(&self) -> Option<Task> {
        let mut state = self.state.lock();

        loop {
            if state.stopped {
                return None;
            }

            if let Some(task) = state.tasks.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(task);
            }

            self.not_empty.wait(&mut state);
        }
    }

    /// Detiene la cola y descarta las tareas pendientes
    ///
    /// Retorna cuántas tareas se descartaron sin ejecutar.
    pub fn stop(&self) -> usize {
        let pending = {
            let mut state = self.state.lock();
            state.stopped = true;
            std::mem::take(&mut state.tasks)
        };

        self.not_empty.notify_all();
        self.not_full.notify_all();

        // Las tareas (y los sockets que capturan) se liberan fuera del lock
        let dropped = pending.len();
        drop(pending);
        dropped
    }

    /// Retorna el tamaño actual de la cola
    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacidad máxima, `None` si no hay límite
    pub fn capacity(&self) -> Option<usize> {
        self.config.limit()
    }
}

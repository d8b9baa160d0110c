//! # Errores del Servidor
//! src/error.rs
//!
//! Taxonomía de errores del servidor:
//!
//! - Errores fatales de arranque (crear, configurar, bind, listen del socket):
//!   se registran y se devuelven desde `listen`, sin reintentos.
//! - Errores de I/O por conexión: sólo abandonan esa conexión.
//! - Errores del pool de workers: cola llena o pool detenido.
//!
//! Las anomalías de parsing y las rutas no encontradas **no** son errores:
//! el parser siempre devuelve un `Request` y el router sintetiza un 404.

use std::io;
use std::net::SocketAddr;

pub type AppResult<T> = Result<T, ServerError>;

/// Errores del servidor HTTP
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("could not create socket: {0}")]
    CreateSocket(#[source] io::Error),

    #[error("could not set socket options: {0}")]
    ConfigureSocket(#[source] io::Error),

    #[error("bind to {addr} failed: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("listen failed: {0}")]
    Listen(#[source] io::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Errores al encolar tareas en el pool
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Cola acotada llena con política `Reject`
    #[error("task queue is full (capacity: {capacity})")]
    QueueFull { capacity: usize },

    /// El pool ya recibió la señal de parada
    #[error("worker pool is stopped")]
    Stopped,
}

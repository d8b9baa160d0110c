//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor con soporte para argumentos CLI y variables de
//! entorno (cada flag tiene su variable de respaldo).
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./poolhttp --port 8080 \
//!   --workers 8 \
//!   --queue-capacity 256 \
//!   --admission reject \
//!   --log-dir ./logs --log-rotation hourly
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 LOG_LEVEL=debug ./poolhttp
//! ```

use crate::error::{AppResult, ServerError};
use crate::workers::{AdmissionPolicy, QueueConfig, WorkerPool};
use clap::Parser;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

/// Tamaño mínimo aceptable para `max_request_bytes`
pub const MIN_REQUEST_BYTES: usize = 64;

/// Frecuencia de rotación del archivo de log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

/// Configuración del servidor HTTP
#[derive(Debug, Clone, Parser)]
#[command(name = "poolhttp")]
#[command(about = "Servidor HTTP concurrente mínimo con pool fijo de workers")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    // === Workers ===

    /// Número de workers (por defecto el doble de CPUs)
    #[arg(short, long, env = "WORKERS")]
    pub workers: Option<usize>,

    /// Capacidad de la cola de tareas (0 = sin límite)
    #[arg(long = "queue-capacity", default_value = "0", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Qué hacer cuando la cola acotada está llena
    #[arg(long, value_enum, default_value_t = AdmissionPolicy::Block, env = "ADMISSION")]
    pub admission: AdmissionPolicy,

    // === Conexiones ===

    /// Tamaño máximo de un request en bytes
    #[arg(long = "max-request-bytes", default_value = "1048576", env = "MAX_REQUEST_BYTES")]
    pub max_request_bytes: usize,

    /// Timeout de lectura del socket en milisegundos (0 = sin timeout)
    #[arg(long = "read-timeout-ms", default_value = "0", env = "READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,

    /// Timeout de escritura del socket en milisegundos (0 = sin timeout)
    #[arg(long = "write-timeout-ms", default_value = "0", env = "WRITE_TIMEOUT_MS")]
    pub write_timeout_ms: u64,

    // === Logging ===

    /// Filtro de nivel (`info`, `debug`, `poolhttp=trace`, ...)
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Directorio para archivos de log; sin él sólo se escribe a stdout
    #[arg(long = "log-dir", env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Rotación del archivo de log
    #[arg(long = "log-rotation", value_enum, default_value_t = LogRotation::Daily, env = "LOG_ROTATION")]
    pub log_rotation: LogRotation,

    // === Archivos ===

    /// Directorio de archivos estáticos (`/` sirve `index.html` de aquí)
    #[arg(long = "static-dir", default_value = ".", env = "STATIC_DIR")]
    pub static_dir: PathBuf,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use poolhttp::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resuelve `host:port` a una dirección de socket
    pub fn socket_addr(&self) -> AppResult<SocketAddr> {
        let address = self.address();
        address
            .to_socket_addrs()
            .map_err(|e| ServerError::Config(format!("invalid address {}: {}", address, e)))?
            .next()
            .ok_or_else(|| ServerError::Config(format!("address {} did not resolve", address)))
    }

    /// Número efectivo de workers
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(WorkerPool::default_size)
    }

    /// Configuración de la cola derivada de `queue_capacity` y `admission`
    pub fn queue_config(&self) -> QueueConfig {
        if self.queue_capacity == 0 {
            QueueConfig::unbounded()
        } else {
            QueueConfig::bounded(self.queue_capacity, self.admission)
        }
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> AppResult<()> {
        if self.workers == Some(0) {
            return Err(ServerError::Config("workers must be >= 1".to_string()));
        }

        if self.max_request_bytes < MIN_REQUEST_BYTES {
            return Err(ServerError::Config(format!(
                "max request bytes must be >= {}",
                MIN_REQUEST_BYTES
            )));
        }

        if self.log_level.trim().is_empty() {
            return Err(ServerError::Config("log level must not be empty".to_string()));
        }

        Ok(())
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            workers: None,
            queue_capacity: 0,
            admission: AdmissionPolicy::Block,
            max_request_bytes: 1024 * 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            log_level: "info".to_string(),
            log_dir: None,
            log_rotation: LogRotation::Daily,
            static_dir: PathBuf::from("."),
        }
    }
}

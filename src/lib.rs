//! # poolhttp
//! src/lib.rs
//!
//! Servidor HTTP concurrente mínimo: un listener TCP entrega cada conexión
//! aceptada a un pool fijo de workers. Cada worker parsea el request, busca
//! el handler en la tabla de rutas, construye la response y la escribe.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: lectura incremental, parsing de requests y construcción de responses
//! - `router`: tabla path → handler
//! - `workers`: cola FIFO de tareas y pool fijo de threads
//! - `server`: socket de escucha, loop de accept y pipeline por conexión
//! - `config`: configuración por CLI y variables de entorno
//! - `logging`: subscriber de `tracing` (consola y archivo rotativo)
//! - `error`: tipos de error
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use poolhttp::config::Config;
//! use poolhttp::server::Server;
//!
//! let server = Server::new(Config::default());
//! server.get("/hello", |_req, res| {
//!     res.set_status(200).send("Hello, World!");
//! });
//!
//! server
//!     .listen(8080, || println!("listening on 8080"))
//!     .expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod router;
pub mod server;
pub mod workers;

pub use error::{AppResult, PoolError, ServerError};
pub use http::{Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ShutdownHandle};
pub use workers::{PoolStats, WorkerPool};

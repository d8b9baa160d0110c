//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Abre el socket de escucha (`SO_REUSEADDR`, backlog 5)
//! 2. Acepta conexiones en un solo thread
//! 3. Encola cada conexión en el pool fijo de workers
//! 4. En el worker: lee, parsea, rutea, responde y cierra
//!
//! El loop de accept corre hasta que se usa un [`ShutdownHandle`].

pub mod tcp;

// Re-exportar para facilitar el uso
pub use tcp::{handle_connection, Server, ShutdownHandle, LISTEN_BACKLOG};

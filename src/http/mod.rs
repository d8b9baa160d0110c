//! # Módulo HTTP
//!
//! Este módulo implementa el subconjunto de HTTP que el servidor necesita,
//! sin usar librerías de alto nivel. Incluye:
//!
//! - Lectura incremental de requests desde el socket
//! - Parsing tolerante de requests (nunca falla)
//! - Construcción de responses y serialización al formato de cable
//! - Códigos de estado y sus frases de razón
//!
//! No hay conexiones persistentes ni chunked transfer encoding: cada
//! conexión lleva exactamente un request y una response.
//!
//! ### Formato de Request
//!
//! ```text
//! GET /path?query=value HTTP/1.1\r\n
//! Header-Name: Header-Value\r\n
//! \r\n
//! body opcional
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.1 404 Not Found\r\n
//! Content-Type: text/plain\r\n
//! Content-Length: 9\r\n
//! \r\n
//! Not Found
//! ```

pub mod reader;    // Lectura incremental desde el socket
pub mod request;   // Parsing de requests
pub mod response;  // Construcción de responses
pub mod status;    // Códigos de estado HTTP

// Re-exportamos los tipos principales para facilitar su uso
pub use reader::{ReadState, RequestReader};
pub use request::{Protocol, Request};
pub use response::Response;
pub use status::StatusCode;

//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Este módulo acumula el estado de una respuesta (status, headers, body) y
//! la convierte al formato de cable para enviarla por el socket.
//!
//! ## Formato de una respuesta
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/plain\r\n
//! Content-Length: 5\r\n
//! \r\n
//! Hello
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use poolhttp::http::Response;
//!
//! let mut response = Response::new();
//! response.set_status(200).send("Hello");
//!
//! let wire = response.to_wire_format();
//! assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
//! ```

use super::StatusCode;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Body que se envía cuando `send_file` no puede leer el archivo
pub const FILE_NOT_FOUND_BODY: &str = "File not found";

/// Respuesta HTTP en construcción
///
/// Los handlers la reciben como `&mut Response` y la dejan en su estado
/// final antes de retornar.
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// Código de estado HTTP (200 por defecto)
    status: StatusCode,

    /// Headers HTTP; un `set_header` repetido sobrescribe
    headers: HashMap<String, String>,

    /// Cuerpo de la respuesta (puede ser vacío)
    body: String,
}

impl Response {
    /// Crea una respuesta 200 sin headers ni body
    pub fn new() -> Self {
        Self::default()
    }

    /// Cambia el código de estado
    ///
    /// Acepta cualquier código; los que no tienen frase conocida se
    /// serializan como `Unknown Status`.
    pub fn set_status(&mut self, code: u16) -> &mut Self {
        self.status = StatusCode::new(code);
        self
    }

    /// Agrega o sobrescribe un header
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Envía texto plano
    ///
    /// Fija el body, `Content-Length` y `Content-Type: text/plain`.
    ///
    /// # Ejemplo
    /// ```
    /// use poolhttp::http::Response;
    ///
    /// let mut response = Response::new();
    /// response.send("Hello World");
    ///
    /// assert_eq!(response.header("Content-Length"), Some("11"));
    /// ```
    pub fn send(&mut self, body: &str) -> &mut Self {
        self.set_body(body, "text/plain")
    }

    /// Envía un body JSON ya serializado (`Content-Type: application/json`)
    pub fn send_json(&mut self, body: &str) -> &mut Self {
        self.set_body(body, "application/json")
    }

    /// Serializa `value` con serde y lo envía como JSON
    ///
    /// Si la serialización falla responde 500 con el error en texto plano.
    pub fn send_json_value<T: Serialize + ?Sized>(&mut self, value: &T) -> &mut Self {
        match serde_json::to_string(value) {
            Ok(body) => self.send_json(&body),
            Err(e) => self
                .set_status(StatusCode::INTERNAL_SERVER_ERROR.as_u16())
                .send(&format!("JSON serialization failed: {}", e)),
        }
    }

    /// Envía el contenido de un archivo como `text/html`
    ///
    /// Si el archivo no se puede leer, el body pasa a ser
    /// [`FILE_NOT_FOUND_BODY`] y el código de estado **no** cambia.
    pub fn send_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        let body = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open file");
                FILE_NOT_FOUND_BODY.to_string()
            }
        };

        self.set_body(&body, "text/html")
    }

    fn set_body(&mut self, body: &str, content_type: &str) -> &mut Self {
        self.body = body.to_string();
        let length = self.body.len().to_string();
        self.set_header("Content-Length", &length);
        self.set_header("Content-Type", content_type)
    }

    /// Convierte la respuesta al formato de cable
    ///
    /// - Status line: `HTTP/1.1 200 OK\r\n`
    /// - Headers: `Header-Name: Value\r\n`, en el orden en que itere el mapa
    /// - Línea vacía: `\r\n`
    /// - Body
    pub fn to_wire_format(&self) -> String {
        let mut wire = format!("HTTP/1.1 {}\r\n", self.status);

        for (name, value) in &self.headers {
            wire.push_str(name);
            wire.push_str(": ");
            wire.push_str(value);
            wire.push_str("\r\n");
        }

        wire.push_str("\r\n");
        wire.push_str(&self.body);
        wire
    }

    /// Obtiene el código de estado de la respuesta
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Obtiene una referencia a los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Obtiene una referencia al body
    pub fn body(&self) -> &str {
        &self.body
    }
}

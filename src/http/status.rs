//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Los handlers pueden fijar cualquier código numérico, así que el código de
//! estado es un `u16` envuelto. Sólo un puñado de códigos tiene frase de
//! razón conocida; el resto se serializa como `Unknown Status`.
//!
//! - **2xx**: Éxito (200 OK)
//! - **4xx**: Error del cliente (400, 404)
//! - **5xx**: Error del servidor (500)

/// Código de estado HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(u16);

impl StatusCode {
    /// 200 OK - La petición fue exitosa
    pub const OK: StatusCode = StatusCode(200);

    /// 400 Bad Request - Parámetros inválidos o malformados
    pub const BAD_REQUEST: StatusCode = StatusCode(400);

    /// 404 Not Found - Ruta o recurso no encontrado
    pub const NOT_FOUND: StatusCode = StatusCode(404);

    /// 500 Internal Server Error - Error interno del servidor
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    pub const fn new(code: u16) -> Self {
        StatusCode(code)
    }

    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use poolhttp::http::StatusCode;
    /// assert_eq!(StatusCode::OK.as_u16(), 200);
    /// ```
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    ///
    /// # Ejemplo
    /// ```
    /// use poolhttp::http::StatusCode;
    /// assert_eq!(StatusCode::NOT_FOUND.reason_phrase(), "Not Found");
    /// assert_eq!(StatusCode::new(999).reason_phrase(), "Unknown Status");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            500 => "Internal Server Error",
            _ => "Unknown Status",
        }
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::OK
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}

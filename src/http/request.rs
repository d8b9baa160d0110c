//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! Este módulo implementa un parser HTTP tolerante desde cero.
//!
//! ## Formato de un Request
//!
//! ```text
//! GET /path?param1=value1&param2=value2 HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! User-Agent: curl/7.68.0\r\n
//! \r\n
//! cuerpo opcional
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD URL VERSION` (la versión se ignora)
//! 2. **Headers**: Pares `Name: Value` (uno por línea)
//! 3. **Empty Line**: separa headers del body
//! 4. **Body**: el resto del buffer
//!
//! El parser nunca falla: líneas malformadas producen campos vacíos o
//! valores por defecto en vez de errores.

use std::collections::HashMap;
use std::fmt;

/// Protocolo inferido del esquema de la URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    /// Puerto por defecto del protocolo
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https => 443,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Representa un request HTTP parseado
///
/// Se construye una vez por conexión y es inmutable desde entonces.
#[derive(Debug, Clone)]
pub struct Request {
    /// Método HTTP tal cual llegó (ej: "GET"); vacío si la línea es inválida
    method: String,

    /// URL cruda de la request line, con query incluida
    url: String,

    /// HTTP o HTTPS, según el esquema de la URL
    protocol: Protocol,

    /// Host extraído de la URL (vacío para URLs sin esquema)
    host: String,

    /// Puerto explícito de la URL o el del protocolo
    port: u16,

    /// Path de la petición, sin query (ej: "/hello")
    path: String,

    /// Body del request
    body: String,

    /// Headers HTTP (ej: {"Host": "localhost:8080"}), el último gana
    headers: HashMap<String, String>,

    /// Query parameters parseados (ej: {"num": "10"}), el último gana
    query_params: HashMap<String, String>,
}

impl Request {
    /// Parsea un request desde bytes
    ///
    /// Los bytes que no son UTF-8 válido se reemplazan. Nunca retorna error.
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use poolhttp::http::Request;
    ///
    /// let raw = b"GET /hello?x=1&y=2 HTTP/1.1\r\nHost: example\r\n\r\n";
    /// let request = Request::parse(raw);
    ///
    /// assert_eq!(request.method(), "GET");
    /// assert_eq!(request.path(), "/hello");
    /// assert_eq!(request.query_param("x"), Some("1"));
    /// assert_eq!(request.header("Host"), Some("example"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Self {
        let text = String::from_utf8_lossy(buffer);
        let mut rest: &str = &text;

        // 1. Request line
        let request_line = next_line(&mut rest).map(strip_cr).unwrap_or("");
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or("").to_string();
        let url = parts.next().unwrap_or("").to_string();

        // 2. Protocolo, host y puerto
        let (protocol, host, port) = Self::parse_authority(&url);

        // 3. Path y query
        let (path, query_params) = Self::parse_path_and_query(&url);

        // 4. Headers hasta la línea vacía
        let headers = Self::parse_headers(&mut rest);

        // 5. Lo que queda es el body, sin el salto de línea final
        let body = rest.strip_suffix('\n').unwrap_or(rest).to_string();

        Request {
            method,
            url,
            protocol,
            host,
            port,
            path,
            body,
            headers,
            query_params,
        }
    }

    /// Extrae protocolo, host y puerto de la URL
    ///
    /// Ejemplo: "https://h.example:9443/p" → (HTTPS, "h.example", 9443)
    fn parse_authority(url: &str) -> (Protocol, String, u16) {
        let protocol = if url.starts_with("https://") {
            Protocol::Https
        } else {
            Protocol::Http
        };
        let mut port = protocol.default_port();

        // La query no forma parte de la autoridad
        let url = url.split('?').next().unwrap_or("");
        let host_start = url.find("://").map_or(0, |i| i + 3);
        let rest = &url[host_start..];
        let colon = rest.find(':');
        let slash = rest.find('/');

        let host = match colon {
            Some(c) if slash.map_or(true, |s| c < s) => {
                let port_end = slash.unwrap_or(rest.len());
                // Un puerto ilegible deja el del protocolo
                if let Ok(explicit) = rest[c + 1..port_end].trim().parse::<u16>() {
                    port = explicit;
                }
                &rest[..c]
            }
            _ => &rest[..slash.unwrap_or(rest.len())],
        };

        (protocol, host.to_string(), port)
    }

    /// Separa el path de la query string
    ///
    /// Ejemplo: "/hello?x=1&y=2"
    /// Retorna: ("/hello", {"x": "1", "y": "2"})
    fn parse_path_and_query(url: &str) -> (String, HashMap<String, String>) {
        let (before_query, query_params) = match url.find('?') {
            Some(query_start) => (
                &url[..query_start],
                Self::parse_query_string(&url[query_start + 1..]),
            ),
            None => (url, HashMap::new()),
        };

        // En forma absoluta el path empieza después de la autoridad
        let path = match before_query.find("://") {
            Some(scheme_end) => {
                let authority_and_path = &before_query[scheme_end + 3..];
                match authority_and_path.find('/') {
                    Some(slash) => &authority_and_path[slash..],
                    None => "/",
                }
            }
            None => before_query,
        };

        (path.to_string(), query_params)
    }

    /// Parsea una query string en un HashMap
    ///
    /// Ejemplo: "num=10&text=hello"
    /// Retorna: {"num": "10", "text": "hello"}
    fn parse_query_string(query: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();

        for pair in query.split('&') {
            // Pares sin '=' se ignoran
            if let Some(eq_pos) = pair.find('=') {
                let key = trim_spaces(&pair[..eq_pos]);
                let value = trim_spaces(&pair[eq_pos + 1..]);
                params.insert(key.to_string(), value.to_string());
            }
        }

        params
    }

    /// Parsea los headers HTTP consumiendo líneas de `rest`
    ///
    /// Cada header tiene formato: "Name: Value". Las líneas sin ':' se saltan.
    fn parse_headers(rest: &mut &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();

        while let Some(line) = next_line(rest) {
            let line = strip_cr(line);

            // La línea vacía marca el fin de los headers
            if line.is_empty() {
                break;
            }

            if let Some(colon_pos) = line.find(':') {
                let name = trim_spaces(&line[..colon_pos]);
                let value = trim_spaces(&line[colon_pos + 1..]);
                headers.insert(name.to_string(), value.to_string());
            }
        }

        headers
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Obtiene la URL cruda
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Obtiene el path del request
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene el body del request
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Obtiene todos los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header específico (sensible a mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Obtiene todos los query parameters
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Obtiene un query parameter específico
    ///
    /// # Ejemplo
    /// ```
    /// use poolhttp::http::Request;
    ///
    /// let request = Request::parse(b"GET /test?num=42 HTTP/1.1\r\n\r\n");
    ///
    /// assert_eq!(request.query_param("num"), Some("42"));
    /// assert_eq!(request.query_param("missing"), None);
    /// ```
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Method: {}", self.method)?;
        writeln!(f, "Protocol: {}", self.protocol)?;
        writeln!(f, "Host: {}", self.host)?;
        writeln!(f, "Port: {}", self.port)?;
        writeln!(f, "Path: {}", self.path)?;

        writeln!(f, "Headers:")?;
        for (name, value) in &self.headers {
            writeln!(f, "  {}: {}", name, value)?;
        }

        writeln!(f, "Query Parameters:")?;
        for (name, value) in &self.query_params {
            writeln!(f, "  {}: {}", name, value)?;
        }

        writeln!(f, "Body:\n{}", self.body)
    }
}

/// Toma la siguiente línea (sin el '\n') y avanza `rest`
fn next_line<'a>(rest: &mut &'a str) -> Option<&'a str> {
    if rest.is_empty() {
        return None;
    }

    let text: &'a str = rest;
    match text.find('\n') {
        Some(end) => {
            *rest = &text[end + 1..];
            Some(&text[..end])
        }
        None => {
            *rest = "";
            Some(text)
        }
    }
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Recorta sólo espacios (no tabs ni saltos de línea)
fn trim_spaces(s: &str) -> &str {
    s.trim_matches(' ')
}

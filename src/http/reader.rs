//! # Lectura Incremental de Requests
//! src/http/reader.rs
//!
//! Un request no siempre llega en una sola llamada a `read`: el cliente puede
//! partir los headers en varios segmentos TCP, o mandar un body más grande que
//! un chunk. Este lector acumula bytes en trozos de [`CHUNK_SIZE`] siguiendo
//! una máquina de estados:
//!
//! ```text
//! ReadingHeaders ──(\r\n\r\n)──> ReadingBody ──(Content-Length bytes)──> Complete
//!        │                                                                  ▲
//!        └────────────── (sin Content-Length) ──────────────────────────────┘
//! ```
//!
//! Sin `Content-Length` el body es lo que ya llegó junto con los headers; no
//! se espera más.
//!
//! Un EOF antes de completar no es error: se entrega lo que llegó y el parser
//! hace su mejor esfuerzo. Superar `max_bytes` trunca el request.

use memchr::memmem;
use std::io::{self, Read};

/// Tamaño de cada lectura del socket
pub const CHUNK_SIZE: usize = 1024;

/// Estado de la máquina de lectura
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// Aún no se vio la línea vacía que cierra los headers
    ReadingHeaders,

    /// Headers completos; faltan bytes del body
    ReadingBody {
        body_start: usize,
        content_length: usize,
    },

    /// Request completo (o truncado al límite)
    Complete,
}

/// Acumulador incremental de un request HTTP
#[derive(Debug)]
pub struct RequestReader {
    buffer: Vec<u8>,
    state: ReadState,
    max_bytes: usize,
    truncated: bool,
}

impl RequestReader {
    /// Crea un lector que acepta como máximo `max_bytes`
    pub fn new(max_bytes: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(CHUNK_SIZE.min(max_bytes)),
            state: ReadState::ReadingHeaders,
            max_bytes,
            truncated: false,
        }
    }

    pub fn state(&self) -> ReadState {
        self.state
    }

    /// `true` si se descartaron bytes por superar el límite
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn is_complete(&self) -> bool {
        self.state == ReadState::Complete
    }

    /// Agrega bytes recibidos y avanza la máquina de estados
    pub fn feed(&mut self, bytes: &[u8]) -> ReadState {
        if self.is_complete() {
            return self.state;
        }

        let room = self.max_bytes.saturating_sub(self.buffer.len());
        if bytes.len() > room {
            self.truncated = true;
        }
        self.buffer.extend_from_slice(&bytes[..bytes.len().min(room)]);

        self.advance();

        if self.truncated {
            self.state = ReadState::Complete;
        }
        self.state
    }

    fn advance(&mut self) {
        if self.state == ReadState::ReadingHeaders {
            if let Some(body_start) = find_header_end(&self.buffer) {
                self.state = match content_length(&self.buffer[..body_start]) {
                    Some(content_length) => ReadState::ReadingBody {
                        body_start,
                        content_length,
                    },
                    None => ReadState::Complete,
                };
            }
        }

        if let ReadState::ReadingBody {
            body_start,
            content_length,
        } = self.state
        {
            let expected = body_start.saturating_add(content_length);
            if self.buffer.len() >= expected {
                // Bytes de más después del body se descartan
                self.buffer.truncate(expected);
                self.state = ReadState::Complete;
            }
        }
    }

    /// Lee desde `source` hasta completar el request, llegar a EOF o al límite
    ///
    /// Un error de lectura se propaga: la conexión se abandona sin respuesta.
    pub fn read_from<R: Read>(&mut self, source: &mut R) -> io::Result<ReadState> {
        let mut chunk = [0u8; CHUNK_SIZE];

        while !self.is_complete() {
            let n = match source.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            self.feed(&chunk[..n]);
        }

        Ok(self.state)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// Posición donde empieza el body (después de `\r\n\r\n` o `\n\n`)
fn find_header_end(buffer: &[u8]) -> Option<usize> {
    let crlf = memmem::find(buffer, b"\r\n\r\n").map(|pos| pos + 4);
    let lf = memmem::find(buffer, b"\n\n").map(|pos| pos + 2);

    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Busca `Content-Length` (sin importar mayúsculas) en la sección de headers
///
/// `None` si no existe o su valor no es un número.
fn content_length(head: &[u8]) -> Option<usize> {
    let head = String::from_utf8_lossy(head);

    head.lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
}

//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Este módulo implementa la tabla de rutas que mapea paths HTTP a handlers.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Router::lookup → Handler(&Request, &mut Response) → Response
//! ```
//!
//! - Coincidencia exacta de path: sin prefijos, comodines ni parámetros.
//! - El método HTTP no participa: `get("/x", ..)` y `post("/x", ..)`
//!   escriben en la misma entrada y la última registrada gana.
//! - Muchos workers leen la tabla a la vez (lock compartido); registrar toma
//!   el lock exclusivo. El lock nunca se mantiene mientras corre un handler.
//! - Si no hay handler, o el handler deja el body vacío, se responde
//!   404 `Not Found`.

use crate::http::{Request, Response, StatusCode};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Tipo de función handler
///
/// Un handler recibe el Request y deja la Response en su estado final.
pub type Handler = Arc<dyn Fn(&Request, &mut Response) + Send + Sync + 'static>;

/// Body de la respuesta por defecto cuando nada coincide
pub const NOT_FOUND_BODY: &str = "Not Found";

/// Tabla de rutas path → handler
#[derive(Default)]
pub struct Router {
    routes: RwLock<HashMap<String, Handler>>,
}

impl Router {
    /// Crea un router vacío
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra (o sobrescribe) el handler de un path
    ///
    /// # Ejemplo
    /// ```
    /// use poolhttp::router::Router;
    ///
    /// let router = Router::new();
    /// router.register("/hello", |_req, res| {
    ///     res.send("Hello, World!");
    /// });
    /// assert!(router.lookup("/hello").is_some());
    /// ```
    pub fn register<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        let previous = self
            .routes
            .write()
            .insert(path.to_string(), Arc::new(handler));

        if previous.is_some() {
            debug!(path, "route handler replaced");
        }
    }

    /// Registra un handler para GET (comparte la entrada con POST)
    pub fn get<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        self.register(path, handler);
    }

    /// Registra un handler para POST (comparte la entrada con GET)
    pub fn post<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        self.register(path, handler);
    }

    /// Busca el handler de un path exacto
    pub fn lookup(&self, path: &str) -> Option<Handler> {
        self.routes.read().get(path).cloned()
    }

    /// Encuentra y ejecuta el handler apropiado para un request
    ///
    /// La respuesta arranca como 404 con body vacío. Si después del handler
    /// el body sigue vacío, se reemplaza por 404 `Not Found`.
    pub fn route(&self, request: &Request) -> Response {
        let mut response = Response::new();
        response.set_status(StatusCode::NOT_FOUND.as_u16());

        // El lock de lectura se suelta antes de invocar el handler
        if let Some(handler) = self.lookup(request.path()) {
            handler(request, &mut response);
        }

        if response.body().is_empty() {
            response
                .set_status(StatusCode::NOT_FOUND.as_u16())
                .send(NOT_FOUND_BODY);
        }

        self.add_common_headers(&mut response);
        response
    }

    /// Agrega headers comunes a todas las respuestas
    fn add_common_headers(&self, response: &mut Response) {
        response.set_header("Connection", "close");
    }

    /// Número de rutas registradas
    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes = self.routes.read();
        let mut paths: Vec<&String> = routes.keys().collect();
        paths.sort();
        f.debug_struct("Router").field("routes", &paths).finish()
    }
}

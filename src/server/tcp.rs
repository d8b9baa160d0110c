//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Servidor TCP que acepta conexiones en un solo thread y las entrega a un
//! pool fijo de workers. Cada conexión ocupa un worker durante toda su vida:
//!
//! ```text
//! accept → enqueue → worker: leer → parsear → rutear → serializar → escribir → cerrar
//! ```
//!
//! Una conexión lleva exactamente un request y una response; después el
//! socket se cierra siempre.

use crate::config::Config;
use crate::error::{AppResult, ServerError};
use crate::http::{Request, RequestReader, Response};
use crate::router::Router;
use crate::workers::{PoolStats, StatsHandle, WorkerPool};
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Backlog de conexiones pendientes del socket de escucha
pub const LISTEN_BACKLOG: i32 = 5;

/// Servidor HTTP con pool fijo de workers
pub struct Server {
    config: Config,
    router: Arc<Router>,
    pool: WorkerPool,
    shutdown: Arc<AtomicBool>,
    bound_addr: Arc<Mutex<Option<SocketAddr>>>,
}

impl Server {
    /// Crea el servidor y arranca los workers
    ///
    /// Los workers quedan esperando tareas; todavía no se abre ningún socket.
    pub fn new(config: Config) -> Self {
        let pool = WorkerPool::with_queue(config.worker_count(), config.queue_config());

        Self {
            config,
            router: Arc::new(Router::new()),
            pool,
            shutdown: Arc::new(AtomicBool::new(false)),
            bound_addr: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Tabla de rutas compartida con los workers
    pub fn router(&self) -> Arc<Router> {
        Arc::clone(&self.router)
    }

    pub fn register<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        self.router.register(path, handler);
    }

    pub fn get<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        self.router.get(path, handler);
    }

    pub fn post<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        self.router.post(path, handler);
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Handle de estadísticas para usar dentro de handlers
    pub fn stats_handle(&self) -> StatsHandle {
        self.pool.stats_handle()
    }

    /// Handle para detener el loop de accept desde otro thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            bound_addr: Arc::clone(&self.bound_addr),
        }
    }

    /// Escucha en `0.0.0.0:port`
    ///
    /// `on_start` se invoca una vez, después de `listen` y antes del primer
    /// `accept`. Bloquea el thread actual hasta que se pida el apagado.
    pub fn listen<F>(&self, port: u16, on_start: F) -> AppResult<()>
    where
        F: FnOnce(),
    {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        self.listen_on(addr, |_| on_start())
    }

    /// Escucha en una dirección explícita
    ///
    /// `on_start` recibe la dirección local real (útil con puerto 0).
    pub fn listen_on<F>(&self, addr: SocketAddr, on_start: F) -> AppResult<()>
    where
        F: FnOnce(SocketAddr),
    {
        let listener = bind_listener(addr).map_err(|e| {
            error!(%addr, error = %e, "could not start listener");
            e
        })?;
        let local_addr = listener.local_addr()?;

        *self.bound_addr.lock() = Some(local_addr);
        info!(
            addr = %local_addr,
            workers = self.pool.size(),
            "listening"
        );
        on_start(local_addr);

        self.accept_loop(&listener);

        *self.bound_addr.lock() = None;
        Ok(())
    }

    fn accept_loop(&self, listener: &TcpListener) {
        while !self.shutdown.load(Ordering::SeqCst) {
            match listener.accept() {
                // La conexión que despierta al loop no se atiende
                Ok(_) if self.shutdown.load(Ordering::SeqCst) => break,
                Ok((stream, _)) => self.dispatch(stream),
                Err(e) => warn!(error = %e, "failed to accept connection"),
            }
        }

        info!("accept loop stopped");
    }

    /// Entrega una conexión aceptada al pool
    fn dispatch(&self, stream: TcpStream) {
        let peer = stream.peer_addr().ok();

        if let Err(e) = self.apply_timeouts(&stream) {
            warn!(?peer, error = %e, "could not set socket timeouts");
        }

        let router = Arc::clone(&self.router);
        let max_bytes = self.config.max_request_bytes;

        let queued = self.pool.enqueue(move || {
            if let Err(e) = handle_connection(stream, &router, max_bytes) {
                warn!(?peer, error = %e, "connection aborted");
            }
        });

        match queued {
            Ok(()) => debug!(?peer, "connection queued"),
            // La tarea descartada cierra el socket sin respuesta
            Err(e) => warn!(?peer, error = %e, "connection dropped"),
        }
    }

    fn apply_timeouts(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_read_timeout(self.config.read_timeout())?;
        stream.set_write_timeout(self.config.write_timeout())
    }
}

/// Crea el socket de escucha: IPv4/IPv6 TCP, `SO_REUSEADDR`, bind y listen
fn bind_listener(addr: SocketAddr) -> AppResult<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(ServerError::CreateSocket)?;

    socket
        .set_reuse_address(true)
        .map_err(ServerError::ConfigureSocket)?;

    socket
        .bind(&addr.into())
        .map_err(|source| ServerError::Bind { addr, source })?;

    socket.listen(LISTEN_BACKLOG).map_err(ServerError::Listen)?;

    Ok(socket.into())
}

/// Atiende una conexión completa
///
/// Un error de lectura abandona la conexión sin responder. En cualquier caso
/// el socket se cierra al salir.
pub fn handle_connection(
    mut stream: TcpStream,
    router: &Router,
    max_bytes: usize,
) -> io::Result<()> {
    let start = Instant::now();

    let mut reader = RequestReader::new(max_bytes);
    reader.read_from(&mut stream)?;
    if reader.is_truncated() {
        warn!(
            peer = ?stream.peer_addr().ok(),
            limit = max_bytes,
            "request truncated at size limit"
        );
    }

    let bytes = reader.into_bytes();
    let request = Request::parse(&bytes);
    debug!(
        method = request.method(),
        path = request.path(),
        bytes = bytes.len(),
        "request received"
    );

    let response = router.route(&request);

    stream.write_all(response.to_wire_format().as_bytes())?;
    stream.flush()?;

    info!(
        method = request.method(),
        path = request.path(),
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "request served"
    );

    // El peer pudo haber cerrado ya; no es un error
    let _ = stream.shutdown(Shutdown::Both);
    Ok(())
}

/// Detiene el loop de accept de un [`Server`]
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    bound_addr: Arc<Mutex<Option<SocketAddr>>>,
}

impl ShutdownHandle {
    /// Marca el apagado y despierta al `accept` bloqueado
    pub fn shutdown(&self) {
        if self.flag.swap(true, Ordering::SeqCst) {
            return;
        }

        let bound = *self.bound_addr.lock();
        if let Some(addr) = bound {
            let wake = wake_address(addr);
            if let Err(e) = TcpStream::connect_timeout(&wake, Duration::from_secs(1)) {
                warn!(addr = %wake, error = %e, "could not wake accept loop");
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// `0.0.0.0` no es conectable: se usa loopback con el mismo puerto
fn wake_address(addr: SocketAddr) -> SocketAddr {
    match addr {
        SocketAddr::V4(v4) if v4.ip().is_unspecified() => {
            SocketAddr::from((Ipv4Addr::LOCALHOST, v4.port()))
        }
        SocketAddr::V6(v6) if v6.ip().is_unspecified() => {
            SocketAddr::from((std::net::Ipv6Addr::LOCALHOST, v6.port()))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StatusCode;
    use std::io::Read;
    use std::thread;

    fn ephemeral_listener() -> TcpListener {
        TcpListener::bind("127.0.0.1:0").unwrap()
    }

    /// Acepta una conexión y la atiende con `router` en otro thread
    fn serve_once(router: Router) -> (SocketAddr, thread::JoinHandle<io::Result<()>>) {
        serve_once_limited(router, 4096)
    }

    fn serve_once_limited(
        router: Router,
        max_bytes: usize,
    ) -> (SocketAddr, thread::JoinHandle<io::Result<()>>) {
        let listener = ephemeral_listener();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, &router, max_bytes)
        });
        (addr, handle)
    }

    fn exchange(addr: SocketAddr, raw: &[u8]) -> String {
        let mut client = TcpStream::connect(addr).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        client.write_all(raw).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[test]
    fn test_handle_connection_routes_request() {
        let router = Router::new();
        router.get("/hello", |_req, res| {
            res.set_status(200).send("Hello, World!");
        });
        let (addr, server) = serve_once(router);

        // Sin cerrar la escritura: el reader se detiene al completar headers
        let text = exchange(addr, b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n");

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with("\r\n\r\nHello, World!"));
        server.join().unwrap().unwrap();
    }

    #[test]
    fn test_handle_connection_not_found() {
        let (addr, server) = serve_once(Router::new());

        let text = exchange(addr, b"GET /missing HTTP/1.1\r\n\r\n");

        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.ends_with("Not Found"));
        server.join().unwrap().unwrap();
    }

    #[test]
    fn test_handle_connection_reads_body() {
        let router = Router::new();
        router.post("/echo", |req, res| {
            res.set_status(200).send(req.body());
        });
        let (addr, server) = serve_once(router);

        let text = exchange(
            addr,
            b"POST /echo HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello world",
        );

        assert!(text.ends_with("\r\n\r\nhello world"));
        server.join().unwrap().unwrap();
    }

    #[test]
    fn test_handle_connection_keeps_body_without_content_length() {
        let router = Router::new();
        router.post("/echo", |req, res| {
            res.set_status(200).send(&format!("[{}]", req.body()));
        });
        let (addr, server) = serve_once(router);

        let text = exchange(addr, b"POST /echo HTTP/1.1\r\nHost: x\r\n\r\nhello");

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"), "got: {}", text);
        assert!(text.ends_with("\r\n\r\n[hello]"), "got: {}", text);
        server.join().unwrap().unwrap();
    }

    #[test]
    fn test_handle_connection_answers_truncated_request() {
        let router = Router::new();
        router.post("/upload", |req, res| {
            res.set_status(200).send(&req.body().len().to_string());
        });
        let (addr, server) = serve_once_limited(router, 128);

        // Cabe en una sola lectura: el servidor consume todo antes de cerrar
        let head = "POST /upload HTTP/1.1\r\nContent-Length: 150\r\n\r\n";
        let raw = format!("{}{}", head, "x".repeat(150));
        let mut client = TcpStream::connect(addr).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        client.write_all(raw.as_bytes()).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        let text = String::from_utf8_lossy(&buf);

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"), "got: {}", text);
        let body_len: usize = text.rsplit("\r\n\r\n").next().unwrap().parse().unwrap();
        assert!(body_len < 128);
        server.join().unwrap().unwrap();
    }

    #[test]
    fn test_handle_connection_peer_closed_immediately() {
        // Un read vacío se parsea como request vacío y recibe 404
        let (addr, server) = serve_once(Router::new());

        drop(TcpStream::connect(addr).unwrap());

        // Escribir a un peer que ya cerró puede fallar o no; nunca debe colgarse
        let _ = server.join().unwrap();
    }

    #[test]
    fn test_bind_listener_reports_bind_error() {
        let occupied = ephemeral_listener();
        let addr = occupied.local_addr().unwrap();

        match bind_listener(addr) {
            Err(ServerError::Bind { addr: failed, .. }) => assert_eq!(failed, addr),
            other => panic!("expected bind error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_wake_address_uses_loopback() {
        let any: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        assert_eq!(wake_address(any), "127.0.0.1:9000".parse().unwrap());

        let local: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        assert_eq!(wake_address(local), local);
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.workers = Some(2);
        config.read_timeout_ms = 5_000;
        config
    }

    #[test]
    fn test_server_serves_and_shuts_down() {
        let server = Server::new(test_config());
        server.get("/ping", |_req, res| {
            res.set_status(200).send("pong");
        });
        let shutdown = server.shutdown_handle();
        let stats = server.stats_handle();
        let (tx, rx) = std::sync::mpsc::channel();

        let runner = thread::spawn(move || {
            let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
            server.listen_on(addr, |local| tx.send(local).unwrap())
        });

        let addr = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let text = exchange(addr, b"GET /ping HTTP/1.1\r\n\r\n");
        assert!(text.starts_with(&format!("HTTP/1.1 {}\r\n", StatusCode::OK)));
        assert!(text.ends_with("pong"));

        let deadline = Instant::now() + Duration::from_secs(5);
        while stats.stats().completed < 1 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(stats.stats().completed, 1);
        assert_eq!(stats.stats().workers, 2);

        shutdown.shutdown();
        assert!(shutdown.is_shutdown());
        assert!(runner.join().unwrap().is_ok());
    }

    #[test]
    fn test_shutdown_before_listen_returns_immediately() {
        let server = Server::new(test_config());
        server.shutdown_handle().shutdown();

        let (tx, rx) = std::sync::mpsc::channel();
        let runner = thread::spawn(move || {
            let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
            server.listen_on(addr, |local| tx.send(local).unwrap())
        });

        // on_start se invoca igual, pero no se llega a aceptar nada
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(runner.join().unwrap().is_ok());
    }
}

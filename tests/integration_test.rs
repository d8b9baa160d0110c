//! Tests de integración para el servidor HTTP
//! tests/integration_test.rs
//!
//! Cada test levanta su propio servidor en `127.0.0.1:0` dentro del proceso y
//! habla con él por TCP real.
//!
//! Para ejecutar:
//! cargo test --test integration_test

use poolhttp::config::Config;
use poolhttp::server::{Server, ShutdownHandle};
use poolhttp::workers::AdmissionPolicy;
use poolhttp::ServerError;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Servidor corriendo en otro thread
struct TestServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    runner: Option<JoinHandle<()>>,
}

impl TestServer {
    fn start(config: Config, setup: impl FnOnce(&Server)) -> Self {
        let server = Server::new(config);
        setup(&server);
        let shutdown = server.shutdown_handle();

        let (tx, rx) = mpsc::channel();
        let runner = thread::spawn(move || {
            let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
            server
                .listen_on(addr, |local| tx.send(local).unwrap())
                .expect("server failed");
        });

        let addr = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("server did not start");

        Self {
            addr,
            shutdown,
            runner: Some(runner),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(runner) = self.runner.take() {
            let _ = runner.join();
        }
    }
}

fn config(workers: usize) -> Config {
    let mut config = Config::default();
    config.workers = Some(workers);
    config.read_timeout_ms = 5_000;
    config.write_timeout_ms = 5_000;
    config
}

/// Rutas de la demo: `/hello` y `/goodbye`
fn demo_server() -> TestServer {
    TestServer::start(config(4), |server| {
        server.get("/hello", |_req, res| {
            res.set_status(200).send("Hello, World!");
        });
        server.get("/goodbye", |_req, res| {
            res.set_status(200).send("Goodbye, World!");
        });
    })
}

/// Helper: envía bytes crudos y retorna la response completa
fn send_raw(addr: SocketAddr, raw: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.set_write_timeout(Some(Duration::from_secs(5))).unwrap();

    stream.write_all(raw).unwrap();
    stream.flush().unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

/// Helper: envía un GET y retorna la response completa
fn send_request(addr: SocketAddr, path: &str) -> String {
    send_raw(addr, format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path).as_bytes())
}

/// Helper: extrae el body de una response HTTP
fn extract_body(response: &str) -> &str {
    match response.find("\r\n\r\n") {
        Some(pos) => &response[pos + 4..],
        None => "",
    }
}

#[test]
fn test_hello_endpoint() {
    let server = demo_server();
    let response = send_request(server.addr, "/hello");

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "got: {}", response);
    assert!(response.contains("Content-Type: text/plain\r\n"));
    assert!(response.contains("Content-Length: 13\r\n"));
    assert_eq!(extract_body(&response), "Hello, World!");
}

#[test]
fn test_not_found() {
    let server = demo_server();
    let response = send_request(server.addr, "/nonexistent");

    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(extract_body(&response), "Not Found");
}

#[test]
fn test_query_string_is_not_part_of_path() {
    let server = demo_server();
    let response = send_request(server.addr, "/goodbye?name=ana");

    assert_eq!(extract_body(&response), "Goodbye, World!");
}

#[test]
fn test_get_then_post_same_path_overwrites() {
    let server = TestServer::start(config(2), |server| {
        server.get("/same", |_req, res| {
            res.set_status(200).send("get");
        });
        server.post("/same", |_req, res| {
            res.set_status(200).send("post");
        });
    });

    let response = send_request(server.addr, "/same");
    assert_eq!(extract_body(&response), "post");
}

#[test]
fn test_routes_registered_after_start() {
    let mut router = None;
    let server = TestServer::start(config(2), |server| router = Some(server.router()));

    assert!(send_request(server.addr, "/late").contains("404 Not Found"));

    router.unwrap().get("/late", |_req, res| {
        res.set_status(200).send("registered");
    });
    assert_eq!(extract_body(&send_request(server.addr, "/late")), "registered");
}

#[test]
fn test_concurrent_requests_do_not_mix() {
    let server = demo_server();
    let addr = server.addr;

    let handles: Vec<_> = (0..20)
        .map(|i| {
            thread::spawn(move || {
                let (path, expected) = if i % 2 == 0 {
                    ("/hello", "Hello, World!")
                } else {
                    ("/goodbye", "Goodbye, World!")
                };
                let response = send_request(addr, path);
                assert_eq!(extract_body(&response), expected);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_requests_are_served_in_parallel() {
    // Dos handlers que sólo terminan si corren a la vez en workers distintos
    let barrier = Arc::new(Barrier::new(2));
    let server = TestServer::start(config(2), |server| {
        let barrier = Arc::clone(&barrier);
        server.get("/meet", move |_req, res| {
            barrier.wait();
            res.set_status(200).send("met");
        });
    });
    let addr = server.addr;

    let first = thread::spawn(move || send_request(addr, "/meet"));
    let second = thread::spawn(move || send_request(addr, "/meet"));

    assert_eq!(extract_body(&first.join().unwrap()), "met");
    assert_eq!(extract_body(&second.join().unwrap()), "met");
}

#[test]
fn test_body_sent_in_several_writes() {
    let server = TestServer::start(config(2), |server| {
        server.post("/echo", |req, res| {
            let name = req.header("X-Name").unwrap_or("none").to_string();
            res.set_status(200).send(&format!("{}:{}", name, req.body()));
        });
    });

    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    let parts: [&[u8]; 3] = [
        b"POST /echo HTTP/1.1\r\nX-Na",
        b"me: ana\r\nContent-Length: 10\r\n\r\nhello",
        b" body",
    ];
    for part in parts {
        stream.write_all(part).unwrap();
        stream.flush().unwrap();
        thread::sleep(Duration::from_millis(30));
    }

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    assert_eq!(extract_body(&response), "ana:hello body");
}

#[test]
fn test_send_file_missing_keeps_status() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("index.html");

    let server = TestServer::start(config(1), move |server| {
        server.get("/", move |_req, res| {
            res.set_status(200).send_file(&missing);
        });
    });

    let response = send_request(server.addr, "/");
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Content-Type: text/html\r\n"));
    assert_eq!(extract_body(&response), "File not found");
}

#[test]
fn test_stats_endpoint_reports_pool() {
    let server = TestServer::start(config(3), |server| {
        let stats = server.stats_handle();
        server.get("/stats", move |_req, res| {
            res.set_status(200).send_json_value(&stats.stats());
        });
    });

    let response = send_request(server.addr, "/stats");
    assert!(response.contains("Content-Type: application/json\r\n"));

    let stats: serde_json::Value = serde_json::from_str(extract_body(&response)).unwrap();
    assert_eq!(stats["workers"], 3);
    assert_eq!(stats["live_workers"], 3);
    assert_eq!(stats["rejected"], 0);
}

#[test]
fn test_reject_policy_drops_connection() {
    let mut config = config(1);
    config.queue_capacity = 1;
    config.admission = AdmissionPolicy::Reject;

    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let entered_tx = std::sync::Mutex::new(entered_tx);
    let release_rx = std::sync::Mutex::new(release_rx);

    let server = TestServer::start(config, move |server| {
        server.get("/slow", move |_req, res| {
            entered_tx.lock().unwrap().send(()).unwrap();
            let _ = release_rx.lock().unwrap().recv();
            res.set_status(200).send("slow");
        });
    });
    let addr = server.addr;

    // Ocupa al único worker
    let busy = thread::spawn(move || send_request(addr, "/slow"));
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // Llena la cola (capacidad 1)
    let mut queued = TcpStream::connect(addr).unwrap();
    queued.write_all(b"GET /missing HTTP/1.1\r\n\r\n").unwrap();
    thread::sleep(Duration::from_millis(100));

    // La tercera conexión se cierra sin respuesta (EOF o reset)
    let mut rejected = TcpStream::connect(addr).unwrap();
    rejected.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let _ = rejected.write_all(b"GET /missing HTTP/1.1\r\n\r\n");
    let mut unexpected = Vec::new();
    let _ = rejected.read_to_end(&mut unexpected);
    assert!(
        unexpected.is_empty(),
        "expected no response, got: {}",
        String::from_utf8_lossy(&unexpected)
    );

    release_tx.send(()).unwrap();
    assert_eq!(extract_body(&busy.join().unwrap()), "slow");

    let mut response = String::new();
    queued.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    queued.read_to_string(&mut response).unwrap();
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[test]
fn test_bind_error_on_occupied_port() {
    let occupied = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = occupied.local_addr().unwrap();

    let server = Server::new(config(1));
    let mut started = false;
    let result = server.listen_on(addr, |_| started = true);

    assert!(matches!(result, Err(ServerError::Bind { .. })));
    assert!(!started, "on_start must not run when bind fails");
}

#[test]
fn test_shutdown_stops_accept_loop() {
    let server = demo_server();
    let addr = server.addr;
    assert!(send_request(addr, "/hello").contains("200 OK"));

    drop(server);

    // Después del apagado nadie acepta en ese puerto
    assert!(TcpStream::connect_timeout(&addr, Duration::from_millis(500)).is_err());
}

#[test]
fn test_listen_on_port_fires_on_start_once() {
    // Puerto libre: se reserva y se suelta antes de escuchar en 0.0.0.0
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let server = Server::new(config(2));
    server.get("/hello", |_req, res| {
        res.set_status(200).send("Hello, World!");
    });
    let shutdown = server.shutdown_handle();

    let started = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();
    let runner = {
        let started = Arc::clone(&started);
        thread::spawn(move || {
            server.listen(port, move || {
                started.fetch_add(1, Ordering::SeqCst);
                tx.send(()).unwrap();
            })
        })
    };
    rx.recv_timeout(Duration::from_secs(5))
        .expect("server did not start");

    let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let response = send_request(addr, "/hello");
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "got: {}", response);
    assert_eq!(extract_body(&response), "Hello, World!");

    // Escucha en 0.0.0.0: el despertar tiene que ir por loopback
    shutdown.shutdown();
    assert!(runner.join().unwrap().is_ok());
    assert_eq!(started.load(Ordering::SeqCst), 1);
}

//! # poolhttp - Entry Point
//! src/main.rs
//!
//! Punto de entrada del servidor de demostración.
//!
//! Rutas registradas:
//! - `/`        sirve `index.html` desde `--static-dir`
//! - `/hello`   registra un evento en cada nivel y saluda
//! - `/goodbye` se despide
//! - `/stats`   estado del pool de workers en JSON

use poolhttp::config::Config;
use poolhttp::logging;
use poolhttp::server::Server;
use tracing::{debug, error, info, trace, warn};

fn main() {
    let config = Config::new();

    if let Err(e) = config.validate() {
        eprintln!("💥 Configuración inválida: {}", e);
        std::process::exit(2);
    }

    // El guard debe vivir hasta el final para vaciar el log a archivo
    let _log_guard = match logging::init(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("💥 Error al iniciar logging: {}", e);
            std::process::exit(1);
        }
    };

    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, "invalid listen address");
            std::process::exit(1);
        }
    };

    let server = Server::new(config);
    register_routes(&server);

    let result = server.listen_on(addr, |local| {
        info!(addr = %local, "Server started.");
    });

    if let Err(e) = result {
        error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

fn register_routes(server: &Server) {
    let index = server.config().static_dir.join("index.html");
    server.get("/", move |_req, res| {
        res.set_status(200).send_file(&index);
    });

    server.get("/hello", |_req, res| {
        trace!("Entering /hello endpoint");
        debug!("Debugging /hello endpoint");
        info!("Handling hello request");
        warn!("This is a warning for /hello");
        error!("An error occurred while processing /hello");
        error!("Critical issue in /hello!");

        res.set_status(200).send("Hello, World!");
    });

    server.get("/goodbye", |_req, res| {
        res.set_status(200).send("Goodbye, World!");
    });

    let stats = server.stats_handle();
    server.get("/stats", move |_req, res| {
        res.set_status(200).send_json_value(&stats.stats());
    });
}

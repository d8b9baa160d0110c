//! # Logging
//! src/logging.rs
//!
//! Configura el subscriber global de `tracing`:
//!
//! - Capa de consola con timestamp local, nombre/id del thread y línea
//! - Capa de archivo opcional (`--log-dir`) con rotación y escritura no
//!   bloqueante a través de `tracing-appender`
//! - Filtro de niveles con la sintaxis de `EnvFilter` (`--log-level`)
//!
//! El código de la librería sólo emite eventos con las macros de `tracing`;
//! sólo el binario llama a [`init`].

use crate::config::{Config, LogRotation};
use crate::error::{AppResult, ServerError};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Prefijo de los archivos de log
pub const LOG_FILE_PREFIX: &str = "poolhttp.log";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Mantiene vivo el writer no bloqueante
///
/// Al soltarlo se vacían los eventos pendientes al archivo. Debe vivir hasta
/// el final de `main`.
#[must_use = "dropping the guard stops the file writer"]
pub struct LogGuard {
    file_writer: Option<WorkerGuard>,
}

impl LogGuard {
    pub fn writes_to_file(&self) -> bool {
        self.file_writer.is_some()
    }
}

/// Instala el subscriber global
///
/// Falla si el nivel es inválido, si no se puede crear el directorio de logs
/// o si ya había un subscriber global instalado.
pub fn init(config: &Config) -> AppResult<LogGuard> {
    let filter = parse_filter(&config.log_level)?;

    let console_layer = fmt::layer()
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_target(true)
        .with_thread_names(true)
        .with_thread_ids(true)
        .with_line_number(true);

    let (file_layer, file_writer) = match &config.log_dir {
        Some(dir) => {
            let appender = file_appender(dir, config.log_rotation)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                .with_thread_names(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ServerError::Logging(e.to_string()))?;

    Ok(LogGuard { file_writer })
}

/// Convierte `--log-level` en un filtro
pub fn parse_filter(level: &str) -> AppResult<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| ServerError::Logging(format!("invalid log level '{}': {}", level, e)))
}

fn file_appender(dir: &Path, rotation: LogRotation) -> AppResult<RollingFileAppender> {
    fs::create_dir_all(dir).map_err(|e| {
        ServerError::Logging(format!("could not create {}: {}", dir.display(), e))
    })?;

    let appender = match rotation {
        LogRotation::Minutely => rolling::minutely(dir, LOG_FILE_PREFIX),
        LogRotation::Hourly => rolling::hourly(dir, LOG_FILE_PREFIX),
        LogRotation::Daily => rolling::daily(dir, LOG_FILE_PREFIX),
        LogRotation::Never => rolling::never(dir, LOG_FILE_PREFIX),
    };
    Ok(appender)
}

//! # Static HTTP Server - Entry Point
//! src/main.rs
//!
//! Uso: `static_httpd <port> <root>`. `root` puede ser un directorio o un zip.

use static_httpd::config::Config;
use static_httpd::logging;
use static_httpd::server::Server;
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    // Argumentos faltantes o inválidos: clap imprime el uso y sale con error
    let config = Config::new();
    logging::init();

    if let Err(e) = config.validate() {
        error!("configuración inválida: {}", e);
        return ExitCode::FAILURE;
    }

    let mut server = match Server::new(config.port, &config.root) {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    server.set_read_timeout(config.read_timeout());

    info!(
        port = server.port(),
        root = %server.root().display(),
        backend = server.mode().name(),
        read_timeout_ms = config.read_timeout_ms,
        "iniciando servidor"
    );

    if let Err(e) = server.start() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    // El listener solo termina si falla el bind o si alguien llama stop()
    server.wait();
    let failed = server.is_running();
    server.stop();

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

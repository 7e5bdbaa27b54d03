//! # Logging
//! src/logging.rs
//!
//! Inicializa el subscriber de `tracing`. El nivel se controla con
//! `RUST_LOG` (p. ej. `RUST_LOG=static_httpd=debug`); por defecto `info`.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Instala el subscriber global de formato texto
///
/// Retorna `false` si ya había uno instalado (p. ej. en tests).
pub fn init() -> bool {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}

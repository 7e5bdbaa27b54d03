//! # Configuración del Servidor
//! src/config.rs
//!
//! Argumentos de línea de comandos, con variable de entorno para el timeout.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./static_httpd 8080 ./public
//! ./static_httpd 8080 ./site.zip --read-timeout-ms 5000
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTPD_READ_TIMEOUT_MS=5000 ./static_httpd 8080 ./public
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Configuración del servidor de contenido estático
#[derive(Debug, Clone, Parser)]
#[command(name = "static_httpd")]
#[command(about = "Servidor HTTP/1.0 de contenido estático (directorio o zip)")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    pub port: u16,

    /// Directorio o archivo zip que se sirve
    pub root: PathBuf,

    /// Timeout de lectura de cada cliente en milisegundos
    #[arg(long = "read-timeout-ms", default_value = "60000", env = "HTTPD_READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,
}

impl Config {
    /// Crea la configuración parseando los argumentos del proceso
    pub fn new() -> Self {
        Config::parse()
    }

    /// Timeout de lectura como `Duration`
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.read_timeout_ms == 0 {
            return Err("Read timeout must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            root: PathBuf::from("."),
            read_timeout_ms: 60_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.root, PathBuf::from("."));
        assert_eq!(config.read_timeout(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_positional_args() {
        let config = Config::try_parse_from(["static_httpd", "3000", "/srv/www"]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.root, PathBuf::from("/srv/www"));
    }

    #[test]
    fn test_parse_read_timeout_flag() {
        let config = Config::try_parse_from([
            "static_httpd",
            "3000",
            "site.zip",
            "--read-timeout-ms",
            "250",
        ])
        .unwrap();
        assert_eq!(config.read_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_missing_arguments_is_error() {
        assert!(Config::try_parse_from(["static_httpd"]).is_err());
        assert!(Config::try_parse_from(["static_httpd", "8080"]).is_err());
    }

    #[test]
    fn test_invalid_port_is_error() {
        assert!(Config::try_parse_from(["static_httpd", "http", "."]).is_err());
        assert!(Config::try_parse_from(["static_httpd", "70000", "."]).is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.read_timeout_ms = 0;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Read timeout"));
    }
}

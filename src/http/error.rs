//! # Errores HTTP
//! src/http/error.rs
//!
//! Cada fallo de una conexión termina como uno de estos errores. El
//! handler los propaga con `?` hasta un único punto donde se escribe la
//! respuesta de error (status line + body de texto plano).

use super::StatusCode;
use std::io;
use thiserror::Error;

/// Error visible para el cliente: código, reason phrase y detalle
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request line malformada, versión no soportada, path que escapa
    /// de la raíz o path decodificado inválido
    #[error("{0}")]
    BadRequest(String),

    /// Método distinto de GET
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// No hay recurso para el path pedido
    #[error("Not Found")]
    NotFound,

    /// No llegó ningún dato antes del timeout de lectura
    #[error("{0}")]
    RequestTimeout(String),

    /// Cualquier otro error de I/O leyendo el request o resolviendo el recurso
    #[error("{0}")]
    InternalServerError(String),
}

impl HttpError {
    /// Atajo para un 400 con detalle
    pub fn bad_request(detail: impl Into<String>) -> Self {
        HttpError::BadRequest(detail.into())
    }

    /// Código de estado que se envía al cliente
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::BadRequest(_) => StatusCode::BadRequest,
            HttpError::MethodNotAllowed => StatusCode::MethodNotAllowed,
            HttpError::NotFound => StatusCode::NotFound,
            HttpError::RequestTimeout(_) => StatusCode::RequestTimeout,
            HttpError::InternalServerError(_) => StatusCode::InternalServerError,
        }
    }

    /// Texto del body de la respuesta de error
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

impl From<io::Error> for HttpError {
    /// Un read con `SO_RCVTIMEO` vencido se reporta como `WouldBlock` en
    /// Unix y `TimedOut` en Windows; ambos son un 408.
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                HttpError::RequestTimeout(format!("Read timed out: {}", err))
            }
            _ => HttpError::InternalServerError(err.to_string()),
        }
    }
}

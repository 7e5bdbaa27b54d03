//! # Módulo HTTP
//!
//! Lo mínimo de HTTP/1.0 que necesita un servidor de archivos estáticos:
//!
//! - Lectura de la request line (los headers se descartan)
//! - Decodificación `%XX` del target en ISO-8859-1
//! - Respuestas 200 con body en streaming y errores de texto plano
//! - Códigos de estado y errores tipados
//!
//! No hay conexiones persistentes: toda respuesta lleva `Connection: close`.

pub mod error;     // Errores que terminan en una respuesta de error
pub mod request;   // Request line y headers
pub mod response;  // Framing de respuestas
pub mod status;    // Códigos de estado HTTP

pub use error::HttpError;
pub use request::{Method, Request};
pub use response::Response;
pub use status::StatusCode;

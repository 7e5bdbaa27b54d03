//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Todas las respuestas son HTTP/1.0 y cierran la conexión. Hay dos formas:
//!
//! ```text
//! HTTP/1.0 200 OK\r\n                      HTTP/1.0 404 Not Found\r\n
//! Content-Length: 1234\r\n                 Content-Length: 9\r\n
//! Date: Tue, 15 Nov 1994 08:12:31 GMT\r\n  Content-Type: text/plain; charset=ISO-8859-1\r\n
//! Last-Modified: ...\r\n                   Cache-Control: private, max-age=0\r\n
//! Cache-Control: private, max-age=0\r\n    Connection: close\r\n
//! Connection: close\r\n                    Server: httpd\r\n
//! Server: httpd\r\n                        \r\n
//! \r\n                                     Not Found
//! <contenido del archivo>
//! ```
//!
//! En el caso 200 el body no se guarda en la respuesta: se copia desde el
//! stream del recurso con [`copy_body`].

use super::{HttpError, StatusCode};
use std::io::{self, Read, Write};
use std::time::SystemTime;

/// Tamaño de cada bloque copiado al socket
pub const BUFF_LEN: usize = 8192;

const CACHE_CONTROL: &str = "private, max-age=0";
const SERVER_NAME: &str = "httpd";

/// Status line + headers (+ body para errores)
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,

    /// Headers en el orden en que se escriben
    headers: Vec<(String, String)>,

    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Agrega un header (builder)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Agrega un header a una respuesta existente
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// Headers fijos que llevan todas las respuestas
    fn with_fixed_headers(self) -> Self {
        self.with_header("Cache-Control", CACHE_CONTROL)
            .with_header("Connection", "close")
            .with_header("Server", SERVER_NAME)
    }

    /// Cabecera de un 200 cuyo body se envía aparte
    ///
    /// `Last-Modified` se omite si no se conoce la fecha.
    pub fn file(length: u64, last_modified: Option<SystemTime>) -> Self {
        let mut response = Self::new(StatusCode::Ok)
            .with_header("Content-Length", &length.to_string())
            .with_header("Date", &httpdate::fmt_http_date(SystemTime::now()));

        if let Some(mtime) = last_modified {
            response.add_header("Last-Modified", &httpdate::fmt_http_date(mtime));
        }

        response.with_fixed_headers()
    }

    /// Respuesta de error con el detalle como body de texto plano
    ///
    /// # Ejemplo
    /// ```
    /// use static_httpd::http::{HttpError, Response, StatusCode};
    ///
    /// let response = Response::error(&HttpError::NotFound);
    /// assert_eq!(response.status(), StatusCode::NotFound);
    /// assert_eq!(response.body(), b"Not Found");
    /// ```
    pub fn error(err: &HttpError) -> Self {
        let body = latin1_bytes(&err.detail());

        Self::new(err.status())
            .with_header("Content-Length", &body.len().to_string())
            .with_header("Content-Type", "text/plain; charset=ISO-8859-1")
            .with_fixed_headers()
            .with_body_bytes(body)
    }

    /// Establece el body (no toca `Content-Length`)
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Serializa status line, headers, línea vacía y body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(256 + self.body.len());

        // 1. Status line
        result.extend_from_slice(format!("HTTP/1.0 {}\r\n", self.status).as_bytes());

        // 2. Headers
        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        // 3. Línea vacía que separa headers del body
        result.extend_from_slice(b"\r\n");

        // 4. Body (si existe)
        result.extend_from_slice(&self.body);

        result
    }

    /// Obtiene el código de estado de la respuesta
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Obtiene una referencia a los headers
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Busca un header por nombre exacto
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Obtiene una referencia al body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Copia el stream completo al socket en bloques de [`BUFF_LEN`]
///
/// Retorna la cantidad de bytes copiados.
pub fn copy_body<R: Read + ?Sized, W: Write + ?Sized>(src: &mut R, dst: &mut W) -> io::Result<u64> {
    let mut buf = [0u8; BUFF_LEN];
    let mut total = 0u64;

    loop {
        let len = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(len) => len,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        dst.write_all(&buf[..len])?;
        total += len as u64;
    }

    dst.flush()?;
    Ok(total)
}

/// Codifica texto como ISO-8859-1; lo que no entra en un byte es '?'
fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

//! # Parsing de Requests HTTP/1.0
//! src/http/request.rs
//!
//! Solo interesa la request line; los headers se leen y se descartan.
//!
//! ```text
//! GET /docs/index.html HTTP/1.0\r\n
//! Host: localhost:8080\r\n        <- ignorado
//! \r\n
//! ```
//!
//! Las líneas se decodifican como ISO-8859-1 (un byte = un char), igual
//! que el target después de `%XX`. Un path UTF-8 codificado con varios
//! `%XX` queda como varios chars Latin-1, no como un char UTF-8.

use super::HttpError;
use percent_encoding::percent_decode;
use std::io::{BufRead, Read};

/// Largo máximo de una línea (request line o header)
pub const MAX_LINE_LEN: usize = 8192;

/// Métodos HTTP reconocidos
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - El único método que se sirve
    GET,

    /// Cualquier otro token; se responde 405
    Other(String),
}

impl Method {
    fn from_token(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            other => Method::Other(other.to_string()),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::Other(m) => m,
        }
    }
}

/// Request ya parseado. Existe solo mientras dura la conexión.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Target tal como llegó; se decodifica recién al resolver
    target: String,

    version: String,
}

impl Request {
    /// Parsea la request line `METHOD TARGET VERSION`
    ///
    /// Se separa por espacios simples; con menos de tres tokens la línea
    /// es inválida. Los tokens sobrantes se ignoran.
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use static_httpd::http::Request;
    ///
    /// let request = Request::parse_request_line("GET /a%20b.txt HTTP/1.0").unwrap();
    /// assert_eq!(request.target(), "/a%20b.txt");
    /// assert_eq!(request.decoded_target().unwrap(), "/a b.txt");
    /// assert_eq!(request.version(), "HTTP/1.0");
    /// ```
    pub fn parse_request_line(line: &str) -> Result<Self, HttpError> {
        let parts: Vec<&str> = line.split(' ').collect();

        if parts.len() < 3 {
            return Err(HttpError::bad_request(format!(
                "Malformed request line: {}",
                line
            )));
        }

        Ok(Request {
            method: Method::from_token(parts[0]),
            target: parts[1].to_string(),
            version: parts[2].to_string(),
        })
    }

    /// Valida versión y método, en ese orden
    ///
    /// Una versión desconocida es 400 aunque el método tampoco sea GET.
    pub fn validate(&self) -> Result<(), HttpError> {
        if self.version != "HTTP/1.0" && self.version != "HTTP/1.1" {
            return Err(HttpError::bad_request(format!(
                "Unsupported HTTP version: {}",
                self.version
            )));
        }
        if self.method != Method::GET {
            return Err(HttpError::MethodNotAllowed);
        }
        Ok(())
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Obtiene el target sin decodificar
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Decodifica el target; solo tiene sentido después de `validate()`
    pub fn decoded_target(&self) -> Result<String, HttpError> {
        decode_target(&self.target)
    }

    /// Obtiene la versión HTTP
    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Lee una línea terminada en `\n` (sin el `\r\n`)
///
/// Retorna `Ok(None)` si el peer cerró antes de enviar un byte.
pub fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, HttpError> {
    let mut buf = Vec::new();
    let n = reader
        .by_ref()
        .take(MAX_LINE_LEN as u64 + 1)
        .read_until(b'\n', &mut buf)?;

    if n == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if buf.len() > MAX_LINE_LEN {
        return Err(HttpError::bad_request("Line too long"));
    }

    Ok(Some(latin1_to_string(&buf)))
}

/// Lee y descarta headers hasta la línea vacía
///
/// Un EOF antes de la línea vacía también cierra el bloque de headers.
pub fn skip_headers<R: BufRead>(reader: &mut R) -> Result<(), HttpError> {
    while let Some(line) = read_line(reader)? {
        if line.is_empty() {
            break;
        }
    }
    Ok(())
}

/// Decodifica el target byte a byte como ISO-8859-1
///
/// `%XX` produce el char U+00XX y `+` produce un espacio. Un `%` que no
/// va seguido de dos dígitos hex es un 400.
pub fn decode_target(raw: &str) -> Result<String, HttpError> {
    let bytes: Vec<u8> = raw
        .chars()
        .map(|c| if c == '+' { b' ' } else { latin1_byte(c) })
        .collect();

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(HttpError::bad_request(format!(
                    "Malformed escape in request target: {}",
                    raw
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    Ok(percent_decode(&bytes).map(char::from).collect())
}

fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Chars fuera de Latin-1 no pueden venir del socket; se reemplazan por '?'
fn latin1_byte(c: char) -> u8 {
    u8::try_from(u32::from(c)).unwrap_or(b'?')
}

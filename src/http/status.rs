//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Códigos que el servidor puede emitir. Solo hay un caso de éxito
//! (200 OK); el resto son los errores que se envían al cliente con un
//! cuerpo de texto plano.
//!
//! - **2xx**: Éxito (200)
//! - **4xx**: Error del cliente (400, 404, 405, 408)
//! - **5xx**: Error del servidor (500)

/// Representa los códigos de estado HTTP que soporta nuestro servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK - El recurso se encontró y se envía en el body
    Ok = 200,

    /// 400 Bad Request - Request line malformada, versión no soportada
    /// o path que escapa de la raíz
    BadRequest = 400,

    /// 404 Not Found - No existe el archivo o la entrada del zip
    NotFound = 404,

    /// 405 Method Not Allowed - Cualquier método distinto de GET
    MethodNotAllowed = 405,

    /// 408 Request Timeout - El cliente no envió nada antes del timeout
    RequestTimeout = 408,

    /// 500 Internal Server Error - Cualquier otro fallo de I/O
    InternalServerError = 500,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use static_httpd::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    ///
    /// # Ejemplo
    /// ```
    /// use static_httpd::http::StatusCode;
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }

    /// Verifica si el código indica error del cliente (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    /// Verifica si el código indica error del servidor (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

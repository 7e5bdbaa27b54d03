//! # Static HTTP Server
//! src/lib.rs
//!
//! Servidor HTTP/1.0 mínimo de contenido estático. Sirve archivos desde un
//! directorio o desde un archivo zip, un request por conexión, con un thread
//! por conexión tomado de un pool que crece bajo demanda.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: Parsing del request line y armado de respuestas HTTP/1.0
//! - `resolver`: Traduce un path a un recurso (directorio o zip)
//! - `zip`: Lectura del directorio central y de entradas de un zip
//! - `server`: Listener TCP, pool de workers y manejo de conexiones
//! - `config`: Argumentos de línea de comandos
//! - `logging`: Inicialización de `tracing`
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use static_httpd::server::Server;
//!
//! let mut server = Server::new(8080, "./public").expect("raíz inválida");
//! server.start().expect("no se pudo iniciar");
//! // ...
//! server.stop();
//! ```

pub mod config;
pub mod http;
pub mod logging;
pub mod resolver;
pub mod server;
pub mod zip;

//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto (thread del listener)
//! 2. Acepta conexiones y las entrega al pool de workers
//! 3. Cada worker lee el request, resuelve el recurso y responde
//! 4. Cierra la conexión (un request por conexión)

pub mod connection;
pub mod pool;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use pool::WorkerPool;
pub use tcp::{Server, ServerError};

//! Lectura de archivos ZIP.
//!
//! - [`structures`]: registros del formato (EOCD, ZIP64, entradas)
//! - [`parser`]: parsing del Central Directory con lecturas posicionales
//! - [`reader`]: stream del contenido de una entrada
//!
//! ## Soportado
//!
//! - Formato estándar (PKZIP APPNOTE 6.3.x) y extensiones ZIP64
//! - Métodos STORED y DEFLATE
//!
//! ## Limitaciones
//!
//! - Sin cifrado, sin archivos multi-disco
//! - Los nombres se leen como UTF-8 (con reemplazo si no lo son)

mod parser;
mod reader;
mod structures;

pub use parser::ZipParser;
pub use reader::EntryReader;
pub use structures::*;

use std::io;
use thiserror::Error;

/// Errores al abrir o leer un zip
#[derive(Debug, Error)]
pub enum ZipError {
    #[error("I/O error reading zip archive: {0}")]
    Io(#[from] io::Error),

    #[error("Not a valid ZIP file")]
    NotAZip,

    #[error("Invalid {0}")]
    InvalidRecord(&'static str),

    #[error("Unsupported compression method: {0}")]
    UnsupportedCompression(u16),
}

impl From<ZipError> for io::Error {
    fn from(err: ZipError) -> Self {
        match err {
            ZipError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

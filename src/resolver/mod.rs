//! # Resolución de Recursos
//! src/resolver/mod.rs
//!
//! El servidor elige un backend una sola vez, al construirse:
//!
//! ```text
//!                  ┌─ Directory(raíz) → archivo canónico debajo de la raíz
//! path decodificado┤
//!                  └─ Archive(zip)    → entrada del zip
//! ```
//!
//! Ambos sustituyen `index.html` cuando el path es un directorio.

pub mod archive;
pub mod directory;

pub use archive::ArchiveHandle;

use crate::http::HttpError;
use crate::zip::ZipError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Nombre que se sirve cuando el path pedido es un directorio
pub const DIRECTORY_INDEX: &str = "index.html";

/// Recurso encontrado, listo para enviarse
///
/// El handler de la conexión es dueño del stream y lo libera al terminar.
pub struct Resolved {
    pub body: Box<dyn Read + Send>,
    pub length: u64,
    pub last_modified: Option<SystemTime>,
}

/// Backend activo del servidor; no cambia durante su vida
pub enum ResolverMode {
    Directory(PathBuf),
    Archive(ArchiveHandle),
}

impl ResolverMode {
    /// Decide el backend inspeccionando `root` (ya canónico)
    ///
    /// Un archivo regular con firma zip abre el archivo; cualquier otra cosa
    /// se trata como directorio, exista o no.
    pub fn probe(root: &Path) -> Result<Self, ZipError> {
        if root.is_file() && ArchiveHandle::is_zip(root)? {
            return Ok(ResolverMode::Archive(ArchiveHandle::open(root)?));
        }
        Ok(ResolverMode::Directory(root.to_path_buf()))
    }

    /// Resuelve un path ya decodificado con el backend activo
    pub fn resolve(&self, path: &str) -> Result<Resolved, HttpError> {
        match self {
            ResolverMode::Directory(root) => directory::resolve(root, path),
            ResolverMode::Archive(handle) => handle.resolve(path),
        }
    }

    /// Verifica si el backend es un zip
    pub fn is_archive(&self) -> bool {
        matches!(self, ResolverMode::Archive(_))
    }

    /// Nombre corto para logs
    pub fn name(&self) -> &'static str {
        match self {
            ResolverMode::Directory(_) => "directory",
            ResolverMode::Archive(_) => "archive",
        }
    }
}

/// Separa el path en segmentos resolviendo `.` y `..`
///
/// Un `..` que sube por encima de la raíz, o un byte NUL, es un 400.
pub(crate) fn normalize_segments(path: &str) -> Result<Vec<&str>, HttpError> {
    let mut segments = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(HttpError::bad_request("Path escapes document root"));
                }
            }
            s if s.contains('\0') => {
                return Err(HttpError::bad_request("Malformed path in request target"));
            }
            s => segments.push(s),
        }
    }

    Ok(segments)
}

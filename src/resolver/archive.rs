//! # Resolución dentro de un archivo zip
//! src/resolver/archive.rs
//!
//! El Central Directory se lee una sola vez al abrir el archivo. Después,
//! cada request hace lookups en memoria y lecturas posicionales sobre el
//! mismo `File`, compartido entre todas las conexiones.

use super::{normalize_segments, Resolved, DIRECTORY_INDEX};
use crate::http::HttpError;
use crate::zip::{EntryReader, ZipError, ZipFileEntry, ZipParser, LFH_SIGNATURE};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Resultado de buscar un nombre en el archivo
#[derive(Debug)]
pub enum Lookup<'a> {
    File(&'a ZipFileEntry),
    Directory,
}

/// Handle abierto sobre el zip que respalda al servidor
///
/// Vive lo mismo que el `Server` y se cierra una sola vez en `stop()`.
pub struct ArchiveHandle {
    path: PathBuf,

    /// `None` después de `close()`
    file: Mutex<Option<Arc<File>>>,

    /// Entradas de archivo por nombre completo
    entries: HashMap<String, ZipFileEntry>,

    /// Directorios explícitos ("a/") e implícitos (prefijos de otras entradas), sin '/' final
    directories: HashSet<String>,
}

impl ArchiveHandle {
    /// Verifica la firma `50 4B 03 04` en los primeros 4 bytes
    ///
    /// Un archivo más corto que la firma no es un zip.
    pub fn is_zip(path: &Path) -> io::Result<bool> {
        let mut signature = [0u8; 4];
        let mut file = File::open(path)?;
        let mut read = 0;
        while read < signature.len() {
            match file.read(&mut signature[read..])? {
                0 => return Ok(false),
                n => read += n,
            }
        }
        Ok(signature == LFH_SIGNATURE)
    }

    /// Abre el zip y carga su Central Directory
    pub fn open(path: &Path) -> Result<Self, ZipError> {
        let file = File::open(path)?;
        let listed = ZipParser::new(&file)?.list_files()?;

        let mut entries = HashMap::new();
        let mut directories = HashSet::new();
        for entry in listed {
            let name = entry.file_name.trim_end_matches('/').to_string();

            // Todos los prefijos "a", "a/b" de "a/b/c" son directorios
            let mut prefix_end = name.rfind('/');
            while let Some(end) = prefix_end {
                if !directories.insert(name[..end].to_string()) {
                    break;
                }
                prefix_end = name[..end].rfind('/');
            }

            if entry.is_directory {
                directories.insert(name);
            } else {
                entries.insert(entry.file_name.clone(), entry);
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(Some(Arc::new(file))),
            entries,
            directories,
        })
    }

    /// Busca una entrada por nombre normalizado (sin '/' inicial)
    pub fn lookup(&self, name: &str) -> Option<Lookup<'_>> {
        if let Some(entry) = self.entries.get(name) {
            return Some(Lookup::File(entry));
        }
        let dir = name.trim_end_matches('/');
        if dir.is_empty() || self.directories.contains(dir) {
            return Some(Lookup::Directory);
        }
        None
    }

    /// Abre un stream sobre el contenido de una entrada
    pub fn open_entry(&self, entry: &ZipFileEntry) -> io::Result<EntryReader> {
        let file = self
            .file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "zip archive is closed"))?;

        Ok(EntryReader::open(file, entry)?)
    }

    /// Resuelve un path (ya decodificado) a una entrada del zip
    ///
    /// Un path vacío o terminado en '/' pide `<path>/index.html`; si el
    /// nombre es un directorio se reintenta con `<path>/index.html`.
    pub fn resolve(&self, path: &str) -> Result<Resolved, HttpError> {
        let name = map_entry_name(path)?;

        let found = match self.lookup(&name) {
            Some(Lookup::Directory) => self.lookup(&format!("{}/{}", name, DIRECTORY_INDEX)),
            other => other,
        };

        let entry = match found {
            Some(Lookup::File(entry)) => entry,
            _ => {
                debug!(name = %name, "entrada no encontrada en el zip");
                return Err(HttpError::NotFound);
            }
        };

        let body = self.open_entry(entry)?;

        Ok(Resolved {
            body: Box::new(body),
            length: entry.uncompressed_size,
            // La fecha es la del zip, no la de cada entrada
            last_modified: std::fs::metadata(&self.path).and_then(|m| m.modified()).ok(),
        })
    }

    /// Cierra el archivo; retorna `true` solo la primera vez
    ///
    /// Los streams ya abiertos conservan su propia referencia al `File`.
    pub fn close(&self) -> bool {
        self.file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// Verifica si el handle ya fue cerrado
    pub fn is_closed(&self) -> bool {
        self.file.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    /// Cantidad de entradas de archivo (sin directorios)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Verifica si el zip no tiene archivos
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ruta del zip
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Normaliza el path y le aplica el índice de directorio
///
/// `"/"` → `"index.html"`, `"/docs/"` → `"docs/index.html"`,
/// `"/a/./b/../c.txt"` → `"a/c.txt"`.
fn map_entry_name(path: &str) -> Result<String, HttpError> {
    let name = normalize_segments(path)?.join("/");

    if name.is_empty() {
        Ok(DIRECTORY_INDEX.to_string())
    } else if path.ends_with('/') {
        Ok(format!("{}/{}", name, DIRECTORY_INDEX))
    } else {
        Ok(name)
    }
}

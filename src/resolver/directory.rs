//! # Resolución en el sistema de archivos
//! src/resolver/directory.rs
//!
//! El path pedido se une a la raíz resolviendo `.` y `..` léxicamente, y
//! después se canonicaliza (symlinks). Si en cualquiera de los dos pasos el
//! resultado no queda debajo de la raíz canónica la respuesta es 400, sin
//! importar si el destino existe. La verificación se repite después de sustituir
//! `index.html`, porque ese archivo también puede ser un symlink.

use super::{Resolved, DIRECTORY_INDEX};
use crate::http::HttpError;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Resuelve `path` (ya decodificado) debajo de `root` (canónico)
pub fn resolve(root: &Path, path: &str) -> Result<Resolved, HttpError> {
    let joined = lexical_join(root, path)?;

    let mut target = contained(root, &joined)?;
    if target.is_dir() {
        target = contained(root, &target.join(DIRECTORY_INDEX))?;
    }

    if !target.is_file() {
        debug!(path = %target.display(), "no es un archivo regular");
        return Err(HttpError::NotFound);
    }

    let file = File::open(&target)?;
    let metadata = file.metadata()?;

    Ok(Resolved {
        length: metadata.len(),
        last_modified: metadata.modified().ok(),
        body: Box::new(file),
    })
}

/// Une `path` a `root` resolviendo `.` y `..` sin tocar el disco
///
/// Un `..` puede subir por encima de la raíz y volver a entrar
/// (`/../www/a.txt`); solo importa dónde termina.
fn lexical_join(root: &Path, path: &str) -> Result<PathBuf, HttpError> {
    let mut joined = root.to_path_buf();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                joined.pop();
            }
            s if s.contains('\0') => {
                return Err(HttpError::bad_request("Malformed path in request target"));
            }
            s => joined.push(s),
        }
    }

    if !joined.starts_with(root) {
        warn!(path = %joined.display(), "path fuera de la raíz");
        return Err(HttpError::bad_request("Path escapes document root"));
    }
    Ok(joined)
}

/// Canonicaliza `path` y verifica que siga debajo de `root`
///
/// Un path que no se puede canonicalizar (no existe, o un componente
/// intermedio no es directorio) es un 404.
fn contained(root: &Path, path: &Path) -> Result<PathBuf, HttpError> {
    let canonical = match path.canonicalize() {
        Ok(canonical) => canonical,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no se pudo canonicalizar");
            return Err(HttpError::NotFound);
        }
    };

    if !canonical.starts_with(root) {
        warn!(path = %canonical.display(), "path fuera de la raíz");
        return Err(HttpError::bad_request("Path escapes document root"));
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;

    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("www");
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("hello.txt"), b"hello world").unwrap();
        fs::write(root.join("docs/index.html"), b"<h1>docs</h1>").unwrap();
        fs::write(dir.path().join("secret.txt"), b"top secret").unwrap();
        let root = root.canonicalize().unwrap();
        (dir, root)
    }

    fn body_of(mut resolved: Resolved) -> Vec<u8> {
        let mut body = Vec::new();
        resolved.body.read_to_end(&mut body).unwrap();
        body
    }

    #[test]
    fn test_resolve_file() {
        let (_dir, root) = fixture();
        let resolved = resolve(&root, "/hello.txt").unwrap();

        assert_eq!(resolved.length, 11);
        assert!(resolved.last_modified.is_some());
        assert_eq!(body_of(resolved), b"hello world");
    }

    #[test]
    fn test_resolve_directory_index() {
        let (_dir, root) = fixture();

        assert_eq!(body_of(resolve(&root, "/docs").unwrap()), b"<h1>docs</h1>");
        assert_eq!(body_of(resolve(&root, "/docs/").unwrap()), b"<h1>docs</h1>");
    }

    #[test]
    fn test_directory_without_index_is_404() {
        let (_dir, root) = fixture();
        assert!(matches!(resolve(&root, "/empty/"), Err(HttpError::NotFound)));
        assert!(matches!(resolve(&root, "/"), Err(HttpError::NotFound)));
    }

    #[test]
    fn test_missing_file_is_404() {
        let (_dir, root) = fixture();
        assert!(matches!(resolve(&root, "/nope.txt"), Err(HttpError::NotFound)));
        assert!(matches!(resolve(&root, "/hello.txt/x"), Err(HttpError::NotFound)));
    }

    #[test]
    fn test_traversal_is_400() {
        let (_dir, root) = fixture();
        for path in ["/../secret.txt", "/docs/../../secret.txt", "/../www/../secret.txt", "/.."] {
            assert!(
                matches!(resolve(&root, path), Err(HttpError::BadRequest(_))),
                "{} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_dotdot_inside_root_is_fine() {
        let (_dir, root) = fixture();
        assert_eq!(body_of(resolve(&root, "/docs/../hello.txt").unwrap()), b"hello world");
        // Sale de la raíz y vuelve a entrar: termina adentro
        assert_eq!(body_of(resolve(&root, "/../www/hello.txt").unwrap()), b"hello world");
    }

    #[test]
    fn test_traversal_to_missing_file_is_still_400() {
        let (_dir, root) = fixture();
        assert!(matches!(
            resolve(&root, "/../../../no/such/file"),
            Err(HttpError::BadRequest(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_out_of_root_is_400() {
        let (dir, root) = fixture();
        std::os::unix::fs::symlink(dir.path().join("secret.txt"), root.join("link.txt")).unwrap();

        assert!(matches!(resolve(&root, "/link.txt"), Err(HttpError::BadRequest(_))));
    }

    #[test]
    fn test_nul_byte_is_400() {
        let (_dir, root) = fixture();
        assert!(matches!(resolve(&root, "/hello\0.txt"), Err(HttpError::BadRequest(_))));
    }
}

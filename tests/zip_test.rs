//! Tests del lector de zip sobre archivos generados en el momento
//! tests/zip_test.rs

mod common;

use common::{write_zip, Method};
use static_httpd::http::HttpError;
use static_httpd::resolver::archive::Lookup;
use static_httpd::resolver::ArchiveHandle;
use static_httpd::zip::{CompressionMethod, EntryReader, ZipError, ZipParser};
use std::fs::File;
use std::io::Read;
use std::sync::Arc;

#[test]
fn test_list_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.zip");
    write_zip(
        &path,
        &[
            ("a.txt", b"alpha", Method::Stored),
            ("dir/", b"", Method::Stored),
            ("dir/b.txt", b"bravo bravo bravo", Method::Deflate),
        ],
    );

    let file = File::open(&path).unwrap();
    let entries = ZipParser::new(&file).unwrap().list_files().unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].file_name, "a.txt");
    assert_eq!(entries[0].compression_method, CompressionMethod::Stored);
    assert_eq!(entries[0].uncompressed_size, 5);
    assert!(entries[1].is_directory);
    assert_eq!(entries[2].compression_method, CompressionMethod::Deflate);
    assert_eq!(entries[2].uncompressed_size, 17);
}

#[test]
fn test_entry_reader_inflates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.zip");
    let text = "lorem ipsum dolor sit amet ".repeat(500);
    write_zip(
        &path,
        &[
            ("first.txt", b"first", Method::Stored),
            ("text.txt", text.as_bytes(), Method::Deflate),
        ],
    );

    let file = Arc::new(File::open(&path).unwrap());
    let entries = ZipParser::new(&file).unwrap().list_files().unwrap();

    let mut out = String::new();
    EntryReader::open(Arc::clone(&file), &entries[1])
        .unwrap()
        .read_to_string(&mut out)
        .unwrap();
    assert_eq!(out, text);

    let mut first = Vec::new();
    EntryReader::open(file, &entries[0])
        .unwrap()
        .read_to_end(&mut first)
        .unwrap();
    assert_eq!(first, b"first");
}

#[test]
fn test_eocd_with_trailing_comment_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.zip");
    write_zip(&path, &[("a.txt", b"alpha", Method::Stored)]);

    // Comentario de 5 bytes al final: el EOCD ya no está en los últimos 22
    let mut data = std::fs::read(&path).unwrap();
    let len = data.len();
    data[len - 2..].copy_from_slice(&5u16.to_le_bytes());
    data.extend_from_slice(b"hello");
    std::fs::write(&path, data).unwrap();

    let file = File::open(&path).unwrap();
    let entries = ZipParser::new(&file).unwrap().list_files().unwrap();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_archive_handle_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.zip");
    write_zip(
        &path,
        &[
            ("index.html", b"root", Method::Stored),
            ("a/b/c.txt", b"deep", Method::Deflate),
        ],
    );

    let handle = ArchiveHandle::open(&path).unwrap();
    assert_eq!(handle.len(), 2);
    assert!(matches!(handle.lookup("index.html"), Some(Lookup::File(_))));
    assert!(matches!(handle.lookup("a"), Some(Lookup::Directory)));
    assert!(matches!(handle.lookup("a/b"), Some(Lookup::Directory)));
    assert!(matches!(handle.lookup("a/b/"), Some(Lookup::Directory)));
    assert!(handle.lookup("a/b/d.txt").is_none());
}

#[test]
fn test_archive_handle_close() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.zip");
    write_zip(&path, &[("index.html", b"root", Method::Stored)]);

    let handle = ArchiveHandle::open(&path).unwrap();

    // Un stream abierto antes del cierre sigue siendo legible
    let mut open_before = handle.resolve("/").unwrap();
    assert!(handle.close());
    assert!(!handle.close());
    assert!(handle.is_closed());

    let mut body = Vec::new();
    open_before.body.read_to_end(&mut body).unwrap();
    assert_eq!(body, b"root");

    assert!(matches!(
        handle.resolve("/index.html"),
        Err(HttpError::InternalServerError(_))
    ));
}

#[test]
fn test_entry_with_overflowing_size_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.zip");
    write_zip(&path, &[("a.txt", b"alpha", Method::Stored)]);

    let file = Arc::new(File::open(&path).unwrap());
    let mut entry = ZipParser::new(&file).unwrap().list_files().unwrap().remove(0);

    // Tamaños de 64 bits como los de un extra field ZIP64 manipulado
    entry.compressed_size = u64::MAX;
    assert!(matches!(
        EntryReader::open(Arc::clone(&file), &entry),
        Err(ZipError::InvalidRecord(_))
    ));
}

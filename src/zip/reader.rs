//! Streams de lectura para el contenido de una entrada.

use flate2::read::DeflateDecoder;
use std::fs::File;
use std::io::{self, Read};
use std::sync::Arc;

use super::parser::{read_at, ZipParser};
use super::structures::{CompressionMethod, ZipFileEntry};
use super::ZipError;

/// Ventana `[pos, end)` de un archivo compartido, leída con `read_at`
struct RangeReader {
    file: Arc<File>,
    pos: u64,
    end: u64,
}

impl Read for RangeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.end.saturating_sub(self.pos);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let n = read_at(&self.file, self.pos, &mut buf[..want])?;
        self.pos += n as u64;
        Ok(n)
    }
}

/// Contenido descomprimido de una entrada
///
/// Nunca entrega más bytes que el tamaño declarado en el Central Directory.
pub struct EntryReader {
    inner: io::Take<Box<dyn Read + Send>>,
}

impl EntryReader {
    /// Abre la entrada (STORED o DEFLATE) sobre el archivo compartido
    pub fn open(file: Arc<File>, entry: &ZipFileEntry) -> Result<Self, ZipError> {
        let data_offset = ZipParser::new(&file)?.data_offset(entry)?;
        let raw = RangeReader {
            file,
            pos: data_offset,
            end: data_offset
                .checked_add(entry.compressed_size)
                .ok_or(ZipError::InvalidRecord("Local File Header"))?,
        };

        let inner: Box<dyn Read + Send> = match entry.compression_method {
            CompressionMethod::Stored => Box::new(raw),
            CompressionMethod::Deflate => Box::new(DeflateDecoder::new(raw)),
            CompressionMethod::Unknown(method) => {
                return Err(ZipError::UnsupportedCompression(method));
            }
        };

        Ok(Self {
            inner: inner.take(entry.uncompressed_size),
        })
    }
}

impl Read for EntryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

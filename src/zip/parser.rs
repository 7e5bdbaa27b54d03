//! Parser del Central Directory.
//!
//! Un zip se lee desde el final:
//! 1. Buscar el End of Central Directory (EOCD)
//! 2. Si es ZIP64, leer el EOCD de 64 bits
//! 3. Leer el Central Directory completo y parsear cada entrada
//! 4. Para servir una entrada, leer su Local File Header y saltar hasta los datos
//!
//! Todas las lecturas son posicionales (`read_at`), así que el mismo
//! `File` se comparte entre threads sin un cursor común.

use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{self, Cursor, Read};

use super::structures::*;
use super::ZipError;

/// Tamaño máximo del comentario del zip (65535 bytes)
const MAX_COMMENT_SIZE: u64 = 65535;

/// Parser de estructuras zip sobre un archivo local
pub struct ZipParser<'a> {
    file: &'a File,
    size: u64,
}

impl<'a> ZipParser<'a> {
    pub fn new(file: &'a File) -> io::Result<Self> {
        let size = file.metadata()?.len();
        Ok(Self { file, size })
    }

    /// Encuentra el EOCD; retorna (registro, offset en el archivo)
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64), ZipError> {
        let eocd_size = EndOfCentralDirectory::SIZE as u64;
        if self.size < eocd_size {
            return Err(ZipError::NotAZip);
        }

        // Caso común: sin comentario, el EOCD son los últimos 22 bytes
        let offset = self.size - eocd_size;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        read_exact_at(self.file, offset, &mut buf)?;
        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && buf[20..22] == [0, 0] {
            return Ok((EndOfCentralDirectory::from_bytes(&buf)?, offset));
        }

        // Con comentario hay que buscar la firma hacia atrás
        let search_size = (MAX_COMMENT_SIZE + eocd_size).min(self.size);
        let search_start = self.size - search_size;
        let mut buf = vec![0u8; search_size as usize];
        read_exact_at(self.file, search_start, &mut buf)?;

        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                let eocd = EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
                // El largo del comentario tiene que coincidir con lo que queda
                if eocd.comment_len as usize == buf.len() - i - EndOfCentralDirectory::SIZE {
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(ZipError::NotAZip)
    }

    /// Lee el EOCD de ZIP64 a partir del locator que precede al EOCD normal
    pub fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD, ZipError> {
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or(ZipError::InvalidRecord("ZIP64 locator"))?;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        read_exact_at(self.file, locator_offset, &mut locator_buf)?;
        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        read_exact_at(self.file, locator.eocd64_offset, &mut eocd64_buf)?;
        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    /// Lista todas las entradas del Central Directory
    pub fn list_files(&self) -> Result<Vec<ZipFileEntry>, ZipError> {
        let (eocd, eocd_offset) = self.find_eocd()?;

        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset)?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                u64::from(eocd.cd_offset),
                u64::from(eocd.cd_size),
                u64::from(eocd.total_entries),
            )
        };

        if cd_offset.saturating_add(cd_size) > self.size {
            return Err(ZipError::InvalidRecord("Central Directory bounds"));
        }

        let mut cd_data = vec![0u8; cd_size as usize];
        read_exact_at(self.file, cd_offset, &mut cd_data)?;

        let mut entries = Vec::new();
        let mut cursor = Cursor::new(cd_data.as_slice());
        for _ in 0..total_entries {
            entries.push(parse_cdfh(&mut cursor)?);
        }

        Ok(entries)
    }

    /// Offset donde empiezan los datos (comprimidos) de una entrada
    ///
    /// Los largos de nombre y extra field del LFH pueden diferir de los
    /// del Central Directory, por eso se relee el LFH.
    pub fn data_offset(&self, entry: &ZipFileEntry) -> Result<u64, ZipError> {
        let mut lfh_buf = [0u8; LFH_SIZE];
        read_exact_at(self.file, entry.lfh_offset, &mut lfh_buf)?;

        if lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(ZipError::InvalidRecord("Local File Header"));
        }

        let mut cursor = Cursor::new(&lfh_buf[26..]);
        let file_name_length = u64::from(cursor.read_u16::<LittleEndian>()?);
        let extra_field_length = u64::from(cursor.read_u16::<LittleEndian>()?);

        // Un ZIP64 extra field armado a mano puede llevar offsets cerca de u64::MAX
        entry
            .lfh_offset
            .checked_add(LFH_SIZE as u64 + file_name_length + extra_field_length)
            .ok_or(ZipError::InvalidRecord("Local File Header"))
    }
}

/// Parsea un Central Directory File Header
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry, ZipError> {
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        return Err(ZipError::InvalidRecord("Central Directory File Header"));
    }

    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let _flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let _crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = u64::from(cursor.read_u32::<LittleEndian>()?);
    let mut uncompressed_size = u64::from(cursor.read_u32::<LittleEndian>()?);
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = u64::from(cursor.read_u32::<LittleEndian>()?);

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    let file_name = String::from_utf8_lossy(&file_name_bytes).into_owned();

    // Los directorios terminan en '/'
    let is_directory = file_name.ends_with('/');

    // Extra field 0x0001: valores de 64 bits para los campos en 0xFFFFFFFF
    let extra_field_end = cursor.position() + u64::from(extra_field_length);
    while cursor.position() + 4 <= extra_field_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = u64::from(cursor.read_u16::<LittleEndian>()?);
        let field_end = cursor.position() + field_size;

        if header_id == 0x0001 {
            if uncompressed_size == 0xFFFF_FFFF && cursor.position() + 8 <= field_end {
                uncompressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFF_FFFF && cursor.position() + 8 <= field_end {
                compressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == 0xFFFF_FFFF && cursor.position() + 8 <= field_end {
                lfh_offset = cursor.read_u64::<LittleEndian>()?;
            }
        }
        cursor.set_position(field_end);
    }

    cursor.set_position(extra_field_end + u64::from(file_comment_length));

    Ok(ZipFileEntry {
        file_name,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        lfh_offset,
        is_directory,
    })
}

/// Lectura posicional completa; no mueve ningún cursor compartido
pub fn read_exact_at(file: &File, mut offset: u64, mut buf: &mut [u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match read_at(file, offset, buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "unexpected end of zip archive",
                ))
            }
            Ok(n) => {
                offset += n as u64;
                buf = &mut buf[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(unix)]
pub fn read_at(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
pub fn read_at(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}

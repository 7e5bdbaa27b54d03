use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use super::ZipError;

/// Firma del Local File Header; también sirve para detectar un zip
pub const LFH_SIGNATURE: [u8; 4] = *b"PK\x03\x04";
/// Local File Header - 30 bytes fijos
pub const LFH_SIZE: usize = 30;

/// Central Directory File Header - 46 bytes mínimo
pub const CDFH_SIGNATURE: [u8; 4] = *b"PK\x01\x02";

/// Métodos de compresión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes mínimo
pub struct EndOfCentralDirectory {
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ZipError> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(ZipError::InvalidRecord("End of Central Directory"));
        }

        let mut cursor = Cursor::new(&data[4..]);
        let _disk_number = cursor.read_u16::<LittleEndian>()?;
        let _disk_with_cd = cursor.read_u16::<LittleEndian>()?;

        Ok(Self {
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFF_FFFF
            || self.cd_offset == 0xFFFF_FFFF
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64EOCDLocator {
    pub eocd64_offset: u64,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ZipError> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(ZipError::InvalidRecord("ZIP64 locator"));
        }

        let mut cursor = Cursor::new(&data[4..]);
        let _disk_with_eocd64 = cursor.read_u32::<LittleEndian>()?;

        Ok(Self {
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes mínimo
pub struct Zip64EOCD {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ZipError> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(ZipError::InvalidRecord("ZIP64 End of Central Directory"));
        }

        // Saltar size, versiones y números de disco hasta los contadores
        let mut cursor = Cursor::new(&data[32..]);

        Ok(Self {
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// Entrada del Central Directory ya parseada
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub lfh_offset: u64,
    pub is_directory: bool,
}

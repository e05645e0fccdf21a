//! Metadata root, stream directory, and the heaps this crate consumes.
//!
//! The physical metadata blob starts with the `BSJB` root header (ECMA-335
//! II.24.2.1) followed by a directory of named streams. Of those, the front
//! end needs `#~` (the compressed tables, handled in
//! [`crate::metadata::tables`]), `#Strings` (identifier names) and `#GUID`
//! (module version ids). `#Blob` and `#US` carry signatures and user-string
//! literals, which resolution never touches, so they are located but not
//! parsed.

use std::ffi::CStr;

use uguid::Guid;

use crate::{utils::ByteReader, Error::OutOfBounds, Result};

/// Magic signature of the metadata root: `BSJB` in little-endian.
pub const METADATA_MAGIC: u32 = 0x424A_5342;

/// One entry of the stream directory.
#[derive(Debug, Clone)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Stream name, e.g. `#~` or `#Strings`
    pub name: String,
}

/// The metadata root header plus its stream directory.
pub struct Root {
    /// Format version of the metadata (major)
    pub major_version: u16,
    /// Format version of the metadata (minor)
    pub minor_version: u16,
    /// Runtime version string, e.g. `v4.0.30319`
    pub version: String,
    /// Directory of all streams present in the blob
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parse the metadata root from the start of a metadata blob.
    ///
    /// # Errors
    /// Fails when the signature is wrong, the version string or stream
    /// directory runs past the input, or a stream points outside the blob.
    pub fn read(data: &[u8]) -> Result<Root> {
        let mut reader = ByteReader::new(data);

        let signature = reader.read_le::<u32>()?;
        if signature != METADATA_MAGIC {
            return Err(malformed_error!(
                "Invalid metadata signature - 0x{:08x}",
                signature
            ));
        }

        let major_version = reader.read_le::<u16>()?;
        let minor_version = reader.read_le::<u16>()?;
        let _reserved = reader.read_le::<u32>()?;

        let version_length = reader.read_le::<u32>()? as usize;
        if version_length > 255 {
            return Err(malformed_error!(
                "Unreasonable version string length - {}",
                version_length
            ));
        }
        let version_bytes = reader.read_bytes(version_length)?;
        let version = match version_bytes.iter().position(|&b| b == 0) {
            Some(end) => String::from_utf8_lossy(&version_bytes[..end]).into_owned(),
            None => String::from_utf8_lossy(version_bytes).into_owned(),
        };

        let _flags = reader.read_le::<u16>()?;
        let stream_count = reader.read_le::<u16>()?;
        if stream_count == 0 || stream_count > 8 {
            return Err(malformed_error!("Invalid stream count - {}", stream_count));
        }

        let mut stream_headers = Vec::with_capacity(stream_count as usize);
        for _ in 0..stream_count {
            let offset = reader.read_le::<u32>()?;
            let size = reader.read_le::<u32>()?;
            match offset.checked_add(size) {
                Some(end) if (end as usize) <= data.len() => {}
                _ => return Err(OutOfBounds),
            }

            // Name is NUL-terminated ASCII, padded up to a 4-byte boundary.
            let mut name = String::new();
            loop {
                let b = reader.read_le::<u8>()?;
                if b == 0 {
                    break;
                }
                if name.len() >= 32 {
                    return Err(malformed_error!("Stream name too long"));
                }
                name.push(char::from(b));
            }
            while reader.pos() % 4 != 0 {
                reader.advance_by(1)?;
            }

            stream_headers.push(StreamHeader { offset, size, name });
        }

        Ok(Root {
            major_version,
            minor_version,
            version,
            stream_headers,
        })
    }

    /// Look up a stream by name.
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|s| s.name == name)
    }
}

/// The `#Strings` heap: NUL-terminated UTF-8 identifiers, indexed by byte
/// offset from the metadata tables.
pub struct StringsHeap<'a> {
    data: &'a [u8],
}

impl<'a> StringsHeap<'a> {
    /// Wrap a `#Strings` heap slice. The heap always starts with a NUL byte.
    ///
    /// # Errors
    /// Fails when the heap is empty or does not start with NUL.
    pub fn from(data: &'a [u8]) -> Result<StringsHeap<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #Strings heap is empty"));
        }
        Ok(StringsHeap { data })
    }

    /// The identifier stored at `index`.
    ///
    /// # Errors
    /// Fails when the index is out of bounds, unterminated, or not UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }
        let cstr = CStr::from_bytes_until_nul(&self.data[index..])
            .map_err(|_| malformed_error!("Unterminated string at index - {}", index))?;
        cstr.to_str()
            .map_err(|_| malformed_error!("Invalid string at index - {}", index))
    }
}

/// The `#GUID` heap: raw 16-byte GUIDs addressed by 1-based index.
pub struct GuidHeap<'a> {
    data: &'a [u8],
}

impl<'a> GuidHeap<'a> {
    /// Wrap a `#GUID` heap slice; a size that is not a multiple of 16 is rejected.
    ///
    /// # Errors
    /// Fails when the heap size is not a multiple of 16 bytes.
    pub fn from(data: &'a [u8]) -> Result<GuidHeap<'a>> {
        if data.len() % 16 != 0 {
            return Err(malformed_error!(
                "#GUID heap size {} is not a multiple of 16",
                data.len()
            ));
        }
        Ok(GuidHeap { data })
    }

    /// The GUID at the given 1-based index; index 0 is the null GUID.
    ///
    /// # Errors
    /// Fails when the index points past the heap.
    pub fn get(&self, index: usize) -> Result<Guid> {
        if index == 0 {
            return Ok(Guid::ZERO);
        }
        let start = (index - 1) * 16;
        let end = start + 16;
        if end > self.data.len() {
            return Err(OutOfBounds);
        }
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&self.data[start..end]);
        Ok(Guid::from_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_root() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&METADATA_MAGIC.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes()); // major
        data.extend_from_slice(&1u16.to_le_bytes()); // minor
        data.extend_from_slice(&0u32.to_le_bytes()); // reserved
        data.extend_from_slice(&12u32.to_le_bytes()); // version length
        data.extend_from_slice(b"v4.0.30319\0\0");
        data.extend_from_slice(&0u16.to_le_bytes()); // flags
        data.extend_from_slice(&1u16.to_le_bytes()); // stream count
        data.extend_from_slice(&44u32.to_le_bytes()); // offset
        data.extend_from_slice(&4u32.to_le_bytes()); // size
        data.extend_from_slice(b"#~\0\0");
        data.extend_from_slice(&[0u8; 4]); // the stream itself
        data
    }

    #[test]
    fn test_root_read() {
        let data = minimal_root();
        let root = Root::read(&data).unwrap();
        assert_eq!(root.version, "v4.0.30319");
        assert_eq!(root.stream_headers.len(), 1);
        let tables = root.stream("#~").unwrap();
        assert_eq!(tables.offset, 44);
        assert_eq!(tables.size, 4);
        assert!(root.stream("#Strings").is_none());
    }

    #[test]
    fn test_root_rejects_bad_magic() {
        let mut data = minimal_root();
        data[0] = 0xFF;
        assert!(Root::read(&data).is_err());
    }

    #[test]
    fn test_root_rejects_stream_past_end() {
        let mut data = minimal_root();
        // Stream offset field sits after the 32-byte preamble.
        data[32..36].copy_from_slice(&0xFFFFu32.to_le_bytes());
        assert!(matches!(Root::read(&data), Err(crate::Error::OutOfBounds)));
    }

    #[test]
    fn test_strings_heap() {
        let data = [0u8, b'W', b'i', b'd', b'g', b'e', b't', 0u8];
        let heap = StringsHeap::from(&data).unwrap();
        assert_eq!(heap.get(0).unwrap(), "");
        assert_eq!(heap.get(1).unwrap(), "Widget");
        assert_eq!(heap.get(4).unwrap(), "get");
        assert!(heap.get(8).is_err());
    }

    #[test]
    fn test_strings_heap_must_start_with_nul() {
        assert!(StringsHeap::from(b"Widget\0").is_err());
        assert!(StringsHeap::from(&[]).is_err());
    }

    #[test]
    fn test_guid_heap() {
        let mut data = [0u8; 16];
        data[0] = 0xAA;
        let heap = GuidHeap::from(&data).unwrap();
        assert_eq!(heap.get(0).unwrap(), Guid::ZERO);
        assert_ne!(heap.get(1).unwrap(), Guid::ZERO);
        assert!(heap.get(2).is_err());
        assert!(GuidHeap::from(&data[..15]).is_err());
    }
}

//! Assembly image loading.
//!
//! [`AssemblyImage::from_file`] memory-maps the input and sniffs the magic:
//! `MZ` means a PE envelope whose CLR data directory leads to the Cor20
//! header and the metadata blob; `BSJB` means a bare metadata blob. Either
//! way the blob is decoded once, eagerly, into the owned
//! [`AssemblyImage`] model with its name and token indexes.
//!
//! Every failure on this path — missing file, damaged PE, malformed
//! metadata — is wrapped into [`crate::Error::Load`] carrying the offending
//! path and the underlying cause, so the caller has a single diagnostic to
//! report. A load failure is fatal to the command invocation; nothing is
//! retried.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::metadata::image::{AssemblyImage, MethodDefEntry, ModuleImage, TypeDefEntry};
use crate::metadata::streams::{GuidHeap, Root, StringsHeap, METADATA_MAGIC};
use crate::metadata::tables::{MethodAttributes, TablesStream, TypeAttributes};
use crate::metadata::token::{Token, TABLE_METHOD_DEF, TABLE_TYPE_DEF};
use crate::{utils::ByteReader, Error, Error::OutOfBounds, Result};

const TABLE_ID_MODULE: usize = 0x00;
const TABLE_ID_TYPE_DEF: usize = 0x02;
const TABLE_ID_METHOD_PTR: usize = 0x05;
const TABLE_ID_METHOD_DEF: usize = 0x06;

/// The CLR 2.0 header located via the PE `COM_DESCRIPTOR` data directory.
struct Cor20Header {
    meta_data_rva: u32,
    meta_data_size: u32,
    entry_point_token: u32,
}

impl Cor20Header {
    fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < 72 {
            return Err(OutOfBounds);
        }
        let mut reader = ByteReader::new(data);

        let cb = reader.read_le::<u32>()?;
        if cb != 72 {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }
        let major_runtime_version = reader.read_le::<u16>()?;
        let _minor_runtime_version = reader.read_le::<u16>()?;
        if major_runtime_version == 0 || major_runtime_version > 10 {
            return Err(malformed_error!(
                "Invalid major runtime version: {}",
                major_runtime_version
            ));
        }
        let meta_data_rva = reader.read_le::<u32>()?;
        let meta_data_size = reader.read_le::<u32>()?;
        if meta_data_rva == 0 || meta_data_size == 0 {
            return Err(malformed_error!("Metadata RVA and size cannot be zero"));
        }
        let _flags = reader.read_le::<u32>()?;
        let entry_point_token = reader.read_le::<u32>()?;

        Ok(Cor20Header {
            meta_data_rva,
            meta_data_size,
            entry_point_token,
        })
    }
}

impl AssemblyImage {
    /// Load an assembly image from a file.
    ///
    /// Accepts a .NET PE executable (`MZ`) or a bare metadata blob (`BSJB`).
    ///
    /// # Errors
    /// Returns [`Error::Load`] wrapping the cause together with `path` for
    /// any failure: unreadable file, unrecognized format, damaged PE, PE
    /// without a CLR header, malformed metadata.
    pub fn from_file(path: &Path) -> Result<AssemblyImage> {
        Self::load_file(path).map_err(|source| Error::Load {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Build an image from an in-memory metadata blob.
    ///
    /// `origin` stands in for the filesystem path in diagnostics and as the
    /// image identity.
    ///
    /// # Errors
    /// Returns [`Error::Load`] wrapping the parse failure, as
    /// [`AssemblyImage::from_file`] does.
    pub fn from_metadata(data: &[u8], origin: impl Into<PathBuf>) -> Result<AssemblyImage> {
        let path = origin.into();
        build_image(data, None, &path).map_err(|source| Error::Load {
            path: path.clone(),
            source: Box::new(source),
        })
    }

    fn load_file(path: &Path) -> Result<AssemblyImage> {
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only and dropped before this function
        // returns; all parsed data is copied into the owned image model.
        let mmap = unsafe { Mmap::map(&file)? };
        let data: &[u8] = &mmap;

        if data.len() >= 2 && &data[0..2] == b"MZ" {
            let (metadata, entry_point) = clr_metadata_slice(data)?;
            build_image(metadata, entry_point, path)
        } else if data.len() >= 4 && data[0..4] == METADATA_MAGIC.to_le_bytes() {
            build_image(data, None, path)
        } else {
            Err(Error::NotSupported)
        }
    }
}

/// Translate an RVA to a file offset using the PE section table.
fn rva_to_offset(sections: &[goblin::pe::section_table::SectionTable], rva: u32) -> Result<usize> {
    for section in sections {
        let va = section.virtual_address;
        let span = section.virtual_size.max(section.size_of_raw_data);
        if rva >= va && rva < va.saturating_add(span) {
            return Ok((rva - va + section.pointer_to_raw_data) as usize);
        }
    }
    Err(malformed_error!("RVA 0x{:08x} is not backed by any section", rva))
}

/// Locate the metadata blob and entry point token inside a PE image.
fn clr_metadata_slice(data: &[u8]) -> Result<(&[u8], Option<Token>)> {
    let pe = goblin::pe::PE::parse(data)?;
    let optional_header = pe
        .header
        .optional_header
        .ok_or_else(|| malformed_error!("PE image has no optional header"))?;
    let clr_dir = optional_header
        .data_directories
        .get_clr_runtime_header()
        .ok_or(Error::NotSupported)?;

    let cor20_offset = rva_to_offset(&pe.sections, clr_dir.virtual_address)?;
    let cor20_end = cor20_offset
        .checked_add(clr_dir.size as usize)
        .filter(|&end| end <= data.len())
        .ok_or(OutOfBounds)?;
    let cor20 = Cor20Header::read(&data[cor20_offset..cor20_end])?;

    let md_offset = rva_to_offset(&pe.sections, cor20.meta_data_rva)?;
    let md_end = md_offset
        .checked_add(cor20.meta_data_size as usize)
        .filter(|&end| end <= data.len())
        .ok_or(OutOfBounds)?;

    let entry_point = match cor20.entry_point_token {
        0 => None,
        token => Some(Token::new(token)),
    };
    Ok((&data[md_offset..md_end], entry_point))
}

fn stream_slice<'a>(data: &'a [u8], root: &Root, name: &str) -> Option<&'a [u8]> {
    root.stream(name)
        .map(|h| &data[h.offset as usize..(h.offset + h.size) as usize])
}

/// Decode the metadata blob into a one-module image.
fn build_image(data: &[u8], entry_point: Option<Token>, path: &Path) -> Result<AssemblyImage> {
    let root = Root::read(data)?;
    log::debug!(
        "metadata root: version {}, {} streams",
        root.version,
        root.stream_headers.len()
    );

    let tables_data = stream_slice(data, &root, "#~")
        .ok_or_else(|| malformed_error!("Image has no #~ tables stream"))?;
    let strings_data = stream_slice(data, &root, "#Strings")
        .ok_or_else(|| malformed_error!("Image has no #Strings heap"))?;

    let tables = TablesStream::from(tables_data)?;
    let strings = StringsHeap::from(strings_data)?;
    let guids = match stream_slice(data, &root, "#GUID") {
        Some(heap) => Some(GuidHeap::from(heap)?),
        None => None,
    };

    if tables.row_count(TABLE_ID_MODULE) == 0 {
        return Err(malformed_error!("Image has no Module table row"));
    }
    let module_row = tables.module_row(1)?;
    let module_name = strings.get(module_row.name as usize)?.to_string();
    let mvid = match &guids {
        Some(heap) => heap.get(module_row.mvid as usize)?,
        None => uguid::Guid::ZERO,
    };

    // With a MethodPtr table the logical method order is the pointer order;
    // otherwise it is MethodDef row order.
    let ptr_count = tables.row_count(TABLE_ID_METHOD_PTR);
    let logical_methods = if ptr_count > 0 {
        ptr_count
    } else {
        tables.row_count(TABLE_ID_METHOD_DEF)
    };

    let mut methods = Vec::with_capacity(logical_methods as usize);
    for logical in 1..=logical_methods {
        let md_row = tables.resolve_method_list(logical)?;
        let row = tables.method_def_row(md_row)?;
        methods.push(MethodDefEntry {
            token: Token::from_table_row(TABLE_METHOD_DEF, md_row),
            name: strings.get(row.name as usize)?.to_string(),
            flags: MethodAttributes::from_bits_truncate(row.flags),
            owner: 0,
        });
    }

    let clamp = |index: u32| -> usize {
        (index.max(1) as usize).min(logical_methods as usize + 1)
    };

    let type_count = tables.row_count(TABLE_ID_TYPE_DEF);
    let mut types = Vec::with_capacity(type_count as usize);
    for row_index in 1..=type_count {
        let row = tables.type_def_row(row_index)?;
        let name = strings.get(row.name as usize)?.to_string();
        let namespace = strings.get(row.namespace as usize)?.to_string();
        let full_name = if namespace.is_empty() {
            name.clone()
        } else {
            format!("{namespace}.{name}")
        };

        let start = clamp(row.method_list);
        let end = if row_index < type_count {
            clamp(tables.type_def_row(row_index + 1)?.method_list)
        } else {
            logical_methods as usize + 1
        };
        let range = (start - 1)..(end.max(start) - 1);

        for method_index in range.clone() {
            methods[method_index].owner = (row_index - 1) as usize;
        }

        types.push(TypeDefEntry {
            token: Token::from_table_row(TABLE_TYPE_DEF, row_index),
            name,
            namespace,
            full_name,
            flags: TypeAttributes::from_bits_truncate(row.flags),
            methods: range,
        });
    }

    log::debug!(
        "loaded {}: module {}, {} types, {} methods",
        path.display(),
        module_name,
        types.len(),
        methods.len()
    );

    let module = ModuleImage::new(module_name, mvid, types, methods);
    Ok(AssemblyImage::new(
        path.to_path_buf(),
        entry_point,
        vec![module],
    ))
}

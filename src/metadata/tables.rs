//! The `#~` tables stream: header, index-width math, and row access.
//!
//! The front end only ever walks the tables needed to enumerate types and
//! methods: Module (0x00), TypeDef (0x02), MethodDef (0x06), plus the
//! FieldPtr/MethodPtr indirection tables and the row counts of every other
//! table, which feed into index-width computation (ECMA-335 II.24.2.6).
//! Tables between the ones we read are skipped by their computed row size;
//! tables after MethodDef are never visited.

use bitflags::bitflags;

use crate::{utils::ByteReader, Error::OutOfBounds, Result};

/// Number of possible metadata tables (one bit each in the `Valid` mask).
pub const TABLE_COUNT: usize = 64;

const TABLE_MODULE: usize = 0x00;
const TABLE_TYPE_REF: usize = 0x01;
const TABLE_TYPE_DEF: usize = 0x02;
const TABLE_FIELD_PTR: usize = 0x03;
const TABLE_FIELD: usize = 0x04;
const TABLE_METHOD_PTR: usize = 0x05;
const TABLE_METHOD_DEF: usize = 0x06;
const TABLE_PARAM: usize = 0x08;
const TABLE_MODULE_REF: usize = 0x1A;
const TABLE_TYPE_SPEC: usize = 0x1B;
const TABLE_ASSEMBLY_REF: usize = 0x23;

/// Highest table id the reader decodes; everything past it is ignored.
const LAST_DECODED_TABLE: usize = TABLE_METHOD_DEF;

bitflags! {
    /// TypeDef attribute flags (ECMA-335 II.23.1.15), visibility subset.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypeAttributes: u32 {
        /// Visibility mask (low three bits)
        const VISIBILITY_MASK = 0x0000_0007;
        /// Type is not visible outside the assembly
        const NOT_PUBLIC = 0x0000_0000;
        /// Type is visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Type is abstract
        const ABSTRACT = 0x0000_0080;
        /// Type is sealed
        const SEALED = 0x0000_0100;
        /// Type is an interface
        const INTERFACE = 0x0000_0020;
    }
}

impl TypeAttributes {
    /// True when the type is visible outside its assembly (top-level public).
    #[must_use]
    pub fn is_public(&self) -> bool {
        (*self & TypeAttributes::VISIBILITY_MASK) == TypeAttributes::PUBLIC
    }
}

bitflags! {
    /// MethodDef attribute flags (ECMA-335 II.23.1.10), access subset.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodAttributes: u16 {
        /// Member access mask (low three bits)
        const ACCESS_MASK = 0x0007;
        /// Accessible only within the defining type
        const PRIVATE = 0x0001;
        /// Accessible within the assembly
        const ASSEM = 0x0003;
        /// Accessible from anywhere
        const PUBLIC = 0x0006;
        /// Method is static
        const STATIC = 0x0010;
        /// Runtime special name (`.ctor`, `.cctor`)
        const RT_SPECIAL_NAME = 0x1000;
    }
}

impl MethodAttributes {
    /// True when the member access is public.
    #[must_use]
    pub fn is_public(&self) -> bool {
        (*self & MethodAttributes::ACCESS_MASK) == MethodAttributes::PUBLIC
    }

    /// True for static methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.contains(MethodAttributes::STATIC)
    }
}

/// Raw Module table row (only the columns the image model consumes).
pub struct ModuleRow {
    /// `#Strings` index of the module name
    pub name: u32,
    /// `#GUID` index of the module version id
    pub mvid: u32,
}

/// Raw TypeDef table row.
pub struct TypeDefRow {
    /// Attribute flags
    pub flags: u32,
    /// `#Strings` index of the simple name
    pub name: u32,
    /// `#Strings` index of the namespace
    pub namespace: u32,
    /// 1-based first row of this type's methods in MethodDef (or MethodPtr)
    pub method_list: u32,
}

/// Raw MethodDef table row.
pub struct MethodDefRow {
    /// Attribute flags
    pub flags: u16,
    /// `#Strings` index of the method name
    pub name: u32,
}

/// Parsed `#~` stream: row counts for all tables plus decoded access to the
/// handful the front end walks.
pub struct TablesStream<'a> {
    heap_sizes: u8,
    row_counts: [u32; TABLE_COUNT],
    /// Byte offset of each decoded table's first row, relative to `rows`
    offsets: [usize; LAST_DECODED_TABLE + 1],
    /// Byte size of one row of each decoded table
    row_sizes: [usize; LAST_DECODED_TABLE + 1],
    rows: &'a [u8],
}

impl<'a> TablesStream<'a> {
    /// Parse the `#~` stream header and locate the decoded tables.
    ///
    /// # Errors
    /// Fails when the header or any table region the reader needs runs past
    /// the end of the stream.
    pub fn from(data: &'a [u8]) -> Result<TablesStream<'a>> {
        let mut reader = ByteReader::new(data);

        let _reserved = reader.read_le::<u32>()?;
        let major = reader.read_le::<u8>()?;
        let _minor = reader.read_le::<u8>()?;
        if major != 2 {
            return Err(malformed_error!(
                "Unsupported tables stream version - {}",
                major
            ));
        }
        let heap_sizes = reader.read_le::<u8>()?;
        let _reserved2 = reader.read_le::<u8>()?;
        let valid = reader.read_le::<u64>()?;
        let _sorted = reader.read_le::<u64>()?;

        let mut row_counts = [0u32; TABLE_COUNT];
        for (table, count) in row_counts.iter_mut().enumerate() {
            if valid & (1u64 << table) != 0 {
                let rows = reader.read_le::<u32>()?;
                if rows > 0x00FF_FFFF {
                    return Err(malformed_error!(
                        "Table 0x{:02x} row count {} exceeds the token row space",
                        table,
                        rows
                    ));
                }
                *count = rows;
            }
        }

        let rows = &data[reader.pos()..];

        let mut stream = TablesStream {
            heap_sizes,
            row_counts,
            offsets: [0; LAST_DECODED_TABLE + 1],
            row_sizes: [0; LAST_DECODED_TABLE + 1],
            rows,
        };

        let mut offset = 0usize;
        for table in 0..=LAST_DECODED_TABLE {
            stream.offsets[table] = offset;
            stream.row_sizes[table] = stream.row_size(table);
            offset += stream.row_sizes[table] * stream.row_counts[table] as usize;
        }
        if offset > rows.len() {
            return Err(OutOfBounds);
        }

        Ok(stream)
    }

    /// Number of rows in the given table.
    #[must_use]
    pub fn row_count(&self, table: usize) -> u32 {
        self.row_counts.get(table).copied().unwrap_or(0)
    }

    fn strings_wide(&self) -> bool {
        self.heap_sizes & 0x01 != 0
    }

    fn guid_wide(&self) -> bool {
        self.heap_sizes & 0x02 != 0
    }

    fn blob_wide(&self) -> bool {
        self.heap_sizes & 0x04 != 0
    }

    fn heap_size(&self, wide: bool) -> usize {
        if wide {
            4
        } else {
            2
        }
    }

    /// Width of a simple index into `table`: 4 bytes once it has 2^16 rows.
    fn table_index_wide(&self, table: usize) -> bool {
        self.row_counts[table] > 0xFFFF
    }

    /// Width of a coded index over `tables` with `tag_bits` of tag.
    fn coded_index_wide(&self, tables: &[usize], tag_bits: u32) -> bool {
        let max_rows = tables.iter().map(|&t| self.row_counts[t]).max().unwrap_or(0);
        max_rows >= (1u32 << (16 - tag_bits))
    }

    fn index_size(&self, wide: bool) -> usize {
        if wide {
            4
        } else {
            2
        }
    }

    /// Byte size of one row of the given decoded table.
    fn row_size(&self, table: usize) -> usize {
        let strings = self.heap_size(self.strings_wide());
        let guid = self.heap_size(self.guid_wide());
        let blob = self.heap_size(self.blob_wide());

        match table {
            TABLE_MODULE => 2 + strings + 3 * guid,
            TABLE_TYPE_REF => {
                let scope = self.index_size(self.coded_index_wide(
                    &[TABLE_MODULE, TABLE_MODULE_REF, TABLE_ASSEMBLY_REF, TABLE_TYPE_REF],
                    2,
                ));
                scope + 2 * strings
            }
            TABLE_TYPE_DEF => {
                let extends = self.index_size(self.coded_index_wide(
                    &[TABLE_TYPE_DEF, TABLE_TYPE_REF, TABLE_TYPE_SPEC],
                    2,
                ));
                let fields = self.index_size(self.table_index_wide(TABLE_FIELD));
                let methods = self.index_size(self.table_index_wide(TABLE_METHOD_DEF));
                4 + 2 * strings + extends + fields + methods
            }
            TABLE_FIELD_PTR => self.index_size(self.table_index_wide(TABLE_FIELD)),
            TABLE_FIELD => 2 + strings + blob,
            TABLE_METHOD_PTR => self.index_size(self.table_index_wide(TABLE_METHOD_DEF)),
            TABLE_METHOD_DEF => {
                let params = self.index_size(self.table_index_wide(TABLE_PARAM));
                4 + 2 + 2 + strings + blob + params
            }
            _ => 0,
        }
    }

    /// Position a reader at the given 1-based row of a decoded table.
    fn row_reader(&self, table: usize, row: u32) -> Result<ByteReader<'a>> {
        if row == 0 || row > self.row_counts[table] {
            return Err(OutOfBounds);
        }
        let offset = self.offsets[table] + self.row_sizes[table] * (row as usize - 1);
        let mut reader = ByteReader::new(self.rows);
        reader.seek(offset)?;
        Ok(reader)
    }

    /// Decode the Module row at the given 1-based index.
    ///
    /// # Errors
    /// Fails when the row is out of range or truncated.
    pub fn module_row(&self, row: u32) -> Result<ModuleRow> {
        let mut r = self.row_reader(TABLE_MODULE, row)?;
        let _generation = r.read_le::<u16>()?;
        let name = r.read_index(self.strings_wide())?;
        let mvid = r.read_index(self.guid_wide())?;
        Ok(ModuleRow { name, mvid })
    }

    /// Decode the TypeDef row at the given 1-based index.
    ///
    /// # Errors
    /// Fails when the row is out of range or truncated.
    pub fn type_def_row(&self, row: u32) -> Result<TypeDefRow> {
        let mut r = self.row_reader(TABLE_TYPE_DEF, row)?;
        let flags = r.read_le::<u32>()?;
        let name = r.read_index(self.strings_wide())?;
        let namespace = r.read_index(self.strings_wide())?;
        let extends_wide = self.coded_index_wide(
            &[TABLE_TYPE_DEF, TABLE_TYPE_REF, TABLE_TYPE_SPEC],
            2,
        );
        let _extends = r.read_index(extends_wide)?;
        let _field_list = r.read_index(self.table_index_wide(TABLE_FIELD))?;
        let method_list = r.read_index(self.table_index_wide(TABLE_METHOD_DEF))?;
        Ok(TypeDefRow {
            flags,
            name,
            namespace,
            method_list,
        })
    }

    /// Decode the MethodDef row at the given 1-based index.
    ///
    /// # Errors
    /// Fails when the row is out of range or truncated.
    pub fn method_def_row(&self, row: u32) -> Result<MethodDefRow> {
        let mut r = self.row_reader(TABLE_METHOD_DEF, row)?;
        let _rva = r.read_le::<u32>()?;
        let _impl_flags = r.read_le::<u16>()?;
        let flags = r.read_le::<u16>()?;
        let name = r.read_index(self.strings_wide())?;
        Ok(MethodDefRow { flags, name })
    }

    /// Resolve a MethodList index through the MethodPtr table when present.
    ///
    /// With no MethodPtr table the index already names a MethodDef row.
    ///
    /// # Errors
    /// Fails when the indirection row is out of range.
    pub fn resolve_method_list(&self, index: u32) -> Result<u32> {
        if self.row_counts[TABLE_METHOD_PTR] == 0 {
            return Ok(index);
        }
        let mut r = self.row_reader(TABLE_METHOD_PTR, index)?;
        r.read_index(self.table_index_wide(TABLE_METHOD_DEF))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a `#~` stream with Module + TypeRef + TypeDef + MethodDef rows,
    /// narrow heaps, and two types owning one method each.
    fn small_stream() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_le_bytes()); // reserved
        data.push(2); // major
        data.push(0); // minor
        data.push(0); // heap sizes (all narrow)
        data.push(1); // reserved
        let valid: u64 = (1 << TABLE_MODULE)
            | (1 << TABLE_TYPE_REF)
            | (1 << TABLE_TYPE_DEF)
            | (1 << TABLE_METHOD_DEF);
        data.extend_from_slice(&valid.to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes()); // sorted
        data.extend_from_slice(&1u32.to_le_bytes()); // Module rows
        data.extend_from_slice(&1u32.to_le_bytes()); // TypeRef rows
        data.extend_from_slice(&2u32.to_le_bytes()); // TypeDef rows
        data.extend_from_slice(&2u32.to_le_bytes()); // MethodDef rows

        // Module: generation, name, mvid, encid, encbaseid
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());

        // TypeRef: scope (coded), name, namespace — contents never decoded,
        // only skipped over by size.
        data.extend_from_slice(&[0u8; 6]);

        // TypeDef rows: flags, name, namespace, extends, fieldlist, methodlist
        for (name, methodlist) in [(10u16, 1u16), (20u16, 2u16)] {
            data.extend_from_slice(&1u32.to_le_bytes()); // public
            data.extend_from_slice(&name.to_le_bytes());
            data.extend_from_slice(&5u16.to_le_bytes());
            data.extend_from_slice(&0u16.to_le_bytes());
            data.extend_from_slice(&1u16.to_le_bytes());
            data.extend_from_slice(&methodlist.to_le_bytes());
        }

        // MethodDef rows: rva, implflags, flags, name, signature, paramlist
        for name in [30u16, 40u16] {
            data.extend_from_slice(&0u32.to_le_bytes());
            data.extend_from_slice(&0u16.to_le_bytes());
            data.extend_from_slice(&0x0006u16.to_le_bytes()); // public
            data.extend_from_slice(&name.to_le_bytes());
            data.extend_from_slice(&0u16.to_le_bytes());
            data.extend_from_slice(&1u16.to_le_bytes());
        }

        data
    }

    #[test]
    fn test_header_row_counts() {
        let data = small_stream();
        let stream = TablesStream::from(&data).unwrap();
        assert_eq!(stream.row_count(TABLE_MODULE), 1);
        assert_eq!(stream.row_count(TABLE_TYPE_REF), 1);
        assert_eq!(stream.row_count(TABLE_TYPE_DEF), 2);
        assert_eq!(stream.row_count(TABLE_METHOD_DEF), 2);
        assert_eq!(stream.row_count(TABLE_FIELD), 0);
    }

    #[test]
    fn test_rows_decode_across_skipped_table() {
        let data = small_stream();
        let stream = TablesStream::from(&data).unwrap();

        let module = stream.module_row(1).unwrap();
        assert_eq!(module.name, 1);
        assert_eq!(module.mvid, 1);

        let first = stream.type_def_row(1).unwrap();
        assert_eq!(first.name, 10);
        assert_eq!(first.namespace, 5);
        assert_eq!(first.method_list, 1);

        let second = stream.type_def_row(2).unwrap();
        assert_eq!(second.name, 20);
        assert_eq!(second.method_list, 2);

        let method = stream.method_def_row(2).unwrap();
        assert_eq!(method.name, 40);
        assert!(MethodAttributes::from_bits_truncate(method.flags).is_public());
    }

    #[test]
    fn test_row_index_out_of_range() {
        let data = small_stream();
        let stream = TablesStream::from(&data).unwrap();
        assert!(stream.type_def_row(0).is_err());
        assert!(stream.type_def_row(3).is_err());
    }

    #[test]
    fn test_truncated_rows_rejected() {
        let data = small_stream();
        let stream = TablesStream::from(&data[..data.len() - 4]);
        assert!(matches!(stream, Err(crate::Error::OutOfBounds)));
    }

    #[test]
    fn test_method_list_without_ptr_table_is_identity() {
        let data = small_stream();
        let stream = TablesStream::from(&data).unwrap();
        assert_eq!(stream.resolve_method_list(2).unwrap(), 2);
    }

    #[test]
    fn test_type_attributes_visibility() {
        assert!(TypeAttributes::from_bits_truncate(0x1).is_public());
        assert!(!TypeAttributes::from_bits_truncate(0x0).is_public());
        // NestedPublic (2) is not top-level public
        assert!(!TypeAttributes::from_bits_truncate(0x2).is_public());
    }
}

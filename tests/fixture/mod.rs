//! Builds real metadata blobs, byte by byte, for integration tests.
//!
//! The emitted layout is the minimal honest one: a `BSJB` root with three
//! streams (`#~`, `#Strings`, `#GUID`), narrow heap indexes, and Module +
//! TypeRef + TypeDef + MethodDef tables. The TypeRef row exists purely so
//! the reader has to skip over a table it does not decode. The first
//! TypeDef row is the `<Module>` pseudo-type, as in real assemblies.

use std::path::PathBuf;

const TABLE_MODULE: u64 = 0x00;
const TABLE_TYPE_REF: u64 = 0x01;
const TABLE_TYPE_DEF: u64 = 0x02;
const TABLE_METHOD_DEF: u64 = 0x06;

struct TypeSpec {
    namespace: String,
    name: String,
    methods: Vec<String>,
}

/// Assembles a metadata blob from a list of types and public methods.
pub struct MetadataBuilder {
    types: Vec<TypeSpec>,
}

impl MetadataBuilder {
    pub fn new() -> Self {
        MetadataBuilder { types: Vec::new() }
    }

    /// Add a public type with public instance methods of the given names.
    pub fn ty(mut self, namespace: &str, name: &str, methods: &[&str]) -> Self {
        self.types.push(TypeSpec {
            namespace: namespace.to_string(),
            name: name.to_string(),
            methods: methods.iter().map(|m| (*m).to_string()).collect(),
        });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut strings = StringsBuilder::new();
        let module_name = strings.intern("fixture.dll");
        let global_name = strings.intern("<Module>");

        struct TypeRow {
            flags: u32,
            name: u16,
            namespace: u16,
            method_list: u16,
        }
        struct MethodRow {
            flags: u16,
            name: u16,
        }

        let mut type_rows = vec![TypeRow {
            flags: 0,
            name: global_name,
            namespace: 0,
            method_list: 1,
        }];
        let mut method_rows: Vec<MethodRow> = Vec::new();

        for spec in &self.types {
            let method_list = method_rows.len() as u16 + 1;
            for method in &spec.methods {
                method_rows.push(MethodRow {
                    flags: 0x0006, // public
                    name: strings.intern(method),
                });
            }
            type_rows.push(TypeRow {
                flags: 0x1, // public
                name: strings.intern(&spec.name),
                namespace: strings.intern(&spec.namespace),
                method_list,
            });
        }

        // #~ stream
        let mut tables = Vec::new();
        tables.extend_from_slice(&0u32.to_le_bytes()); // reserved
        tables.push(2); // major version
        tables.push(0); // minor version
        tables.push(0); // heap sizes: all narrow
        tables.push(1); // reserved
        let valid: u64 = (1 << TABLE_MODULE)
            | (1 << TABLE_TYPE_REF)
            | (1 << TABLE_TYPE_DEF)
            | (1 << TABLE_METHOD_DEF);
        tables.extend_from_slice(&valid.to_le_bytes());
        tables.extend_from_slice(&0u64.to_le_bytes()); // sorted
        tables.extend_from_slice(&1u32.to_le_bytes()); // Module rows
        tables.extend_from_slice(&1u32.to_le_bytes()); // TypeRef rows
        tables.extend_from_slice(&(type_rows.len() as u32).to_le_bytes());
        tables.extend_from_slice(&(method_rows.len() as u32).to_le_bytes());

        // Module: generation, name, mvid, encid, encbaseid
        tables.extend_from_slice(&0u16.to_le_bytes());
        tables.extend_from_slice(&module_name.to_le_bytes());
        tables.extend_from_slice(&1u16.to_le_bytes());
        tables.extend_from_slice(&0u16.to_le_bytes());
        tables.extend_from_slice(&0u16.to_le_bytes());

        // TypeRef: resolution scope, name, namespace — skipped by the
        // reader, contents are irrelevant.
        tables.extend_from_slice(&[0u8; 6]);

        for row in &type_rows {
            tables.extend_from_slice(&row.flags.to_le_bytes());
            tables.extend_from_slice(&row.name.to_le_bytes());
            tables.extend_from_slice(&row.namespace.to_le_bytes());
            tables.extend_from_slice(&0u16.to_le_bytes()); // extends
            tables.extend_from_slice(&1u16.to_le_bytes()); // field list
            tables.extend_from_slice(&row.method_list.to_le_bytes());
        }

        for row in &method_rows {
            tables.extend_from_slice(&0u32.to_le_bytes()); // rva
            tables.extend_from_slice(&0u16.to_le_bytes()); // impl flags
            tables.extend_from_slice(&row.flags.to_le_bytes());
            tables.extend_from_slice(&row.name.to_le_bytes());
            tables.extend_from_slice(&0u16.to_le_bytes()); // signature
            tables.extend_from_slice(&1u16.to_le_bytes()); // param list
        }
        while tables.len() % 4 != 0 {
            tables.push(0);
        }

        let strings_heap = strings.finish();
        let guid_heap: [u8; 16] = *b"fixture-guid-16b";

        // Root header: 16 fixed bytes + 12-byte version + flags/count,
        // then three stream headers (12 + 20 + 16 bytes).
        let root_size = 32 + 12 + 20 + 16;
        let tables_offset = root_size as u32;
        let strings_offset = tables_offset + tables.len() as u32;
        let guid_offset = strings_offset + strings_heap.len() as u32;

        let mut data = Vec::new();
        data.extend_from_slice(&0x424A_5342u32.to_le_bytes()); // BSJB
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&12u32.to_le_bytes());
        data.extend_from_slice(b"v4.0.30319\0\0");
        data.extend_from_slice(&0u16.to_le_bytes()); // flags
        data.extend_from_slice(&3u16.to_le_bytes()); // stream count
        data.extend_from_slice(&tables_offset.to_le_bytes());
        data.extend_from_slice(&(tables.len() as u32).to_le_bytes());
        data.extend_from_slice(b"#~\0\0");
        data.extend_from_slice(&strings_offset.to_le_bytes());
        data.extend_from_slice(&(strings_heap.len() as u32).to_le_bytes());
        data.extend_from_slice(b"#Strings\0\0\0\0");
        data.extend_from_slice(&guid_offset.to_le_bytes());
        data.extend_from_slice(&16u32.to_le_bytes());
        data.extend_from_slice(b"#GUID\0\0\0");
        assert_eq!(data.len(), root_size);

        data.extend_from_slice(&tables);
        data.extend_from_slice(&strings_heap);
        data.extend_from_slice(&guid_heap);
        data
    }
}

struct StringsBuilder {
    data: Vec<u8>,
}

impl StringsBuilder {
    fn new() -> Self {
        StringsBuilder { data: vec![0] }
    }

    /// Append a NUL-terminated string and return its heap offset.
    fn intern(&mut self, value: &str) -> u16 {
        if value.is_empty() {
            return 0;
        }
        let offset = self.data.len() as u16;
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        offset
    }

    fn finish(self) -> Vec<u8> {
        self.data
    }
}

/// Write a blob to a unique file under the system temp directory.
pub fn write_temp(name: &str, data: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "cilcover-{}-{}-{name}",
        std::process::id(),
        std::thread::current().name().unwrap_or("t").replace("::", "-")
    ));
    std::fs::write(&path, data).expect("write fixture file");
    path
}

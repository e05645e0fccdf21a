//! Owned object model of a loaded assembly image.
//!
//! [`AssemblyImage`] holds everything resolution needs for the lifetime of
//! the process: per-module type and method entries decoded once at load time,
//! a full-name index for exact type lookup, and a token index per module for
//! method lookup. [`TypeRef`] and [`MethodRef`] are cheap handles borrowing
//! the image; they never outlive it and are what the dispatcher hands to the
//! exploration engine.

use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use uguid::Guid;

use crate::metadata::tables::{MethodAttributes, TypeAttributes};
use crate::metadata::token::Token;

/// One type definition, fully decoded.
pub(crate) struct TypeDefEntry {
    pub(crate) token: Token,
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) full_name: String,
    pub(crate) flags: TypeAttributes,
    /// Indexes into the module's method array owned by this type
    pub(crate) methods: Range<usize>,
}

/// One method or constructor definition, fully decoded.
pub(crate) struct MethodDefEntry {
    pub(crate) token: Token,
    pub(crate) name: String,
    pub(crate) flags: MethodAttributes,
    /// Index of the declaring type within the module's type array
    pub(crate) owner: usize,
}

impl TypeDefEntry {
    /// The `<Module>` pseudo-type holding global methods. Excluded from type
    /// enumeration, like reflection's `GetTypes`; its methods stay reachable
    /// through the token index.
    pub(crate) fn is_global_scope(&self) -> bool {
        self.namespace.is_empty() && self.name == "<Module>"
    }
}

/// A single module of an assembly with its eager lookup indexes.
pub struct ModuleImage {
    name: String,
    mvid: Guid,
    types: Vec<TypeDefEntry>,
    methods: Vec<MethodDefEntry>,
    /// Full name → type array index; first definition wins on duplicates
    type_names: HashMap<String, usize>,
    /// Metadata token → method array index
    method_tokens: HashMap<Token, usize>,
}

impl ModuleImage {
    pub(crate) fn new(
        name: String,
        mvid: Guid,
        types: Vec<TypeDefEntry>,
        methods: Vec<MethodDefEntry>,
    ) -> Self {
        let mut type_names = HashMap::with_capacity(types.len());
        for (index, entry) in types.iter().enumerate() {
            if entry.is_global_scope() {
                continue;
            }
            type_names.entry(entry.full_name.clone()).or_insert(index);
        }
        let mut method_tokens = HashMap::with_capacity(methods.len());
        for (index, entry) in methods.iter().enumerate() {
            method_tokens.insert(entry.token, index);
        }
        ModuleImage {
            name,
            mvid,
            types,
            methods,
            type_names,
            method_tokens,
        }
    }

    /// Module name as recorded in the Module table.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module version id.
    #[must_use]
    pub fn mvid(&self) -> Guid {
        self.mvid
    }

    /// Number of type definitions in this module.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Number of method definitions in this module.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}

/// A loaded assembly image: path identity, optional entry point, modules.
///
/// Owned for the remainder of the process once loaded; all [`TypeRef`] and
/// [`MethodRef`] handles borrow from it.
pub struct AssemblyImage {
    path: PathBuf,
    entry_point: Option<Token>,
    modules: Vec<ModuleImage>,
}

impl AssemblyImage {
    pub(crate) fn new(
        path: PathBuf,
        entry_point: Option<Token>,
        modules: Vec<ModuleImage>,
    ) -> Self {
        AssemblyImage {
            path,
            entry_point,
            modules,
        }
    }

    /// Filesystem path (or synthetic origin) this image was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entry point token from the CLR header, when the image has one.
    #[must_use]
    pub fn entry_point(&self) -> Option<Token> {
        self.entry_point
    }

    /// The modules of this image, in load order.
    #[must_use]
    pub fn modules(&self) -> &[ModuleImage] {
        &self.modules
    }

    /// All type definitions across all modules, in enumeration order
    /// (module order, then row order).
    pub fn types(&self) -> impl Iterator<Item = TypeRef<'_>> {
        self.modules.iter().enumerate().flat_map(move |(module, m)| {
            m.types
                .iter()
                .enumerate()
                .filter(|(_, entry)| !entry.is_global_scope())
                .map(move |(index, _)| TypeRef {
                    image: self,
                    module,
                    index,
                })
        })
    }

    /// Exact lookup by fully-qualified name, via the eager index.
    ///
    /// Modules are probed in order; the first module defining the name wins.
    #[must_use]
    pub fn type_by_full_name(&self, full_name: &str) -> Option<TypeRef<'_>> {
        self.modules
            .iter()
            .enumerate()
            .find_map(|(module, m)| {
                m.type_names.get(full_name).map(|&index| TypeRef {
                    image: self,
                    module,
                    index,
                })
            })
    }

    /// Token lookup within one module, via the eager index.
    #[must_use]
    pub fn method_by_token(&self, module: usize, token: Token) -> Option<MethodRef<'_>> {
        let m = self.modules.get(module)?;
        m.method_tokens.get(&token).map(|&index| MethodRef {
            image: self,
            module,
            index,
        })
    }
}

impl std::fmt::Debug for AssemblyImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AssemblyImage({}, {} modules)",
            self.path.display(),
            self.modules.len()
        )
    }
}

impl std::fmt::Debug for ModuleImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ModuleImage({}, {} types, {} methods)",
            self.name,
            self.types.len(),
            self.methods.len()
        )
    }
}

/// Handle to one type definition inside an [`AssemblyImage`].
#[derive(Clone, Copy)]
pub struct TypeRef<'a> {
    image: &'a AssemblyImage,
    module: usize,
    index: usize,
}

impl<'a> TypeRef<'a> {
    fn entry(&self) -> &'a TypeDefEntry {
        &self.image.modules[self.module].types[self.index]
    }

    /// The image this type belongs to.
    #[must_use]
    pub fn image(&self) -> &'a AssemblyImage {
        self.image
    }

    /// Simple name without namespace.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.entry().name
    }

    /// Namespace, possibly empty.
    #[must_use]
    pub fn namespace(&self) -> &'a str {
        &self.entry().namespace
    }

    /// Fully-qualified name (`Namespace.Name`, or just `Name`).
    #[must_use]
    pub fn full_name(&self) -> &'a str {
        &self.entry().full_name
    }

    /// TypeDef metadata token.
    #[must_use]
    pub fn token(&self) -> Token {
        self.entry().token
    }

    /// Attribute flags.
    #[must_use]
    pub fn flags(&self) -> TypeAttributes {
        self.entry().flags
    }

    /// True for top-level public types.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.entry().flags.is_public()
    }

    /// Methods and constructors declared by this type, in row order.
    pub fn methods(&self) -> impl Iterator<Item = MethodRef<'a>> {
        let image = self.image;
        let module = self.module;
        self.entry().methods.clone().map(move |index| MethodRef {
            image,
            module,
            index,
        })
    }
}

impl std::fmt::Debug for TypeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeRef({} {})", self.token(), self.full_name())
    }
}

/// Handle to one method or constructor inside an [`AssemblyImage`].
#[derive(Clone, Copy)]
pub struct MethodRef<'a> {
    image: &'a AssemblyImage,
    module: usize,
    index: usize,
}

impl<'a> MethodRef<'a> {
    fn entry(&self) -> &'a MethodDefEntry {
        &self.image.modules[self.module].methods[self.index]
    }

    /// The image this method belongs to.
    #[must_use]
    pub fn image(&self) -> &'a AssemblyImage {
        self.image
    }

    /// Method name; `.ctor`/`.cctor` for constructors.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.entry().name
    }

    /// MethodDef metadata token.
    #[must_use]
    pub fn token(&self) -> Token {
        self.entry().token
    }

    /// Attribute flags.
    #[must_use]
    pub fn flags(&self) -> MethodAttributes {
        self.entry().flags
    }

    /// True when the member access is public.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.entry().flags.is_public()
    }

    /// True for instance and static constructors.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        matches!(self.name(), ".ctor" | ".cctor")
    }

    /// The type declaring this method.
    #[must_use]
    pub fn declaring_type(&self) -> TypeRef<'a> {
        TypeRef {
            image: self.image,
            module: self.module,
            index: self.entry().owner,
        }
    }

    /// `Namespace.Type.Method`, as shown in diagnostics.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.declaring_type().full_name(), self.name())
    }
}

impl std::fmt::Debug for MethodRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MethodRef({} {})", self.token(), self.full_name())
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    //! In-memory image construction for unit tests; bypasses the binary
    //! parser so resolution and dispatch semantics can be tested in
    //! isolation.

    use super::*;
    use crate::metadata::token::{TABLE_METHOD_DEF, TABLE_TYPE_DEF};

    pub(crate) struct ImageBuilder {
        path: PathBuf,
        entry_point: Option<Token>,
        modules: Vec<ModuleImage>,
        // current module under construction
        types: Vec<TypeDefEntry>,
        methods: Vec<MethodDefEntry>,
        module_name: String,
    }

    impl ImageBuilder {
        pub(crate) fn new(path: &str) -> Self {
            ImageBuilder {
                path: PathBuf::from(path),
                entry_point: None,
                modules: Vec::new(),
                types: Vec::new(),
                methods: Vec::new(),
                module_name: "module0.dll".to_string(),
            }
        }

        pub(crate) fn entry_point(mut self, token: u32) -> Self {
            self.entry_point = Some(Token::new(token));
            self
        }

        /// Close the current module and start a new one.
        pub(crate) fn next_module(mut self, name: &str) -> Self {
            self.flush_module();
            self.module_name = name.to_string();
            self
        }

        /// Add a type with public methods of the given names.
        pub(crate) fn ty(self, namespace: &str, name: &str, methods: &[&str]) -> Self {
            self.ty_with_flags(namespace, name, methods, MethodAttributes::PUBLIC)
        }

        /// Add a type whose methods all carry the given flags.
        pub(crate) fn ty_with_flags(
            mut self,
            namespace: &str,
            name: &str,
            methods: &[&str],
            method_flags: MethodAttributes,
        ) -> Self {
            let owner = self.types.len();
            let start = self.methods.len();
            for method in methods {
                let row = self.methods.len() as u32 + 1;
                self.methods.push(MethodDefEntry {
                    token: Token::from_table_row(TABLE_METHOD_DEF, row),
                    name: (*method).to_string(),
                    flags: method_flags,
                    owner,
                });
            }
            let full_name = if namespace.is_empty() {
                name.to_string()
            } else {
                format!("{namespace}.{name}")
            };
            self.types.push(TypeDefEntry {
                token: Token::from_table_row(TABLE_TYPE_DEF, owner as u32 + 1),
                name: name.to_string(),
                namespace: namespace.to_string(),
                full_name,
                flags: TypeAttributes::PUBLIC,
                methods: start..self.methods.len(),
            });
            self
        }

        fn flush_module(&mut self) {
            let types = std::mem::take(&mut self.types);
            let methods = std::mem::take(&mut self.methods);
            let name = std::mem::replace(
                &mut self.module_name,
                format!("module{}.dll", self.modules.len() + 1),
            );
            self.modules.push(ModuleImage::new(name, Guid::ZERO, types, methods));
        }

        pub(crate) fn build(mut self) -> AssemblyImage {
            self.flush_module();
            AssemblyImage::new(self.path, self.entry_point, self.modules)
        }
    }
}

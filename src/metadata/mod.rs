//! Minimal ECMA-335 metadata access for the resolution front end.
//!
//! This is not a general metadata framework: it decodes exactly what type
//! and method resolution needs — the Module, TypeDef and MethodDef tables
//! (with pointer-table indirection), the `#Strings` and `#GUID` heaps, and
//! the PE/Cor20 envelope that locates them. Everything is decoded eagerly at
//! load time into [`image::AssemblyImage`]; queries afterwards are index
//! lookups and never touch the raw bytes again.

pub mod image;
pub mod loader;
pub mod streams;
pub mod tables;
pub mod token;

pub use image::{AssemblyImage, MethodRef, ModuleImage, TypeRef};
pub use token::Token;

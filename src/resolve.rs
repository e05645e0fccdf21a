//! Type and method resolution: imprecise user queries to exact metadata refs.
//!
//! The contract mirrors the reflection-based resolver this front end
//! replaces. An exact fully-qualified type name always wins outright;
//! otherwise substring matching applies with shortest-name preference.
//! Method queries are either metadata tokens (probed per module) or dotted
//! name fragments where the first type yielding any match fixes the
//! candidate pool. Every resolver returns at most one ref or a structured
//! failure; there is no interface for ambiguous candidate lists.
//!
//! Ties break deterministically by name length then lexical order, instead
//! of the enumeration accident of the original.

use crate::metadata::{AssemblyImage, MethodRef, Token, TypeRef};
use crate::{Error, Result};

/// Parse a method query as a metadata token: decimal, or hex with `0x`.
#[must_use]
pub fn parse_token(query: &str) -> Option<Token> {
    if let Some(hex) = query.strip_prefix("0x").or_else(|| query.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok().map(Token::new);
    }
    query.parse::<u32>().ok().map(Token::new)
}

/// Resolve a query string to exactly one type in the image.
///
/// Resolution order:
/// 1. an empty query fails immediately, before enumerating anything;
/// 2. an exact fully-qualified name match wins, bypassing fuzzy matching;
/// 3. otherwise every type whose fully-qualified name contains the query is
///    a candidate — namespace text included, so a namespace-only fragment
///    still resolves — and the one with the shortest fully-qualified name is
///    chosen.
///
/// # Errors
/// [`Error::EmptyQuery`] for an empty query, [`Error::TypeNotFound`] when no
/// candidate exists.
pub fn resolve_type<'a>(image: &'a AssemblyImage, query: &str) -> Result<TypeRef<'a>> {
    if query.is_empty() {
        return Err(Error::EmptyQuery);
    }

    if let Some(exact) = image.type_by_full_name(query) {
        return Ok(exact);
    }

    image
        .types()
        .filter(|t| t.full_name().contains(query))
        .min_by_key(|t| (t.full_name().len(), t.full_name()))
        .ok_or_else(|| Error::TypeNotFound {
            query: query.to_string(),
            image: image.path().to_path_buf(),
        })
}

/// Resolve a query string to exactly one method or constructor.
///
/// Two disjoint strategies, chosen by whether the query parses as an
/// integer token:
///
/// - **Token**: each module is probed in order; a module that does not know
///   the token is skipped silently and the first hit wins.
/// - **Name**: the query splits on `.`; the last segment is the method-name
///   fragment, the second-to-last (or `""`) the class-name fragment. Types
///   are scanned in enumeration order, and the first type whose simple name
///   contains the class fragment *and* that has members containing the
///   method fragment fixes the pool — all visibilities, statics and
///   constructors included. Within the pool the lexically shortest member
///   name wins. A later type with a tighter match is never considered.
///
/// # Errors
/// [`Error::EmptyQuery`] for an empty query,
/// [`Error::MethodTokenNotFound`]/[`Error::MethodNameNotFound`] when the
/// respective strategy finds nothing.
pub fn resolve_method<'a>(image: &'a AssemblyImage, query: &str) -> Result<MethodRef<'a>> {
    if query.is_empty() {
        return Err(Error::EmptyQuery);
    }

    if let Some(token) = parse_token(query) {
        for module in 0..image.modules().len() {
            if let Some(method) = image.method_by_token(module, token) {
                return Ok(method);
            }
        }
        return Err(Error::MethodTokenNotFound {
            token,
            image: image.path().to_path_buf(),
        });
    }

    let segments: Vec<&str> = query.split('.').collect();
    let method_fragment = segments[segments.len() - 1];
    let class_fragment = if segments.len() > 1 {
        segments[segments.len() - 2]
    } else {
        ""
    };

    for ty in image.types() {
        if !ty.name().contains(class_fragment) {
            continue;
        }
        let chosen = ty
            .methods()
            .filter(|m| m.name().contains(method_fragment))
            .min_by_key(|m| (m.name().len(), m.name(), m.token()));
        if let Some(method) = chosen {
            return Ok(method);
        }
    }

    Err(Error::MethodNameNotFound {
        query: query.to_string(),
        image: image.path().to_path_buf(),
    })
}

/// Collect all types under a namespace prefix, in enumeration order.
///
/// A type belongs to the result when its namespace equals `namespace` or is
/// nested beneath it (`namespace.` prefix).
///
/// # Errors
/// [`Error::EmptyQuery`] for an empty prefix, [`Error::NamespaceEmpty`] when
/// no types live under it.
pub fn resolve_namespace<'a>(
    image: &'a AssemblyImage,
    namespace: &str,
) -> Result<Vec<TypeRef<'a>>> {
    if namespace.is_empty() {
        return Err(Error::EmptyQuery);
    }

    let nested_prefix = format!("{namespace}.");
    let types: Vec<TypeRef<'a>> = image
        .types()
        .filter(|t| t.namespace() == namespace || t.namespace().starts_with(&nested_prefix))
        .collect();

    if types.is_empty() {
        return Err(Error::NamespaceEmpty {
            namespace: namespace.to_string(),
            image: image.path().to_path_buf(),
        });
    }
    Ok(types)
}

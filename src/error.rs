use std::path::PathBuf;

use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type covering everything this crate can fail with.
///
/// Two families live here. Parsing errors ([`Error::Malformed`],
/// [`Error::OutOfBounds`], [`Error::NotSupported`], [`Error::File`],
/// [`Error::Goblin`]) surface while reading an assembly image and are always
/// wrapped into [`Error::Load`] by the loader, so callers see one diagnostic
/// carrying the offending path and the underlying cause. Resolution errors
/// ([`Error::EmptyQuery`], [`Error::TypeNotFound`],
/// [`Error::MethodTokenNotFound`], [`Error::MethodNameNotFound`],
/// [`Error::NamespaceEmpty`]) carry the original query and the image path;
/// they terminate the command without reaching the exploration engine.
#[derive(Error, Debug)]
pub enum Error {
    /// The image is damaged and could not be parsed. Includes the source
    /// location where the malformation was detected.
    #[error("Malformed image: {message} at {file}:{line}")]
    Malformed {
        /// Description of the malformation
        message: String,
        /// Source file where the error was raised
        file: &'static str,
        /// Line where the error was raised
        line: u32,
    },

    /// Attempted to read beyond the boundaries of the input.
    #[error("Attempted to read beyond data boundaries!")]
    OutOfBounds,

    /// The file is not a supported image format (neither a PE with a CLR
    /// header nor a bare metadata blob).
    #[error("This file format is not supported!")]
    NotSupported,

    /// Filesystem I/O failure.
    #[error(transparent)]
    File(#[from] std::io::Error),

    /// PE envelope parsing failure from goblin.
    #[error(transparent)]
    Goblin(#[from] goblin::error::Error),

    /// An assembly could not be loaded. Wraps the underlying cause together
    /// with the path that was being loaded; produced only by
    /// [`crate::metadata::AssemblyImage::from_file`] and friends.
    #[error("Cannot load assembly {}; Error: {source}", path.display())]
    Load {
        /// Path of the image that failed to load
        path: PathBuf,
        /// Underlying parse or I/O failure
        source: Box<Error>,
    },

    /// A resolution query was empty. Distinct from not-found: no types or
    /// methods are enumerated before this is raised.
    #[error("Specified type or method can not be empty")]
    EmptyQuery,

    /// No type matched the query, neither exactly nor by substring.
    #[error("Cannot find type with name {query} in assembly {}", image.display())]
    TypeNotFound {
        /// The query string as given by the user
        query: String,
        /// Path of the image that was searched
        image: PathBuf,
    },

    /// A metadata token did not resolve to a method in any module.
    #[error("Cannot find method with token {token} in assembly {}", image.display())]
    MethodTokenNotFound {
        /// The token that was probed
        token: Token,
        /// Path of the image that was searched
        image: PathBuf,
    },

    /// No type yielded a member matching the name query.
    #[error("Cannot find method with name {query} in assembly {}", image.display())]
    MethodNameNotFound {
        /// The query string as given by the user
        query: String,
        /// Path of the image that was searched
        image: PathBuf,
    },

    /// No types live under the given namespace prefix.
    #[error("Cannot find any types in namespace {namespace} of assembly {}", image.display())]
    NamespaceEmpty {
        /// The namespace prefix that was scanned
        namespace: String,
        /// Path of the image that was searched
        image: PathBuf,
    },

    /// The exploration engine reported a failure.
    #[error("Exploration engine failure: {0}")]
    Engine(String),
}

impl Error {
    /// Process exit code for this error kind.
    ///
    /// One code per taxonomy entry so scripts can distinguish failures:
    /// load `10`, type not found `11`, method not found `12` (both by-token
    /// and by-name), empty namespace `13`, engine failure `20`, anything
    /// else `1` — including an empty query, which is a usage error rather
    /// than a failed search. Successful runs exit `0`; argument parse errors
    /// keep the code the CLI framework assigns.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Load { .. } => 10,
            Error::TypeNotFound { .. } => 11,
            Error::MethodTokenNotFound { .. } | Error::MethodNameNotFound { .. } => 12,
            Error::NamespaceEmpty { .. } => 13,
            Error::Engine(_) => 20,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_macro_captures_location() {
        let err = malformed_error!("bad value {}", 42);
        match err {
            Error::Malformed { message, file, .. } => {
                assert_eq!(message, "bad value 42");
                assert!(file.ends_with("error.rs"));
            }
            _ => panic!("expected Malformed"),
        }
    }

    #[test]
    fn test_load_error_display_includes_path_and_cause() {
        let err = Error::Load {
            path: PathBuf::from("/tmp/Sample.dll"),
            source: Box::new(Error::NotSupported),
        };
        let text = err.to_string();
        assert!(text.contains("/tmp/Sample.dll"));
        assert!(text.contains("not supported"));
    }

    #[test]
    fn test_exit_codes_per_taxonomy_entry() {
        assert_eq!(
            Error::Load {
                path: PathBuf::new(),
                source: Box::new(Error::OutOfBounds)
            }
            .exit_code(),
            10
        );
        assert_eq!(
            Error::TypeNotFound {
                query: "T".into(),
                image: PathBuf::new()
            }
            .exit_code(),
            11
        );
        assert_eq!(
            Error::MethodTokenNotFound {
                token: Token::new(0x0600_0001),
                image: PathBuf::new()
            }
            .exit_code(),
            12
        );
        assert_eq!(
            Error::MethodNameNotFound {
                query: "M".into(),
                image: PathBuf::new()
            }
            .exit_code(),
            12
        );
        assert_eq!(
            Error::NamespaceEmpty {
                namespace: "N".into(),
                image: PathBuf::new()
            }
            .exit_code(),
            13
        );
        assert_eq!(Error::Engine("boom".into()).exit_code(), 20);
        assert_eq!(Error::OutOfBounds.exit_code(), 1);
        // An empty query is a usage error, not a failed type search.
        assert_eq!(Error::EmptyQuery.exit_code(), 1);
    }
}

use quick_xml::Error as XMLError;
use std::{str::Utf8Error, string::FromUtf8Error};

/// Wrapper around `std::Result`
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug)]
pub enum Error {
    /// [`std::io`] related error.
    Io(std::io::Error),
    /// Decoding related error.
    /// Maybe the XML declaration has an encoding value that it doesn't recognize,
    /// or it doesn't match its actual encoding,
    CannotDecode,
    /// The text is not a well-formed xml document.
    MalformedDocument(String),
    /// The element has no parent to be removed from.
    DetachedElement,
    /// You need to call `element.detach()` before assigning another parent.
    HasAParent,
    /// The root element cannot be attached under another element.
    RootCannotMove,
    /// Tag and attribute names must be valid XML names.
    InvalidName,
    /// Element was not found among the children.
    NotFound,
    /// An element cannot be moved into its own subtree.
    CyclicInsert,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO Error: {}", err),
            Error::CannotDecode => write!(f, "Cannot decode XML"),
            Error::MalformedDocument(err) => write!(f, "Malformed XML document: {}", err),
            Error::DetachedElement => write!(f, "Element has no parent"),
            Error::HasAParent => write!(
                f,
                "Element already has a parent. Call detach() before changing parent."
            ),
            Error::RootCannotMove => write!(f, "Root element cannot move"),
            Error::InvalidName => write!(f, "Not a valid XML name"),
            Error::NotFound => write!(f, "Element not found"),
            Error::CyclicInsert => write!(f, "Element cannot be moved into its own subtree"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<XMLError> for Error {
    fn from(err: XMLError) -> Error {
        match err {
            XMLError::EndEventMismatch { expected, found } if expected.is_empty() => {
                Error::MalformedDocument(format!("Closing tag {} without opening tag", found))
            }
            XMLError::EndEventMismatch { expected, found } => Error::MalformedDocument(format!(
                "Closing tag mismatch. Expected {}, found {}",
                expected, found,
            )),
            XMLError::Io(err) => Error::Io(err),
            XMLError::Utf8(_) => Error::CannotDecode,
            err => Error::MalformedDocument(err.to_string()),
        }
    }
}

impl From<FromUtf8Error> for Error {
    fn from(_: FromUtf8Error) -> Error {
        Error::CannotDecode
    }
}

impl From<Utf8Error> for Error {
    fn from(_: Utf8Error) -> Error {
        Error::CannotDecode
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

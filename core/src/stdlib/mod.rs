//! Builtin function library.
//!
//! The callable surface is closed: free functions are [`Builtin`] variants and
//! methods are [`Method`] variants. Anything else is rejected at compile
//! time.

pub mod aggregate;
pub mod lookup;

pub use lookup::LookupTable;

/// Free functions over a list argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Len,
    Min,
    Max,
    Sum,
    Any,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "len" => Some(Builtin::Len),
            "min" => Some(Builtin::Min),
            "max" => Some(Builtin::Max),
            "sum" => Some(Builtin::Sum),
            "any" => Some(Builtin::Any),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Sum => "sum",
            Builtin::Any => "any",
        }
    }

    /// Keyword arguments the builtin accepts besides its single positional one.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Builtin::Min | Builtin::Max => &["default"],
            Builtin::Len | Builtin::Sum | Builtin::Any => &[],
        }
    }
}

/// Methods: `<list>.count(value)` and `{...}.get(key[, default])`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Count,
    Get,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "count" => Some(Method::Count),
            "get" => Some(Method::Get),
            _ => None,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime identifier of a grammar symbol.
///
/// Symbol `0` is the end of input. Terminals follow, then non-terminals, in
/// the order assigned when the grammar was compiled. [`Symbol::ERROR`] is
/// reserved for error nodes and is valid in every language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub u16);

impl Symbol {
    pub const END: Self = Self(0);
    pub const ERROR: Self = Self(u16::MAX);

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub const fn is_end(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_error(self) -> bool {
        self.0 == u16::MAX
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_error() {
            f.write_str("ERROR")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Identifier of a field name (`field('name', ...)` in a grammar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldId(pub u16);

impl FieldId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Parse-table state identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateId(pub u16);

impl StateId {
    /// Marker for nodes that were not produced by a regular shift or reduce,
    /// such as error nodes.
    pub const NONE: Self = Self(u16::MAX);

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Typed view over the symbols of one language.
///
/// Language crates generate a closed enum of their node kinds and implement
/// this trait so that callers can match on kinds instead of comparing names.
///
/// ```rust
/// use tessel::syntax::{Symbol, SyntaxKind};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum Kind {
///     Number,
///     Sum,
/// }
///
/// impl SyntaxKind for Kind {
///     fn from_symbol(symbol: Symbol) -> Option<Self> {
///         match symbol.0 {
///             1 => Some(Self::Number),
///             3 => Some(Self::Sum),
///             _ => None,
///         }
///     }
///
///     fn symbol(self) -> Symbol {
///         match self {
///             Self::Number => Symbol(1),
///             Self::Sum => Symbol(3),
///         }
///     }
/// }
///
/// assert_eq!(Kind::from_symbol(Symbol(3)), Some(Kind::Sum));
/// ```
pub trait SyntaxKind: Copy + Eq + std::hash::Hash + fmt::Debug + Send + Sync + 'static {
    /// Map a runtime symbol to the typed kind, if the kind is known.
    fn from_symbol(symbol: Symbol) -> Option<Self>;

    /// Runtime symbol of this kind.
    fn symbol(self) -> Symbol;
}

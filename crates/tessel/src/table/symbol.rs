use crate::grammar::Precedence;
use crate::syntax::{FieldId, Symbol};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// What a symbol is in the compiled grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    End,
    Terminal,
    NonTerminal,
    /// Hidden helper rule introduced by `repeat`.
    Auxiliary,
}

/// Metadata for one symbol of a language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: CompactString,
    pub kind: SymbolKind,
    /// Named symbols come from named rules and tokens; anonymous ones from
    /// inline literals and patterns.
    pub named: bool,
    /// Hidden symbols never appear in the tree: their children are spliced
    /// into the parent.
    pub visible: bool,
    pub extra: bool,
}

impl SymbolInfo {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.kind, SymbolKind::End | SymbolKind::Terminal)
    }
}

/// One alternative of a non-terminal after lowering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    pub lhs: Symbol,
    pub rhs: SmallVec<[Symbol; 4]>,
    /// Field ids by right-hand-side position.
    pub fields: SmallVec<[(u16, FieldId); 2]>,
    pub precedence: Option<Precedence>,
}

impl Production {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    #[must_use]
    pub fn field_at(&self, position: usize) -> Option<FieldId> {
        self.fields
            .iter()
            .find(|(pos, _)| usize::from(*pos) == position)
            .map(|(_, field)| *field)
    }

    /// Score used to rank competing parses: the production's precedence
    /// level, or zero.
    #[must_use]
    pub fn dynamic_precedence(&self) -> i32 {
        self.precedence.map_or(0, |prec| prec.level)
    }
}

/// Index of a production in the table.
pub type ProductionId = u16;

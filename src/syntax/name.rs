//! Parsed names: the `a::b::C[D]` paths and the modified type names built
//! from them. These are plain syntax — nothing here is resolved.

use std::fmt;

use crate::scope::symbol::TypeModifier;
use crate::source::{Ident, SrcLocation};

/// One `::`-separated path section, optionally carrying type arguments.
#[derive(Debug, Clone)]
pub struct SymbolNameSection {
    pub name: Ident,
    pub type_args: Vec<TypeName>,
}

impl SymbolNameSection {
    pub fn plain(name: Ident) -> SymbolNameSection {
        SymbolNameSection {
            name,
            type_args: vec![],
        }
    }
}

/// A possibly-absolute path. `global` is set for paths written with a
/// leading `::`, which resolve from the root scope instead of lexically.
#[derive(Clone)]
pub struct SymbolName {
    pub global: bool,
    pub sections: Vec<SymbolNameSection>,
    pub location: SrcLocation,
}

impl SymbolName {
    pub fn last(&self) -> &SymbolNameSection {
        self.sections.last().expect("symbol names are non-empty")
    }
}

impl fmt::Debug for SymbolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.global {
            write!(f, "::")?;
        }
        for (i, section) in self.sections.iter().enumerate() {
            if i != 0 {
                write!(f, "::")?;
            }
            write!(f, "{}", section.name.name)?;
            if !section.type_args.is_empty() {
                write!(f, "[")?;
                for (j, arg) in section.type_args.iter().enumerate() {
                    if j != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg:?}")?;
                }
                write!(f, "]")?;
            }
        }
        Ok(())
    }
}

/// A type as written: modifier sigils applied to a path, outermost first.
/// `&*T` reads as a reference to a strong pointer to `T`.
#[derive(Clone)]
pub struct TypeName {
    pub modifiers: Vec<(TypeModifier, SrcLocation)>,
    pub name: SymbolName,
    pub location: SrcLocation,
}

impl TypeName {
    pub fn plain(name: SymbolName) -> TypeName {
        TypeName {
            modifiers: vec![],
            location: name.location.clone(),
            name,
        }
    }
}

impl fmt::Debug for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (modifier, _) in &self.modifiers {
            let sigil = match modifier {
                TypeModifier::Ref => "&",
                TypeModifier::StrongPtr => "*",
                TypeModifier::DynStrongPtr => "*dyn ",
                TypeModifier::WeakPtr => "~",
                TypeModifier::DynTrait => "dyn ",
            };
            write!(f, "{sigil}")?;
        }
        write!(f, "{:?}", self.name)
    }
}

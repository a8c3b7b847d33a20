//! Type symbols: the native table, composite (modified) types, and the
//! conversion lattice consulted by the type checker.
//!
//! A type is just a symbol — nominal (struct/trait), a type parameter, an
//! alias, or a modified type wrapping another. Modified types are interned
//! in a [`TypeStore`] so that `&T` names the same symbol everywhere, which
//! lets type equality stay pointer equality.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::source::{Ident, SrcBuffer, SrcLocation};

use super::symbol::{
    AccessModifier, ErrorCategory, ModifiedTypeSymbol, ModuleSymbol, StructSymbol, Symbol,
    SymbolKind, TypeModifier,
};
use super::Scope;

/// Interns composite type symbols per compilation.
#[derive(Default)]
pub struct TypeStore {
    cache: RefCell<HashMap<(usize, TypeModifier), Rc<Symbol>>>,
}

impl TypeStore {
    pub fn new() -> TypeStore {
        TypeStore::default()
    }

    /// Apply a modifier to a base type, canonicalizing first: aliases
    /// resolve to their target (`&Self` and `&Vec` are one symbol), a
    /// reference to a reference collapses (`&&T` is `&T`), and modifying
    /// an error type yields the error type unchanged.
    pub fn modified(&self, base: Rc<Symbol>, modifier: TypeModifier) -> Rc<Symbol> {
        let base = base.unalias();
        if base.is_error() {
            return base;
        }

        if modifier == TypeModifier::Ref {
            if let SymbolKind::ModifiedType(m) = &base.kind {
                if m.modifier == TypeModifier::Ref {
                    return base;
                }
            }
        }

        let key = (base.id(), modifier);
        if let Some(cached) = self.cache.borrow().get(&key) {
            return Rc::clone(cached);
        }

        let name = Ident::new(
            base.name.location.clone(),
            format!("{}{}", modifier_sigil(modifier), base.name.name),
        );
        let symbol = Symbol::new(
            name,
            AccessModifier::Pub,
            SymbolKind::ModifiedType(ModifiedTypeSymbol {
                modifier,
                inner: Rc::clone(&base),
            }),
        );

        self.cache.borrow_mut().insert(key, Rc::clone(&symbol));
        symbol
    }

    /// Strip one reference layer, if present.
    pub fn deref(&self, ty: &Rc<Symbol>) -> Option<Rc<Symbol>> {
        match &ty.kind {
            SymbolKind::ModifiedType(m) if m.modifier == TypeModifier::Ref => {
                Some(Rc::clone(&m.inner))
            }
            _ => None,
        }
    }
}

fn modifier_sigil(modifier: TypeModifier) -> &'static str {
    match modifier {
        TypeModifier::Ref => "&",
        TypeModifier::StrongPtr => "*",
        TypeModifier::DynStrongPtr => "*dyn ",
        TypeModifier::WeakPtr => "~",
        TypeModifier::DynTrait => "dyn ",
    }
}

/// The native types registered during compilation bootstrap. Each lives at
/// `::std::<keyword>::<Name>`, matching the path the lexer expands
/// native-type keywords into.
pub struct NativeTypes {
    pub int8: Rc<Symbol>,
    pub int16: Rc<Symbol>,
    pub int32: Rc<Symbol>,
    pub int64: Rc<Symbol>,
    pub uint8: Rc<Symbol>,
    pub uint16: Rc<Symbol>,
    pub uint32: Rc<Symbol>,
    pub uint64: Rc<Symbol>,
    pub int: Rc<Symbol>,
    pub float32: Rc<Symbol>,
    pub float64: Rc<Symbol>,
    pub bool_: Rc<Symbol>,
    pub void: Rc<Symbol>,
    pub string: Rc<Symbol>,
    pub ptr: Rc<Symbol>,

    pub error_type: Rc<Symbol>,
    pub error_trait: Rc<Symbol>,
    pub error_function: Rc<Symbol>,
    pub error_variable: Rc<Symbol>,
}

impl NativeTypes {
    pub fn bootstrap(root: &Rc<Scope>) -> NativeTypes {
        let std_scope = root.create_child("std");
        std_scope.mark_module_body();
        let std_module = Symbol::new(
            synthetic_ident("std"),
            AccessModifier::Pub,
            SymbolKind::Module(ModuleSymbol {
                body_scope: Rc::clone(&std_scope),
            }),
        );
        root.define(std_module);

        let register = |keyword: &str, type_name: &str| -> Rc<Symbol> {
            let module_scope = std_scope.create_child(keyword);
            module_scope.mark_module_body();
            let module = Symbol::new(
                synthetic_ident(keyword),
                AccessModifier::Pub,
                SymbolKind::Module(ModuleSymbol {
                    body_scope: Rc::clone(&module_scope),
                }),
            );
            std_scope.define(module);

            let body_scope = module_scope.create_child(type_name);
            let ty = Symbol::new(
                synthetic_ident(type_name),
                AccessModifier::Pub,
                SymbolKind::Struct(StructSymbol {
                    body_scope,
                    type_params: RefCell::new(vec![]),
                    fields: RefCell::new(vec![]),
                }),
            );
            module_scope.define(Rc::clone(&ty)).value
        };

        NativeTypes {
            int8: register("i8", "I8"),
            int16: register("i16", "I16"),
            int32: register("i32", "I32"),
            int64: register("i64", "I64"),
            uint8: register("u8", "U8"),
            uint16: register("u16", "U16"),
            uint32: register("u32", "U32"),
            uint64: register("u64", "U64"),
            int: register("int", "Int"),
            float32: register("f32", "F32"),
            float64: register("f64", "F64"),
            bool_: register("bool", "Bool"),
            void: register("void", "Void"),
            string: register("string", "String"),
            ptr: register("ptr", "Ptr"),

            error_type: error_symbol(ErrorCategory::Type),
            error_trait: error_symbol(ErrorCategory::Trait),
            error_function: error_symbol(ErrorCategory::Function),
            error_variable: error_symbol(ErrorCategory::Variable),
        }
    }

    pub fn is_signed_integer(&self, ty: &Rc<Symbol>) -> bool {
        [&self.int8, &self.int16, &self.int32, &self.int64, &self.int]
            .iter()
            .any(|n| n.is_same(ty))
    }

    pub fn is_unsigned_integer(&self, ty: &Rc<Symbol>) -> bool {
        [&self.uint8, &self.uint16, &self.uint32, &self.uint64]
            .iter()
            .any(|n| n.is_same(ty))
    }

    pub fn is_integer(&self, ty: &Rc<Symbol>) -> bool {
        self.is_signed_integer(ty) || self.is_unsigned_integer(ty)
    }

    pub fn is_float(&self, ty: &Rc<Symbol>) -> bool {
        self.float32.is_same(ty) || self.float64.is_same(ty)
    }

    pub fn is_numeric(&self, ty: &Rc<Symbol>) -> bool {
        self.is_integer(ty) || self.is_float(ty)
    }

    /// The value range of an integer native type, for literal fit checks.
    pub fn integer_range(&self, ty: &Rc<Symbol>) -> Option<(i128, i128)> {
        Some(if self.int8.is_same(ty) {
            (i8::MIN as i128, i8::MAX as i128)
        } else if self.int16.is_same(ty) {
            (i16::MIN as i128, i16::MAX as i128)
        } else if self.int32.is_same(ty) {
            (i32::MIN as i128, i32::MAX as i128)
        } else if self.int64.is_same(ty) || self.int.is_same(ty) {
            (i64::MIN as i128, i64::MAX as i128)
        } else if self.uint8.is_same(ty) {
            (0, u8::MAX as i128)
        } else if self.uint16.is_same(ty) {
            (0, u16::MAX as i128)
        } else if self.uint32.is_same(ty) {
            (0, u32::MAX as i128)
        } else if self.uint64.is_same(ty) {
            (0, u64::MAX as i128)
        } else {
            return None;
        })
    }

    /// The fixed widening lattice. `from` converts implicitly to `to` iff
    /// `to` appears in `from`'s listed targets.
    pub fn widens_to(&self, from: &Rc<Symbol>, to: &Rc<Symbol>) -> bool {
        self.widening_targets(from)
            .iter()
            .any(|target| target.is_same(to))
    }

    fn widening_targets(&self, from: &Rc<Symbol>) -> Vec<Rc<Symbol>> {
        let all = |symbols: &[&Rc<Symbol>]| symbols.iter().map(|s| Rc::clone(s)).collect();

        if from.is_same(&self.int8) {
            all(&[
                &self.int16,
                &self.int32,
                &self.int64,
                &self.int,
                &self.float32,
                &self.float64,
            ])
        } else if from.is_same(&self.int16) {
            all(&[
                &self.int32,
                &self.int64,
                &self.int,
                &self.float32,
                &self.float64,
            ])
        } else if from.is_same(&self.int32) {
            all(&[&self.int64, &self.int, &self.float64])
        } else if from.is_same(&self.int) {
            all(&[&self.int64])
        } else if from.is_same(&self.int64) {
            all(&[&self.int])
        } else if from.is_same(&self.uint8) {
            all(&[
                &self.uint16,
                &self.uint32,
                &self.uint64,
                &self.int16,
                &self.int32,
                &self.int64,
                &self.int,
                &self.float32,
                &self.float64,
            ])
        } else if from.is_same(&self.uint16) {
            all(&[
                &self.uint32,
                &self.uint64,
                &self.int32,
                &self.int64,
                &self.int,
                &self.float32,
                &self.float64,
            ])
        } else if from.is_same(&self.uint32) {
            all(&[&self.uint64, &self.int64, &self.int, &self.float64])
        } else if from.is_same(&self.float32) {
            all(&[&self.float64])
        } else {
            vec![]
        }
    }
}

fn synthetic_ident(name: &str) -> Ident {
    let buffer = SrcBuffer::package_root("std");
    Ident::new(SrcLocation::new(buffer, 0, 0), name)
}

pub fn error_symbol(category: ErrorCategory) -> Rc<Symbol> {
    Symbol::new(
        synthetic_ident("<error>"),
        AccessModifier::Pub,
        SymbolKind::Error(category),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn natives() -> (Rc<Scope>, NativeTypes) {
        let root = Scope::new_root();
        let natives = NativeTypes::bootstrap(&root);
        (root, natives)
    }

    #[test]
    fn test_native_paths_resolve_from_root() {
        let (root, natives) = natives();

        let std_scope = root.lookup_local("std")[0].provided_scope().unwrap();
        let i32_scope = std_scope.lookup_local("i32")[0].provided_scope().unwrap();

        assert!(i32_scope.lookup_local("I32")[0].is_same(&natives.int32));
    }

    #[test]
    fn test_modified_types_are_interned() {
        let (_root, natives) = natives();
        let store = TypeStore::new();

        let a = store.modified(Rc::clone(&natives.int32), TypeModifier::Ref);
        let b = store.modified(Rc::clone(&natives.int32), TypeModifier::Ref);

        assert!(a.is_same(&b));
    }

    #[test]
    fn test_double_reference_collapses() {
        let (_root, natives) = natives();
        let store = TypeStore::new();

        let once = store.modified(Rc::clone(&natives.int32), TypeModifier::Ref);
        let twice = store.modified(Rc::clone(&once), TypeModifier::Ref);

        assert!(once.is_same(&twice));
        assert!(store.deref(&twice).unwrap().is_same(&natives.int32));
    }

    #[test]
    fn test_widening_lattice() {
        let (_root, natives) = natives();

        assert!(natives.widens_to(&natives.int8, &natives.int16));
        assert!(natives.widens_to(&natives.int8, &natives.int64));
        assert!(natives.widens_to(&natives.uint8, &natives.int16));
        assert!(natives.widens_to(&natives.float32, &natives.float64));

        assert!(!natives.widens_to(&natives.int64, &natives.int32));
        assert!(!natives.widens_to(&natives.float64, &natives.float32));
        assert!(!natives.widens_to(&natives.int64, &natives.uint64));
    }

    #[test]
    fn test_integer_ranges() {
        let (_root, natives) = natives();

        assert_eq!(natives.integer_range(&natives.uint8), Some((0, 255)));
        assert_eq!(natives.integer_range(&natives.int8), Some((-128, 127)));
        assert_eq!(natives.integer_range(&natives.bool_), None);
    }
}

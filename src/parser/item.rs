//! Item parsing: modules, structs, traits, functions, globals, impls and
//! uses, plus the shared header helpers (names, type parameters,
//! modifiers) they are built from.

use std::cell::RefCell;
use std::rc::Rc;

use crate::diagnostics::{Diagnosed, Diagnostic, DiagnosticBag, DiagnosticKind, Expected};
use crate::lexer::TokenKind;
use crate::scope::symbol::{AccessModifier, SelfKind, TypeModifier};
use crate::scope::Scope;
use crate::source::{Ident, SrcLocation};
use crate::syntax::items::{
    operator_function_name, AttributeSyntax, ConstraintSyntax, FieldVarSyntax, FunctionSyntax,
    GlobalVarSyntax, ImplSyntax, ItemSyntax, ModSyntax, ParamVarSyntax, PrototypeSyntax,
    SelfParamSyntax, StructSyntax, TraitSyntax, TypeParamSyntax, UseSyntax,
};
use crate::syntax::name::{SymbolName, SymbolNameSection, TypeName};
use crate::syntax::stmts::BlockStmtSyntax;

use super::{fail, Discard, Parser};

struct Modifiers {
    access: AccessModifier,
    is_extern: bool,
    locations: Vec<(TokenKind, SrcLocation)>,
}

impl<'a> Parser<'a> {
    pub(crate) fn parse_item(&mut self, scope: &Rc<Scope>) -> Expected<ItemSyntax> {
        if self.at(TokenKind::UseKeyword)
            || (self.at(TokenKind::PubKeyword) && self.peek_at(1).kind == TokenKind::UseKeyword)
        {
            return self.parse_use(scope).map(|d| d.map(ItemSyntax::Use));
        }
        if self.is_inherent_impl_begin() || self.is_trait_impl_begin() {
            return self.parse_impl(scope);
        }
        if self.is_mod_begin() {
            return self.parse_mod(scope).map(|d| d.map(ItemSyntax::Mod));
        }
        if self.is_struct_begin() {
            return self.parse_struct(scope).map(|d| d.map(ItemSyntax::Struct));
        }
        if self.is_trait_begin() {
            return self.parse_trait(scope).map(|d| d.map(ItemSyntax::Trait));
        }
        if self.is_function_begin() {
            return self
                .parse_function(scope)
                .map(|d| d.map(ItemSyntax::Function));
        }
        if self.is_var_begin() {
            return self
                .parse_global_var(scope)
                .map(|d| d.map(ItemSyntax::GlobalVar));
        }

        fail(self.unexpected_token("an item"))
    }

    // ---- header-shape disambiguation; these only peek ----

    fn scan_past_modifiers(&self) -> usize {
        let mut i = 0;
        while matches!(
            self.peek_at(i).kind,
            TokenKind::PubKeyword | TokenKind::ExternKeyword
        ) {
            i += 1;
        }
        // attributes sit between modifiers and the name
        while self.peek_at(i).kind == TokenKind::OpenBracket
            && self.peek_at(i + 1).kind == TokenKind::OpenBracket
        {
            match self.scan_past_brackets(i + 1) {
                Some(next) if self.peek_at(next).kind == TokenKind::CloseBracket => i = next + 1,
                _ => break,
            }
        }
        i
    }

    /// Skip a balanced `[...]` group starting at `i`; returns the index
    /// one past the closing bracket.
    fn scan_past_brackets(&self, i: usize) -> Option<usize> {
        if self.peek_at(i).kind != TokenKind::OpenBracket {
            return Some(i);
        }
        let mut depth = 0;
        let mut i = i;
        loop {
            match self.peek_at(i).kind {
                TokenKind::OpenBracket => depth += 1,
                TokenKind::CloseBracket => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i + 1);
                    }
                }
                TokenKind::EndOfFile => return None,
                _ => {}
            }
            i += 1;
        }
    }

    pub(crate) fn is_mod_begin(&self) -> bool {
        let mut i = self.scan_past_modifiers();
        if self.peek_at(i).kind != TokenKind::Identifier {
            return false;
        }
        i += 1;
        while self.peek_at(i).kind == TokenKind::ColonColon
            && self.peek_at(i + 1).kind == TokenKind::Identifier
        {
            i += 2;
        }
        if self.peek_at(i).kind != TokenKind::Colon {
            return false;
        }
        i += 1;
        if self.peek_at(i).kind == TokenKind::PubKeyword {
            i += 1;
        }
        self.peek_at(i).kind == TokenKind::ModKeyword
    }

    pub(crate) fn is_struct_begin(&self) -> bool {
        self.is_type_header(TokenKind::StructKeyword)
    }

    pub(crate) fn is_trait_begin(&self) -> bool {
        self.is_type_header(TokenKind::TraitKeyword)
    }

    fn is_type_header(&self, keyword: TokenKind) -> bool {
        let mut i = self.scan_past_modifiers();
        if self.peek_at(i).kind != TokenKind::Identifier {
            return false;
        }
        i += 1;
        let Some(mut i) = self.scan_past_brackets(i) else {
            return false;
        };
        if self.peek_at(i).kind != TokenKind::Colon {
            return false;
        }
        i += 1;
        if self.peek_at(i).kind == TokenKind::PubKeyword {
            i += 1;
        }
        self.peek_at(i).kind == keyword
    }

    pub(crate) fn is_function_begin(&self) -> bool {
        let i = self.scan_past_modifiers();

        // operator form: `op + (...)`
        if self.peek_at(i).kind == TokenKind::OpKeyword {
            return true;
        }

        // named form: `name : [T]? ( ... )`
        if self.peek_at(i).kind != TokenKind::Identifier {
            return false;
        }
        if self.peek_at(i + 1).kind != TokenKind::Colon {
            return false;
        }
        let Some(j) = self.scan_past_brackets(i + 2) else {
            return false;
        };
        self.peek_at(j).kind == TokenKind::OpenParen
    }

    pub(crate) fn is_var_begin(&self) -> bool {
        let i = self.scan_past_modifiers();
        self.peek_at(i).kind == TokenKind::Identifier && self.peek_at(i + 1).kind == TokenKind::Colon
    }

    pub(crate) fn is_inherent_impl_begin(&self) -> bool {
        self.at(TokenKind::ImplKeyword) && !self.impl_has_for()
    }

    pub(crate) fn is_trait_impl_begin(&self) -> bool {
        self.at(TokenKind::ImplKeyword) && self.impl_has_for()
    }

    /// An impl is a trait impl iff `for` appears before the next brace or
    /// semicolon.
    fn impl_has_for(&self) -> bool {
        let mut i = 0;
        loop {
            match self.peek_at(i).kind {
                TokenKind::ForKeyword => return true,
                TokenKind::OpenBrace
                | TokenKind::CloseBrace
                | TokenKind::Semicolon
                | TokenKind::EndOfFile => return false,
                _ => i += 1,
            }
        }
    }

    // ---- shared header pieces ----

    fn parse_modifiers(&mut self, allowed: &[TokenKind]) -> Diagnosed<Modifiers> {
        let mut diagnostics = DiagnosticBag::new();
        let mut modifiers = Modifiers {
            access: AccessModifier::Priv,
            is_extern: false,
            locations: vec![],
        };

        while matches!(
            self.peek().kind,
            TokenKind::PubKeyword | TokenKind::ExternKeyword
        ) {
            let token = self.bump();

            let duplicate = modifiers.locations.iter().any(|(k, _)| *k == token.kind);
            if duplicate {
                diagnostics.add(Diagnostic::error(
                    DiagnosticKind::UnknownModifier,
                    token.location.clone(),
                    format!("modifier {:?} repeated", token.kind),
                ));
                continue;
            }
            if !allowed.contains(&token.kind) {
                diagnostics.add(Diagnostic::error(
                    DiagnosticKind::ForbiddenModifier,
                    token.location.clone(),
                    format!("modifier {:?} is not allowed here", token.kind),
                ));
                continue;
            }

            match token.kind {
                TokenKind::PubKeyword => modifiers.access = AccessModifier::Pub,
                TokenKind::ExternKeyword => modifiers.is_extern = true,
                _ => {}
            }
            modifiers.locations.push((token.kind, token.location));
        }

        Diagnosed::new(modifiers, diagnostics)
    }

    fn parse_attributes(&mut self) -> Diagnosed<Vec<AttributeSyntax>> {
        let mut diagnostics = DiagnosticBag::new();
        let mut attributes = vec![];

        while self.at(TokenKind::OpenBracket) && self.peek_at(1).kind == TokenKind::OpenBracket {
            let open = self.bump();
            self.bump();
            let name = self.expect(TokenKind::Identifier, &mut diagnostics);
            self.expect(TokenKind::CloseBracket, &mut diagnostics);
            let close = self.expect(TokenKind::CloseBracket, &mut diagnostics);

            attributes.push(AttributeSyntax {
                location: SrcLocation::merge(&open.location, &close.location),
                name: Ident::new(name.location, name.text),
            });
        }

        Diagnosed::new(attributes, diagnostics)
    }

    pub(crate) fn parse_name(&mut self, diagnostics: &mut DiagnosticBag) -> Ident {
        let token = self.expect(TokenKind::Identifier, diagnostics);
        Ident::new(token.location, token.text)
    }

    /// `a::b::c` without type arguments, for module headers.
    fn parse_nested_name(&mut self, diagnostics: &mut DiagnosticBag) -> Vec<Ident> {
        let mut names = vec![self.parse_name(diagnostics)];
        while self.at(TokenKind::ColonColon) {
            self.bump();
            names.push(self.parse_name(diagnostics));
        }
        names
    }

    pub(crate) fn parse_symbol_name(&mut self, diagnostics: &mut DiagnosticBag) -> SymbolName {
        let begin = self.location();
        let global = self.eat(TokenKind::ColonColon).is_some();

        let mut sections = vec![self.parse_symbol_name_section(diagnostics)];
        while self.at(TokenKind::ColonColon) {
            self.bump();
            sections.push(self.parse_symbol_name_section(diagnostics));
        }

        SymbolName {
            global,
            sections,
            location: SrcLocation::merge(&begin, &self.last_location()),
        }
    }

    fn parse_symbol_name_section(
        &mut self,
        diagnostics: &mut DiagnosticBag,
    ) -> SymbolNameSection {
        let name = self.parse_name(diagnostics);
        let mut type_args = vec![];

        if self.at(TokenKind::OpenBracket) {
            let open = self.bump();
            if self.at(TokenKind::CloseBracket) {
                diagnostics.add(Diagnostic::error(
                    DiagnosticKind::EmptyTemplateArgs,
                    SrcLocation::merge(&open.location, &self.location()),
                    "empty template argument list",
                ));
                self.bump();
            } else {
                loop {
                    type_args.push(self.parse_type_name(diagnostics));
                    if self.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
                self.expect(TokenKind::CloseBracket, diagnostics);
            }
        }

        SymbolNameSection { name, type_args }
    }

    pub(crate) fn parse_type_name(&mut self, diagnostics: &mut DiagnosticBag) -> TypeName {
        let begin = self.location();
        let mut modifiers = vec![];

        loop {
            match self.peek().kind {
                TokenKind::Ampersand => {
                    let token = self.bump();
                    modifiers.push((TypeModifier::Ref, token.location));
                }
                TokenKind::AmpersandAmpersand => {
                    // `&&T` arrives as one token; the type layer collapses
                    // the double reference anyway
                    let token = self.bump();
                    modifiers.push((TypeModifier::Ref, token.location.clone()));
                    modifiers.push((TypeModifier::Ref, token.location));
                }
                TokenKind::Asterisk => {
                    let token = self.bump();
                    modifiers.push((TypeModifier::StrongPtr, token.location));
                }
                TokenKind::Tilde => {
                    let token = self.bump();
                    modifiers.push((TypeModifier::WeakPtr, token.location));
                }
                _ => break,
            }
        }

        let name = self.parse_symbol_name(diagnostics);
        TypeName {
            modifiers,
            location: SrcLocation::merge(&begin, &name.location),
            name,
        }
    }

    /// `[T, U]` — the type-param symbols land in `body_scope`.
    fn parse_type_params(
        &mut self,
        body_scope: &Rc<Scope>,
        diagnostics: &mut DiagnosticBag,
    ) -> Vec<Rc<TypeParamSyntax>> {
        if !self.at(TokenKind::OpenBracket) {
            return vec![];
        }

        let open = self.bump();
        if self.at(TokenKind::CloseBracket) {
            diagnostics.add(Diagnostic::error(
                DiagnosticKind::EmptyTemplateParams,
                SrcLocation::merge(&open.location, &self.location()),
                "empty template parameter list",
            ));
            self.bump();
            return vec![];
        }

        let mut params = vec![];
        loop {
            let name = self.parse_name(diagnostics);
            params.push(Rc::new(TypeParamSyntax {
                location: name.location.clone(),
                body_scope: Rc::clone(body_scope),
                name,
                index: params.len(),
                symbol: RefCell::new(None),
            }));
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::CloseBracket, diagnostics);
        params
    }

    // ---- items ----

    fn parse_mod(&mut self, scope: &Rc<Scope>) -> Expected<Rc<ModSyntax>> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        let modifiers =
            diagnostics.unwrap(self.parse_modifiers(&[TokenKind::PubKeyword]));
        let name = self.parse_nested_name(&mut diagnostics);
        self.expect(TokenKind::Colon, &mut diagnostics);

        let mut access = modifiers.access;
        if self.eat(TokenKind::PubKeyword).is_some() {
            access = AccessModifier::Pub;
        }
        self.expect(TokenKind::ModKeyword, &mut diagnostics);
        self.expect(TokenKind::OpenBrace, &mut diagnostics);

        // modules split across files re-enter the same scope
        let mut body_scope = Rc::clone(scope);
        for segment in &name {
            body_scope = body_scope
                .find_child(&segment.name)
                .unwrap_or_else(|| body_scope.create_child(segment.name.clone()));
        }
        body_scope.mark_module_body();

        let mut items = vec![];
        while !self.at(TokenKind::CloseBrace) && !self.at(TokenKind::EndOfFile) {
            match self.parse_item(&body_scope) {
                Ok(item) => items.push(diagnostics.unwrap(item)),
                Err(bag) => {
                    diagnostics.merge(bag);
                    self.discard_until(
                        &[TokenKind::Semicolon, TokenKind::CloseBrace],
                        Discard::Inclusive,
                    );
                }
            }
        }
        let end = self.expect(TokenKind::CloseBrace, &mut diagnostics);

        Ok(Diagnosed::new(
            Rc::new(ModSyntax {
                location: SrcLocation::merge(&begin, &end.location),
                scope: Rc::clone(scope),
                body_scope,
                name,
                access,
                items,
                symbol: RefCell::new(None),
            }),
            diagnostics,
        ))
    }

    fn parse_struct(&mut self, scope: &Rc<Scope>) -> Expected<Rc<StructSyntax>> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        let modifiers =
            diagnostics.unwrap(self.parse_modifiers(&[TokenKind::PubKeyword]));
        let name = self.parse_name(&mut diagnostics);

        let body_scope = scope.create_child(name.name.clone());
        let type_params = self.parse_type_params(&body_scope, &mut diagnostics);

        self.expect(TokenKind::Colon, &mut diagnostics);
        let mut access = modifiers.access;
        if self.eat(TokenKind::PubKeyword).is_some() {
            access = AccessModifier::Pub;
        }
        self.expect(TokenKind::StructKeyword, &mut diagnostics);
        self.expect(TokenKind::OpenBrace, &mut diagnostics);

        let mut fields = vec![];
        while !self.at(TokenKind::CloseBrace) && !self.at(TokenKind::EndOfFile) {
            let field_modifiers =
                diagnostics.unwrap(self.parse_modifiers(&[TokenKind::PubKeyword]));
            let field_name = self.parse_name(&mut diagnostics);
            self.expect(TokenKind::Colon, &mut diagnostics);
            let type_name = self.parse_type_name(&mut diagnostics);

            fields.push(Rc::new(FieldVarSyntax {
                location: SrcLocation::merge(&field_name.location, &type_name.location),
                scope: Rc::clone(&body_scope),
                name: field_name,
                access: field_modifiers.access,
                type_name,
                index: fields.len(),
                symbol: RefCell::new(None),
            }));

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        let end = self.expect(TokenKind::CloseBrace, &mut diagnostics);

        Ok(Diagnosed::new(
            Rc::new(StructSyntax {
                location: SrcLocation::merge(&begin, &end.location),
                scope: Rc::clone(scope),
                body_scope,
                name,
                access,
                type_params,
                fields,
                symbol: RefCell::new(None),
            }),
            diagnostics,
        ))
    }

    fn parse_trait(&mut self, scope: &Rc<Scope>) -> Expected<Rc<TraitSyntax>> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        let modifiers =
            diagnostics.unwrap(self.parse_modifiers(&[TokenKind::PubKeyword]));
        let name = self.parse_name(&mut diagnostics);

        let body_scope = scope.create_child(name.name.clone());
        let type_params = self.parse_type_params(&body_scope, &mut diagnostics);

        self.expect(TokenKind::Colon, &mut diagnostics);
        self.expect(TokenKind::TraitKeyword, &mut diagnostics);

        let mut supertraits = vec![];
        if self.eat(TokenKind::Colon).is_some() {
            loop {
                supertraits.push(self.parse_symbol_name(&mut diagnostics));
                if self.eat(TokenKind::Plus).is_none() {
                    break;
                }
            }
        }

        self.expect(TokenKind::OpenBrace, &mut diagnostics);

        let mut prototypes = vec![];
        while !self.at(TokenKind::CloseBrace) && !self.at(TokenKind::EndOfFile) {
            match self.parse_prototype(&body_scope, prototypes.len()) {
                Ok(prototype) => prototypes.push(diagnostics.unwrap(prototype)),
                Err(bag) => {
                    diagnostics.merge(bag);
                    self.discard_until(
                        &[TokenKind::Semicolon, TokenKind::CloseBrace],
                        Discard::Inclusive,
                    );
                }
            }
        }
        let end = self.expect(TokenKind::CloseBrace, &mut diagnostics);

        Ok(Diagnosed::new(
            Rc::new(TraitSyntax {
                location: SrcLocation::merge(&begin, &end.location),
                scope: Rc::clone(scope),
                body_scope,
                name,
                access: modifiers.access,
                type_params,
                supertraits,
                prototypes,
                symbol: RefCell::new(None),
            }),
            diagnostics,
        ))
    }

    fn parse_prototype(
        &mut self,
        trait_scope: &Rc<Scope>,
        index: usize,
    ) -> Expected<Rc<PrototypeSyntax>> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        let name = self.parse_name(&mut diagnostics);
        self.expect(TokenKind::Colon, &mut diagnostics);
        let (self_param, params) = self.parse_params(trait_scope, &mut diagnostics);
        self.expect(TokenKind::Colon, &mut diagnostics);
        let return_type = self.parse_type_name(&mut diagnostics);
        let end = self.expect(TokenKind::Semicolon, &mut diagnostics);

        Ok(Diagnosed::new(
            Rc::new(PrototypeSyntax {
                location: SrcLocation::merge(&begin, &end.location),
                scope: Rc::clone(trait_scope),
                name,
                index,
                self_param,
                params,
                return_type,
                symbol: RefCell::new(None),
            }),
            diagnostics,
        ))
    }

    /// `( [*]self, name: Type, ... )`
    fn parse_params(
        &mut self,
        scope: &Rc<Scope>,
        diagnostics: &mut DiagnosticBag,
    ) -> (Option<SelfParamSyntax>, Vec<Rc<ParamVarSyntax>>) {
        self.expect(TokenKind::OpenParen, diagnostics);

        let mut self_param = None;
        let mut params = vec![];
        let mut first = true;

        while !self.at(TokenKind::CloseParen) && !self.at(TokenKind::EndOfFile) {
            if !first {
                self.expect(TokenKind::Comma, diagnostics);
                if self.at(TokenKind::CloseParen) {
                    break;
                }
            }
            first = false;

            // receiver forms: `self`, `*self`; a stray `*` still
            // synthesizes the reference receiver so later phases see a
            // well-formed signature
            if self.at(TokenKind::SelfKeyword)
                || (self.at(TokenKind::Asterisk) && params.is_empty() && self_param.is_none())
            {
                let begin = self.location();
                let strong = self.eat(TokenKind::Asterisk).is_some();
                let kind = if strong {
                    SelfKind::StrongPtrRef
                } else {
                    SelfKind::Ref
                };

                if self.eat(TokenKind::SelfKeyword).is_none() {
                    diagnostics.add(Diagnostic::error(
                        DiagnosticKind::MissingSelfModifierAfterStrongPtr,
                        begin.clone(),
                        "expected `self` after `*`",
                    ));
                }

                self_param = Some(SelfParamSyntax {
                    location: SrcLocation::merge(&begin, &self.last_location()),
                    kind,
                    symbol: RefCell::new(None),
                });
                continue;
            }

            let name = self.parse_name(diagnostics);
            self.expect(TokenKind::Colon, diagnostics);
            let type_name = self.parse_type_name(diagnostics);

            params.push(Rc::new(ParamVarSyntax {
                location: SrcLocation::merge(&name.location, &type_name.location),
                scope: Rc::clone(scope),
                name,
                index: params.len(),
                type_name,
                symbol: RefCell::new(None),
            }));
        }
        self.expect(TokenKind::CloseParen, diagnostics);

        (self_param, params)
    }

    pub(crate) fn parse_function(&mut self, scope: &Rc<Scope>) -> Expected<Rc<FunctionSyntax>> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        let modifiers = diagnostics
            .unwrap(self.parse_modifiers(&[TokenKind::PubKeyword, TokenKind::ExternKeyword]));
        let attributes = diagnostics.unwrap(self.parse_attributes());

        let (name, operator, body_scope, type_params) = if self.at(TokenKind::OpKeyword) {
            self.bump();
            let op_token = self.bump();
            let body_scope = scope.create_child_anon();
            (
                Ident::new(op_token.location.clone(), op_token.text.clone()),
                Some(op_token.kind),
                body_scope,
                vec![],
            )
        } else {
            let name = self.parse_name(&mut diagnostics);
            self.expect(TokenKind::Colon, &mut diagnostics);
            let body_scope = scope.create_child(name.name.clone());
            let type_params = self.parse_type_params(&body_scope, &mut diagnostics);
            (name, None, body_scope, type_params)
        };

        let (self_param, params) = self.parse_params(&body_scope, &mut diagnostics);

        // the operator spells the function name once the arity is known
        let name = match operator {
            Some(op) => {
                let arity = params.len() + if self_param.is_some() { 1 } else { 0 };
                match operator_function_name(op, arity) {
                    Some(op_name) => Ident::new(name.location.clone(), op_name),
                    None => {
                        diagnostics.add(Diagnostic::error(
                            DiagnosticKind::UnexpectedToken,
                            name.location.clone(),
                            format!("'{}' is not an overloadable operator", name.name),
                        ));
                        name
                    }
                }
            }
            None => name,
        };

        self.expect(TokenKind::Colon, &mut diagnostics);
        let return_type = self.parse_type_name(&mut diagnostics);
        let constraints = self.parse_where_clause(&body_scope, &mut diagnostics);

        let body = if self.at(TokenKind::OpenBrace) {
            Some(diagnostics.unwrap_or(self.parse_block(&body_scope), empty_block(&body_scope)))
        } else {
            self.expect(TokenKind::Semicolon, &mut diagnostics);
            None
        };

        Ok(Diagnosed::new(
            Rc::new(FunctionSyntax {
                location: SrcLocation::merge(&begin, &self.last_location()),
                scope: Rc::clone(scope),
                body_scope,
                name,
                access: modifiers.access,
                is_extern: modifiers.is_extern,
                operator,
                type_params,
                self_param,
                params,
                return_type,
                constraints,
                attributes,
                body,
                symbol: RefCell::new(None),
            }),
            diagnostics,
        ))
    }

    /// `where T: Trait1 + Trait2, U: Trait3`
    fn parse_where_clause(
        &mut self,
        scope: &Rc<Scope>,
        diagnostics: &mut DiagnosticBag,
    ) -> Vec<ConstraintSyntax> {
        if self.eat(TokenKind::WhereKeyword).is_none() {
            return vec![];
        }

        let mut constraints = vec![];
        loop {
            let begin = self.location();
            let type_param_name = self.parse_name(diagnostics);
            self.expect(TokenKind::Colon, diagnostics);

            let mut traits = vec![];
            loop {
                traits.push(self.parse_symbol_name(diagnostics));
                if self.eat(TokenKind::Plus).is_none() {
                    break;
                }
            }

            constraints.push(ConstraintSyntax {
                location: SrcLocation::merge(&begin, &self.last_location()),
                scope: Rc::clone(scope),
                type_param_name,
                traits,
            });

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        constraints
    }

    fn parse_global_var(&mut self, scope: &Rc<Scope>) -> Expected<Rc<GlobalVarSyntax>> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        let modifiers =
            diagnostics.unwrap(self.parse_modifiers(&[TokenKind::PubKeyword]));
        let name = self.parse_name(&mut diagnostics);
        self.expect(TokenKind::Colon, &mut diagnostics);
        let type_name = self.parse_type_name(&mut diagnostics);
        let end = self.expect(TokenKind::Semicolon, &mut diagnostics);

        Ok(Diagnosed::new(
            Rc::new(GlobalVarSyntax {
                location: SrcLocation::merge(&begin, &end.location),
                scope: Rc::clone(scope),
                name,
                access: modifiers.access,
                type_name,
                symbol: RefCell::new(None),
            }),
            diagnostics,
        ))
    }

    fn parse_impl(&mut self, scope: &Rc<Scope>) -> Expected<ItemSyntax> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();
        let is_trait_impl = self.is_trait_impl_begin();

        self.expect(TokenKind::ImplKeyword, &mut diagnostics);
        let body_scope = scope.create_child_anon();
        let type_params = self.parse_type_params(&body_scope, &mut diagnostics);

        let (trait_name, self_type_name) = if is_trait_impl {
            let trait_name = self.parse_symbol_name(&mut diagnostics);
            self.expect(TokenKind::ForKeyword, &mut diagnostics);
            let self_type_name = self.parse_symbol_name(&mut diagnostics);
            (Some(trait_name), self_type_name)
        } else {
            (None, self.parse_symbol_name(&mut diagnostics))
        };

        // every impl type param must occur in the implemented names
        for type_param in &type_params {
            let in_trait = trait_name
                .as_ref()
                .map(|n| name_mentions(n, &type_param.name.name))
                .unwrap_or(false);
            if !in_trait && !name_mentions(&self_type_name, &type_param.name.name) {
                diagnostics.add(Diagnostic::error(
                    DiagnosticKind::UnconstrainedTypeParam,
                    type_param.location.clone(),
                    format!(
                        "type parameter '{}' is not constrained by the impl header",
                        type_param.name.name
                    ),
                ));
            }
        }

        self.expect(TokenKind::OpenBrace, &mut diagnostics);

        let mut functions = vec![];
        while !self.at(TokenKind::CloseBrace) && !self.at(TokenKind::EndOfFile) {
            match self.parse_function(&body_scope) {
                Ok(function) => functions.push(diagnostics.unwrap(function)),
                Err(bag) => {
                    diagnostics.merge(bag);
                    self.discard_until(
                        &[TokenKind::Semicolon, TokenKind::CloseBrace],
                        Discard::Inclusive,
                    );
                }
            }
        }
        let end = self.expect(TokenKind::CloseBrace, &mut diagnostics);

        let node = Rc::new(ImplSyntax {
            location: SrcLocation::merge(&begin, &end.location),
            scope: Rc::clone(scope),
            body_scope,
            type_params,
            trait_name,
            self_type_name,
            functions,
            symbol: RefCell::new(None),
        });

        let item = if is_trait_impl {
            ItemSyntax::TraitImpl(node)
        } else {
            ItemSyntax::InherentImpl(node)
        };
        Ok(Diagnosed::new(item, diagnostics))
    }

    fn parse_use(&mut self, scope: &Rc<Scope>) -> Expected<Rc<UseSyntax>> {
        let mut diagnostics = DiagnosticBag::new();
        let begin = self.location();

        let modifiers =
            diagnostics.unwrap(self.parse_modifiers(&[TokenKind::PubKeyword]));
        self.expect(TokenKind::UseKeyword, &mut diagnostics);
        let target = self.parse_symbol_name(&mut diagnostics);
        let end = self.expect(TokenKind::Semicolon, &mut diagnostics);

        Ok(Diagnosed::new(
            Rc::new(UseSyntax {
                location: SrcLocation::merge(&begin, &end.location),
                scope: Rc::clone(scope),
                access: modifiers.access,
                target,
                symbol: RefCell::new(None),
            }),
            diagnostics,
        ))
    }
}

fn empty_block(scope: &Rc<Scope>) -> Rc<BlockStmtSyntax> {
    Rc::new(BlockStmtSyntax {
        location: SrcLocation::new(crate::source::SrcBuffer::package_root("<recovery>"), 0, 0),
        scope: Rc::clone(scope),
        body_scope: Rc::clone(scope),
        stmts: vec![],
    })
}

/// Structural occurrence of an identifier anywhere in a path, including
/// inside type arguments.
fn name_mentions(name: &SymbolName, ident: &str) -> bool {
    name.sections.iter().any(|section| {
        section.name.name == ident
            || section
                .type_args
                .iter()
                .any(|arg| name_mentions(&arg.name, ident))
    })
}

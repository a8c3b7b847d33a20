//! # Syntax tree
//!
//! The immutable concrete syntax tree. Every node is created by the parser
//! already holding its lexical scope — scope creation is interleaved with
//! parsing, so no later phase ever has to reconstruct lexical structure.
//!
//! Nodes split into three roles, mirroring what happens to them next:
//!
//! - declaration nodes ([`items`]) participate in the decl phase and
//!   produce symbols (see [`decl`] for the global ordering),
//! - statement and expression nodes ([`stmts`], [`exprs`]) are bound into
//!   the semantic tree by `sema::bind`,
//! - name nodes ([`name`]) are the unresolved paths both of the above
//!   hand to the resolver.

pub mod decl;
pub mod exprs;
pub mod items;
pub mod name;
pub mod stmts;

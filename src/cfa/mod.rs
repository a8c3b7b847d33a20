//! # Control-flow analysis
//!
//! Runs after lowering, over the primitive core only. The graph is the
//! linear sequence of the five node kinds that matter to reachability —
//! labels, jumps, conditional jumps, returns and exits — in body order.
//! A depth-first walk with an accumulated list of already-taken jumps
//! (the `ends`) checks whether the implicit tail of the body is reachable
//! without passing a `Return` or `Exit`; for a non-void function that is
//! `NotAllControlPathsReturn`.
//!
//! Infinite loops fall out naturally: a jump that only leads back to
//! itself never reaches the tail, so a loop with no way out satisfies
//! every path.

use std::rc::Rc;

use crate::compilation::Compilation;
use crate::diagnostics::{Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::scope::symbol::{Symbol, SymbolKind};
use crate::sema::stmts::StmtSema;
use crate::sema::FunctionSema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfaNodeKind {
    Label,
    Jump,
    ConditionalJump,
    Return,
    Exit,
}

pub struct CfaNode {
    pub kind: CfaNodeKind,
    pub label: Option<Rc<Symbol>>,
}

#[derive(Default)]
pub struct CfaGraph {
    pub nodes: Vec<CfaNode>,
}

impl CfaGraph {
    pub fn build(body: &StmtSema) -> CfaGraph {
        let mut graph = CfaGraph::default();
        graph.collect(body);
        graph
    }

    fn collect(&mut self, stmt: &StmtSema) {
        match stmt {
            StmtSema::Label(n) => self.nodes.push(CfaNode {
                kind: CfaNodeKind::Label,
                label: Some(Rc::clone(&n.symbol)),
            }),
            StmtSema::Jump(n) => self.nodes.push(CfaNode {
                kind: CfaNodeKind::Jump,
                label: Some(Rc::clone(&n.target)),
            }),
            StmtSema::CondJump(n) => self.nodes.push(CfaNode {
                kind: CfaNodeKind::ConditionalJump,
                label: Some(Rc::clone(&n.target)),
            }),
            StmtSema::Ret(_) => self.nodes.push(CfaNode {
                kind: CfaNodeKind::Return,
                label: None,
            }),
            StmtSema::Exit(_) => self.nodes.push(CfaNode {
                kind: CfaNodeKind::Exit,
                label: None,
            }),
            other => {
                for child in other.child_stmts() {
                    self.collect(&child);
                }
            }
        }
    }

    fn find_label(&self, label: &Rc<Symbol>) -> Option<usize> {
        self.nodes.iter().position(|node| {
            node.kind == CfaNodeKind::Label
                && node
                    .label
                    .as_ref()
                    .map(|l| l.is_same(label))
                    .unwrap_or(false)
        })
    }
}

/// Whether the graph's tail can be reached from `begin` without passing a
/// return or exit. `ends` holds the jump sites already taken on this
/// path, which terminates cycles.
fn is_end_reachable_without_return(graph: &CfaGraph, begin: usize, ends: &[usize]) -> bool {
    let mut index = begin;
    while index < graph.nodes.len() {
        if ends.contains(&index) {
            return false;
        }

        let node = &graph.nodes[index];
        match node.kind {
            CfaNodeKind::Label => {
                index += 1;
            }
            CfaNodeKind::Jump => {
                let Some(label_index) =
                    graph.find_label(node.label.as_ref().expect("jumps carry a label"))
                else {
                    return false;
                };
                let mut new_ends = ends.to_vec();
                new_ends.push(index);
                return is_end_reachable_without_return(graph, label_index, &new_ends);
            }
            CfaNodeKind::ConditionalJump => {
                let Some(label_index) =
                    graph.find_label(node.label.as_ref().expect("jumps carry a label"))
                else {
                    return false;
                };

                let mut when_true_ends = ends.to_vec();
                when_true_ends.push(index);
                let when_true =
                    is_end_reachable_without_return(graph, label_index, &when_true_ends);
                let when_false = is_end_reachable_without_return(graph, index + 1, ends);

                return when_true || when_false;
            }
            CfaNodeKind::Return | CfaNodeKind::Exit => {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::symbol::{AccessModifier, SymbolKind};
    use crate::source::{Ident, SrcBuffer, SrcLocation};

    fn label(name: &str) -> Rc<Symbol> {
        let location = SrcLocation::new(SrcBuffer::file("t.ace", name), 0, name.len());
        Symbol::new(Ident::new(location, name), AccessModifier::Priv, SymbolKind::Label)
    }

    fn graph(nodes: Vec<CfaNode>) -> CfaGraph {
        CfaGraph { nodes }
    }

    #[test]
    fn test_fallthrough_reaches_the_end() {
        let g = graph(vec![]);
        assert!(is_end_reachable_without_return(&g, 0, &[]));
    }

    #[test]
    fn test_return_blocks_the_end() {
        let g = graph(vec![CfaNode {
            kind: CfaNodeKind::Return,
            label: None,
        }]);
        assert!(!is_end_reachable_without_return(&g, 0, &[]));
    }

    #[test]
    fn test_unconditional_self_loop_diverges() {
        // label: jump label — no way to the tail, so the path terminates
        let l = label("l");
        let g = graph(vec![
            CfaNode {
                kind: CfaNodeKind::Label,
                label: Some(Rc::clone(&l)),
            },
            CfaNode {
                kind: CfaNodeKind::Jump,
                label: Some(l),
            },
        ]);
        assert!(!is_end_reachable_without_return(&g, 0, &[]));
    }

    #[test]
    fn test_conditional_jump_falls_through() {
        let l = label("l");
        let g = graph(vec![
            CfaNode {
                kind: CfaNodeKind::ConditionalJump,
                label: Some(Rc::clone(&l)),
            },
            CfaNode {
                kind: CfaNodeKind::Return,
                label: None,
            },
            CfaNode {
                kind: CfaNodeKind::Label,
                label: Some(l),
            },
        ]);
        // the taken edge lands on the trailing label and walks off the end
        assert!(is_end_reachable_without_return(&g, 0, &[]));
    }
}

/// Verify that every path through a lowered non-void function body ends
/// in a return or exit.
pub fn analyze_function(compilation: &Compilation, function: &FunctionSema) -> DiagnosticBag {
    let mut diagnostics = DiagnosticBag::new();

    let return_type = match &function.symbol.kind {
        SymbolKind::Function(f) => f.signature.return_type.borrow().clone(),
        _ => return diagnostics,
    };
    if return_type.is_same(&compilation.natives.void) || return_type.is_error() {
        return diagnostics;
    }

    let graph = CfaGraph::build(&function.body);
    if is_end_reachable_without_return(&graph, 0, &[]) {
        diagnostics.add(Diagnostic::error(
            DiagnosticKind::NotAllControlPathsReturn,
            function.symbol.name.location.clone(),
            format!(
                "not all control paths of '{}' return a value",
                function.symbol.name.name
            ),
        ));
    }

    diagnostics
}

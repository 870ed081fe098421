use crate::spine::ends_in_binding;
use crate::syntax::{ConditionalAccess, ElementBinding, Expr, MemberBinding, NodePath, Step};

/// Shape of the part of a conditional access that follows the `?`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChainShape<'a> {
    /// `a?.b`
    Binding(&'a MemberBinding),
    /// `a?.[i]`
    Element(&'a ElementBinding),
    /// `a?.b?.c`, and `a?.b.c?.d` where the inner receiver is a spine
    Chain(&'a ConditionalAccess),
    /// `a?.b.c`, `a?.b[0]`, `a?.b()`
    Spine(&'a Expr),
    Unrecognized,
}

pub fn classify(conditional: &ConditionalAccess) -> ChainShape<'_> {
    match conditional.continuation.as_ref() {
        Expr::MemberBinding(binding) => ChainShape::Binding(binding),
        Expr::ElementBinding(binding) => ChainShape::Element(binding),
        Expr::ConditionalAccess(inner) if ends_in_binding(&inner.receiver) => {
            ChainShape::Chain(inner)
        }
        spine @ (Expr::MemberAccess(_) | Expr::ElementAccess(_) | Expr::Invocation(_))
            if ends_in_binding(spine) =>
        {
            ChainShape::Spine(spine)
        }
        _ => ChainShape::Unrecognized,
    }
}

/// Paths, relative to `root`, of every conditional access on the chain's
/// continuation spine, outermost first. `a?.b?.c?.d` has three.
///
/// Consumers pop from the back to visit links innermost first.
pub fn chain_links(root: &Expr) -> Vec<NodePath> {
    let mut links = Vec::new();
    collect_links(root, NodePath::root(), &mut links);
    links
}

fn collect_links(node: &Expr, path: NodePath, links: &mut Vec<NodePath>) {
    if let Expr::ConditionalAccess(conditional) = node {
        let continuation = path.child(Step::Continuation);
        links.push(path);
        collect_links(&conditional.continuation, continuation, links);
    }
}

use crate::chain::{classify, ChainShape};
use crate::error::{MutationError, Result};
use crate::spine;
use crate::syntax::{ConditionalAccess, ElementAccess, Expr, MemberAccess, NodePath, NodeRef};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub const CONDITIONAL_ACCESS_NAME: &str = "Conditional access expression";
pub const ELEMENT_ACCESS_NAME: &str = "Element access expression";

/// Mutation family tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutatorKind {
    /// Removal of a null-conditional check from an access chain
    Access,
}

impl fmt::Display for MutatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutatorKind::Access => f.write_str("Access"),
        }
    }
}

/// The subtree a mutation replaces, located in the host tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub path: NodePath,
    pub node: Expr,
}

/// One mutant of a chain.
///
/// `replacement_tree` is the whole chain (the node the mutator was invoked
/// on) with the anchor swapped out; everything outside the anchor is
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub anchor: Anchor,
    pub root: NodePath,
    pub replacement_tree: Expr,
    pub display_name: String,
    pub category: MutatorKind,
}

impl Mutation {
    /// Anchor location relative to the chain root
    pub fn relative_anchor(&self) -> NodePath {
        self.anchor
            .path
            .strip_prefix(&self.root)
            .unwrap_or_default()
    }

    /// The subtree that took the anchor's place
    pub fn replacement(&self) -> Option<&Expr> {
        self.replacement_tree.at(&self.relative_anchor())
    }

    /// Substitutes this mutation into the host tree it was generated from
    pub fn apply(&self, tree: &Expr) -> Result<Expr> {
        tree.replace_at(&self.root, self.replacement_tree.clone())
    }

    /// Stable content hash, usable to deduplicate mutants across runs
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.category.to_string().as_bytes());
        hasher.update(self.anchor.path.to_string().as_bytes());
        hasher.update(self.replacement_tree.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Builds the mutation for the conditional access at `link` (relative to
/// the chain root). Continuations no rule covers yield `Ok(None)`.
pub fn synthesize(root: &NodeRef<'_>, link: &NodePath) -> Result<Option<Mutation>> {
    let chain = root.node();
    let conditional = chain
        .at(link)
        .and_then(Expr::as_conditional)
        .ok_or_else(|| MutationError::InvalidPath(link.to_string()))?;

    let (replacement, display_name) = match classify(conditional) {
        ChainShape::Binding(binding) => (
            Expr::MemberAccess(MemberAccess {
                receiver: conditional.receiver.clone(),
                member: binding.member.clone(),
            }),
            CONDITIONAL_ACCESS_NAME,
        ),
        ChainShape::Element(binding) => (
            Expr::ElementAccess(ElementAccess {
                receiver: conditional.receiver.clone(),
                arguments: binding.arguments.clone(),
            }),
            ELEMENT_ACCESS_NAME,
        ),
        ChainShape::Chain(inner) => (collapse_chain(conditional, inner)?, CONDITIONAL_ACCESS_NAME),
        ChainShape::Spine(spine) => (
            spine::rebuild(conditional.receiver.as_ref().clone(), spine)?,
            CONDITIONAL_ACCESS_NAME,
        ),
        ChainShape::Unrecognized => {
            log::trace!("no rule for continuation of {}", Expr::ConditionalAccess(conditional.clone()));
            return Ok(None);
        }
    };

    let anchor = Anchor {
        path: root.path().join(link),
        node: Expr::ConditionalAccess(conditional.clone()),
    };

    Ok(Some(Mutation {
        anchor,
        root: root.path().clone(),
        replacement_tree: chain.replace_at(link, replacement)?,
        display_name: display_name.to_string(),
        category: MutatorKind::Access,
    }))
}

/// `a?.b?.c` to `a.b?.c`: drop the outer check, keep the inner one verbatim
fn collapse_chain(outer: &ConditionalAccess, inner: &ConditionalAccess) -> Result<Expr> {
    let receiver = spine::rebuild(outer.receiver.as_ref().clone(), &inner.receiver)?;
    Ok(Expr::ConditionalAccess(ConditionalAccess {
        receiver: Box::new(receiver),
        continuation: inner.continuation.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;
    use crate::syntax::Step;

    fn mutate_at(source: &str, link: NodePath) -> Option<Mutation> {
        let tree = parse_expression(source).unwrap();
        synthesize(&NodeRef::root(&tree), &link).unwrap()
    }

    #[test]
    fn test_binding_collapse() {
        let mutation = mutate_at("a?.b", NodePath::root()).unwrap();
        assert_eq!(mutation.replacement_tree.to_string(), "a.b");
        assert_eq!(mutation.display_name, CONDITIONAL_ACCESS_NAME);
        assert_eq!(mutation.category, MutatorKind::Access);
        assert!(mutation.anchor.path.is_root());
    }

    #[test]
    fn test_element_collapse() {
        let mutation = mutate_at("a?.[i]", NodePath::root()).unwrap();
        assert_eq!(mutation.replacement_tree.to_string(), "a[i]");
        assert_eq!(mutation.display_name, ELEMENT_ACCESS_NAME);
    }

    #[test]
    fn test_chain_collapse_keeps_inner_check() {
        let mutation = mutate_at("a?.b?.c", NodePath::root()).unwrap();
        assert_eq!(mutation.replacement_tree.to_string(), "a.b?.c");

        let mutation = mutate_at("a?.b.c?.d", NodePath::root()).unwrap();
        assert_eq!(mutation.replacement_tree.to_string(), "a.b.c?.d");

        let mutation = mutate_at("a?.[0]?.d", NodePath::root()).unwrap();
        assert_eq!(mutation.replacement_tree.to_string(), "a[0]?.d");
    }

    #[test]
    fn test_inner_link_collapse() {
        let link = NodePath::from_steps(vec![Step::Continuation]);
        let mutation = mutate_at("a?.b?.c", link.clone()).unwrap();

        assert_eq!(mutation.replacement_tree.to_string(), "a?.b.c");
        assert_eq!(mutation.anchor.path, link);
        assert_eq!(mutation.anchor.node.to_string(), ".b?.c");
        assert_eq!(mutation.replacement().unwrap().to_string(), ".b.c");
    }

    #[test]
    fn test_spine_collapse() {
        let mutation = mutate_at("a?.b.c.d", NodePath::root()).unwrap();
        assert_eq!(mutation.replacement_tree.to_string(), "a.b.c.d");

        let mutation = mutate_at("a?.b[0].c()", NodePath::root()).unwrap();
        assert_eq!(mutation.replacement_tree.to_string(), "a.b[0].c()");
    }

    #[test]
    fn test_unrecognized_continuation_yields_nothing() {
        let tree = Expr::conditional(Expr::name("a"), Expr::opaque("1"));
        let result = synthesize(&NodeRef::root(&tree), &NodePath::root()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_link_must_be_conditional() {
        let tree = parse_expression("a?.b").unwrap();
        let link = NodePath::from_steps(vec![Step::Receiver]);
        let err = synthesize(&NodeRef::root(&tree), &link).unwrap_err();
        assert!(matches!(err, MutationError::InvalidPath(_)));
    }

    #[test]
    fn test_apply_into_host_tree() {
        let host = parse_expression("f(x, a?.b)").unwrap();
        let chain = NodeRef::new(&host, NodePath::from_steps(vec![Step::Argument(1)])).unwrap();
        let mutation = synthesize(&chain, &NodePath::root()).unwrap().unwrap();

        assert_eq!(mutation.root, NodePath::from_steps(vec![Step::Argument(1)]));
        assert_eq!(mutation.apply(&host).unwrap().to_string(), "f(x, a.b)");
    }

    #[test]
    fn test_id_is_stable_and_distinct() {
        let first = mutate_at("a?.b?.c", NodePath::root()).unwrap();
        let again = mutate_at("a?.b?.c", NodePath::root()).unwrap();
        let inner = mutate_at("a?.b?.c", NodePath::from_steps(vec![Step::Continuation])).unwrap();

        assert_eq!(first.id(), again.id());
        assert_ne!(first.id(), inner.id());
        assert_eq!(first.id().len(), 64);
    }
}

use crate::syntax::{Expr, NodeRef, Step};

/// Whether `node` may start a chain mutation on its own.
///
/// A node is skipped when it is a non-root part of an enclosing chain-like
/// expression: anything directly under a conditional access, the receiver or
/// a bracketed argument of an element access or binding, the receiver of a
/// member access, or the callee of an invocation. Links on a chain's
/// continuation spine are mutated by the walk started at the chain root.
/// Conditional accesses inside brackets (`k[l?.m]`, `x?.[a?.b]`) are never
/// walked and stay unmutated.
pub fn is_entry_point(node: &NodeRef<'_>) -> bool {
    let (parent, role) = match (node.parent(), node.role()) {
        (Some(parent), Some(role)) => (parent, role),
        _ => return true,
    };

    !continues_chain(parent.node(), role)
}

fn continues_chain(parent: &Expr, role: Step) -> bool {
    match (parent, role) {
        (Expr::ConditionalAccess(_), _) => true,
        (Expr::MemberAccess(_), Step::Receiver) => true,
        (Expr::ElementAccess(_), Step::Receiver | Step::Argument(_)) => true,
        (Expr::ElementBinding(_), Step::Argument(_)) => true,
        (Expr::Invocation(_), Step::Callee) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;
    use crate::syntax::NodePath;

    fn at(tree: &Expr, steps: Vec<Step>) -> NodeRef<'_> {
        NodeRef::new(tree, NodePath::from_steps(steps)).unwrap()
    }

    #[test]
    fn test_root_is_entry_point() {
        let tree = parse_expression("a?.b").unwrap();
        assert!(is_entry_point(&NodeRef::root(&tree)));
    }

    #[test]
    fn test_nested_chain_is_skipped() {
        let tree = parse_expression("a?.b?.c").unwrap();
        assert!(!is_entry_point(&at(&tree, vec![Step::Continuation])));
    }

    #[test]
    fn test_member_access_receiver_is_skipped() {
        let tree = Expr::member_access(parse_expression("a?.b").unwrap(), "c");
        assert!(!is_entry_point(&at(&tree, vec![Step::Receiver])));
    }

    #[test]
    fn test_bracketed_arguments_are_skipped() {
        let tree = parse_expression("x[a?.b]").unwrap();
        assert!(!is_entry_point(&at(&tree, vec![Step::Argument(0)])));

        let tree = parse_expression("x?.[a?.b]").unwrap();
        assert!(!is_entry_point(&at(
            &tree,
            vec![Step::Continuation, Step::Argument(0)]
        )));
    }

    #[test]
    fn test_call_arguments_and_groups_are_entry_points() {
        let tree = parse_expression("f(a?.b)").unwrap();
        assert!(is_entry_point(&at(&tree, vec![Step::Argument(0)])));

        let tree = parse_expression("(a?.b).c").unwrap();
        assert!(is_entry_point(&at(&tree, vec![Step::Receiver, Step::Inner])));
    }
}

use crate::error::{MutationError, Result};
use crate::syntax::{ElementAccess, Expr, Invocation, MemberAccess};

/// Rebuilds a plain access spine as explicit accesses rooted at `receiver`.
///
/// The spine's innermost segment must be a member or element binding; it
/// becomes `receiver.name` or `receiver[args]`, and every segment wrapped
/// around it (member access, element access, invocation) is re-applied on
/// top. `.b.c[0]` rooted at `a` gives `a.b.c[0]`.
pub fn rebuild(receiver: Expr, spine: &Expr) -> Result<Expr> {
    match spine {
        Expr::MemberBinding(binding) => Ok(Expr::MemberAccess(MemberAccess {
            receiver: Box::new(receiver),
            member: binding.member.clone(),
        })),
        Expr::ElementBinding(binding) => Ok(Expr::ElementAccess(ElementAccess {
            receiver: Box::new(receiver),
            arguments: binding.arguments.clone(),
        })),
        Expr::MemberAccess(access) => Ok(Expr::MemberAccess(MemberAccess {
            receiver: Box::new(rebuild(receiver, &access.receiver)?),
            member: access.member.clone(),
        })),
        Expr::ElementAccess(access) => Ok(Expr::ElementAccess(ElementAccess {
            receiver: Box::new(rebuild(receiver, &access.receiver)?),
            arguments: access.arguments.clone(),
        })),
        Expr::Invocation(call) => Ok(Expr::Invocation(Invocation {
            callee: Box::new(rebuild(receiver, &call.callee)?),
            arguments: call.arguments.clone(),
        })),
        other => Err(MutationError::MalformedSpine(other.to_string())),
    }
}

/// True when `spine` is a run of plain accesses ending in a binding, i.e.
/// when [`rebuild`] will succeed on it.
pub fn ends_in_binding(spine: &Expr) -> bool {
    matches!(
        spine.spine_head(),
        Expr::MemberBinding(_) | Expr::ElementBinding(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_single_binding() {
        let rebuilt = rebuild(Expr::name("a"), &Expr::member_binding("b")).unwrap();
        assert_eq!(rebuilt, Expr::member_access(Expr::name("a"), "b"));

        let rebuilt = rebuild(Expr::name("a"), &Expr::element_binding(vec![Expr::name("i")])).unwrap();
        assert_eq!(rebuilt.to_string(), "a[i]");
    }

    #[test]
    fn test_rebuild_mixed_spine() {
        // .b.c[0].d()
        let spine = Expr::invocation(
            Expr::member_access(
                Expr::element_access(
                    Expr::member_access(Expr::member_binding("b"), "c"),
                    vec![Expr::opaque("0")],
                ),
                "d",
            ),
            vec![],
        );
        assert!(ends_in_binding(&spine));

        let rebuilt = rebuild(Expr::name("a"), &spine).unwrap();
        assert_eq!(rebuilt.to_string(), "a.b.c[0].d()");
    }

    #[test]
    fn test_rebuild_rejects_spine_without_binding() {
        let spine = Expr::member_access(Expr::name("x"), "c");
        assert!(!ends_in_binding(&spine));

        let err = rebuild(Expr::name("a"), &spine).unwrap_err();
        assert!(matches!(err, MutationError::MalformedSpine(ref s) if s == "x"));
    }
}

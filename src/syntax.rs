use crate::error::{MutationError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Member name as written in source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Identifier(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered arguments of a bracketed or parenthesized argument list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArgumentList(pub Vec<Expr>);

impl ArgumentList {
    pub fn new(arguments: Vec<Expr>) -> Self {
        ArgumentList(arguments)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expr> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Expr> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ArgumentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, argument) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", argument)?;
        }
        Ok(())
    }
}

/// `receiver?.continuation`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalAccess {
    pub receiver: Box<Expr>,
    pub continuation: Box<Expr>,
}

/// `.member` with the receiver supplied by the enclosing conditional access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBinding {
    pub member: Identifier,
}

/// `[arguments]` with the receiver supplied by the enclosing conditional access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementBinding {
    pub arguments: ArgumentList,
}

/// `receiver.member`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberAccess {
    pub receiver: Box<Expr>,
    pub member: Identifier,
}

/// `receiver[arguments]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementAccess {
    pub receiver: Box<Expr>,
    pub arguments: ArgumentList,
}

/// `callee(arguments)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub callee: Box<Expr>,
    pub arguments: ArgumentList,
}

/// Expression shapes relevant to null-safe access chains. Anything else the
/// host tree contains is carried as `Opaque` text and treated as atomic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Name(Identifier),
    Opaque(String),
    ConditionalAccess(ConditionalAccess),
    MemberBinding(MemberBinding),
    ElementBinding(ElementBinding),
    MemberAccess(MemberAccess),
    ElementAccess(ElementAccess),
    Invocation(Invocation),
    Parenthesized(Box<Expr>),
}

impl Expr {
    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(Identifier::new(name))
    }

    pub fn opaque(text: impl Into<String>) -> Self {
        Expr::Opaque(text.into())
    }

    pub fn conditional(receiver: Expr, continuation: Expr) -> Self {
        Expr::ConditionalAccess(ConditionalAccess {
            receiver: Box::new(receiver),
            continuation: Box::new(continuation),
        })
    }

    pub fn member_binding(member: impl Into<String>) -> Self {
        Expr::MemberBinding(MemberBinding {
            member: Identifier::new(member),
        })
    }

    pub fn element_binding(arguments: Vec<Expr>) -> Self {
        Expr::ElementBinding(ElementBinding {
            arguments: ArgumentList::new(arguments),
        })
    }

    pub fn member_access(receiver: Expr, member: impl Into<String>) -> Self {
        Expr::MemberAccess(MemberAccess {
            receiver: Box::new(receiver),
            member: Identifier::new(member),
        })
    }

    pub fn element_access(receiver: Expr, arguments: Vec<Expr>) -> Self {
        Expr::ElementAccess(ElementAccess {
            receiver: Box::new(receiver),
            arguments: ArgumentList::new(arguments),
        })
    }

    pub fn invocation(callee: Expr, arguments: Vec<Expr>) -> Self {
        Expr::Invocation(Invocation {
            callee: Box::new(callee),
            arguments: ArgumentList::new(arguments),
        })
    }

    pub fn parenthesized(inner: Expr) -> Self {
        Expr::Parenthesized(Box::new(inner))
    }

    pub fn as_conditional(&self) -> Option<&ConditionalAccess> {
        match self {
            Expr::ConditionalAccess(conditional) => Some(conditional),
            _ => None,
        }
    }

    /// Direct child reached through `step`, if this shape has one there
    pub fn child(&self, step: Step) -> Option<&Expr> {
        match (self, step) {
            (Expr::ConditionalAccess(c), Step::Receiver) => Some(c.receiver.as_ref()),
            (Expr::ConditionalAccess(c), Step::Continuation) => Some(c.continuation.as_ref()),
            (Expr::MemberAccess(m), Step::Receiver) => Some(m.receiver.as_ref()),
            (Expr::ElementAccess(e), Step::Receiver) => Some(e.receiver.as_ref()),
            (Expr::ElementAccess(e), Step::Argument(i)) => e.arguments.get(i),
            (Expr::ElementBinding(b), Step::Argument(i)) => b.arguments.get(i),
            (Expr::Invocation(call), Step::Callee) => Some(call.callee.as_ref()),
            (Expr::Invocation(call), Step::Argument(i)) => call.arguments.get(i),
            (Expr::Parenthesized(inner), Step::Inner) => Some(inner.as_ref()),
            _ => None,
        }
    }

    fn child_mut(&mut self, step: Step) -> Option<&mut Expr> {
        match (self, step) {
            (Expr::ConditionalAccess(c), Step::Receiver) => Some(c.receiver.as_mut()),
            (Expr::ConditionalAccess(c), Step::Continuation) => Some(c.continuation.as_mut()),
            (Expr::MemberAccess(m), Step::Receiver) => Some(m.receiver.as_mut()),
            (Expr::ElementAccess(e), Step::Receiver) => Some(e.receiver.as_mut()),
            (Expr::ElementAccess(e), Step::Argument(i)) => e.arguments.0.get_mut(i),
            (Expr::ElementBinding(b), Step::Argument(i)) => b.arguments.0.get_mut(i),
            (Expr::Invocation(call), Step::Callee) => Some(call.callee.as_mut()),
            (Expr::Invocation(call), Step::Argument(i)) => call.arguments.0.get_mut(i),
            (Expr::Parenthesized(inner), Step::Inner) => Some(inner.as_mut()),
            _ => None,
        }
    }

    /// Children in source order, paired with the step that reaches them
    pub fn children(&self) -> Vec<(Step, &Expr)> {
        fn arguments(list: &ArgumentList) -> impl Iterator<Item = (Step, &Expr)> {
            list.iter().enumerate().map(|(i, arg)| (Step::Argument(i), arg))
        }

        match self {
            Expr::Name(_) | Expr::Opaque(_) | Expr::MemberBinding(_) => Vec::new(),
            Expr::ConditionalAccess(c) => vec![
                (Step::Receiver, c.receiver.as_ref()),
                (Step::Continuation, c.continuation.as_ref()),
            ],
            Expr::ElementBinding(b) => arguments(&b.arguments).collect(),
            Expr::MemberAccess(m) => vec![(Step::Receiver, m.receiver.as_ref())],
            Expr::ElementAccess(e) => std::iter::once((Step::Receiver, e.receiver.as_ref()))
                .chain(arguments(&e.arguments))
                .collect(),
            Expr::Invocation(call) => std::iter::once((Step::Callee, call.callee.as_ref()))
                .chain(arguments(&call.arguments))
                .collect(),
            Expr::Parenthesized(inner) => vec![(Step::Inner, inner.as_ref())],
        }
    }

    pub fn at(&self, path: &NodePath) -> Option<&Expr> {
        path.steps()
            .iter()
            .try_fold(self, |node, step| node.child(*step))
    }

    /// Returns a new tree identical to `self` except that the node at `path`
    /// is `replacement`. `self` is left untouched.
    pub fn replace_at(&self, path: &NodePath, replacement: Expr) -> Result<Expr> {
        let mut tree = self.clone();
        let slot = path
            .steps()
            .iter()
            .try_fold(&mut tree, |node, step| node.child_mut(*step))
            .ok_or_else(|| MutationError::InvalidPath(path.to_string()))?;
        *slot = replacement;
        Ok(tree)
    }

    /// Leftmost node of an access spine, following receivers and callees
    pub fn spine_head(&self) -> &Expr {
        match self {
            Expr::MemberAccess(m) => m.receiver.spine_head(),
            Expr::ElementAccess(e) => e.receiver.spine_head(),
            Expr::Invocation(call) => call.callee.spine_head(),
            other => other,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Name(name) => write!(f, "{}", name),
            Expr::Opaque(text) => f.write_str(text),
            Expr::ConditionalAccess(c) => {
                // `a?.[i]` keeps the dot that the element binding does not print
                let head = c.continuation.spine_head();
                let head = match head {
                    Expr::ConditionalAccess(inner) => inner.receiver.spine_head(),
                    other => other,
                };
                if matches!(head, Expr::ElementBinding(_)) {
                    write!(f, "{}?.{}", c.receiver, c.continuation)
                } else {
                    write!(f, "{}?{}", c.receiver, c.continuation)
                }
            }
            Expr::MemberBinding(b) => write!(f, ".{}", b.member),
            Expr::ElementBinding(b) => write!(f, "[{}]", b.arguments),
            Expr::MemberAccess(m) => write!(f, "{}.{}", m.receiver, m.member),
            Expr::ElementAccess(e) => write!(f, "{}[{}]", e.receiver, e.arguments),
            Expr::Invocation(call) => write!(f, "{}({})", call.callee, call.arguments),
            Expr::Parenthesized(inner) => write!(f, "({})", inner),
        }
    }
}

/// How a node hangs off its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    Receiver,
    Continuation,
    Callee,
    Inner,
    Argument(usize),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Receiver => f.write_str("receiver"),
            Step::Continuation => f.write_str("continuation"),
            Step::Callee => f.write_str("callee"),
            Step::Inner => f.write_str("inner"),
            Step::Argument(i) => write!(f, "arg{}", i),
        }
    }
}

/// Location of a node, as the steps taken from the tree root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NodePath(Vec<Step>);

impl NodePath {
    pub fn root() -> Self {
        NodePath(Vec::new())
    }

    pub fn from_steps(steps: Vec<Step>) -> Self {
        NodePath(steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, step: Step) -> NodePath {
        let mut steps = self.0.clone();
        steps.push(step);
        NodePath(steps)
    }

    pub fn join(&self, other: &NodePath) -> NodePath {
        let mut steps = self.0.clone();
        steps.extend_from_slice(&other.0);
        NodePath(steps)
    }

    pub fn parent(&self) -> Option<NodePath> {
        self.0
            .split_last()
            .map(|(_, init)| NodePath(init.to_vec()))
    }

    pub fn last(&self) -> Option<Step> {
        self.0.last().copied()
    }

    pub fn strip_prefix(&self, prefix: &NodePath) -> Option<NodePath> {
        self.0
            .strip_prefix(prefix.0.as_slice())
            .map(|rest| NodePath(rest.to_vec()))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for step in &self.0 {
            write!(f, "/{}", step)?;
        }
        Ok(())
    }
}

/// Borrowed view of a node inside a host tree. Carries the tree root and the
/// node's path so callers can navigate to the parent.
#[derive(Debug, Clone)]
pub struct NodeRef<'a> {
    tree: &'a Expr,
    path: NodePath,
    node: &'a Expr,
}

impl<'a> NodeRef<'a> {
    pub fn root(tree: &'a Expr) -> Self {
        NodeRef {
            tree,
            path: NodePath::root(),
            node: tree,
        }
    }

    pub fn new(tree: &'a Expr, path: NodePath) -> Result<Self> {
        let node = tree
            .at(&path)
            .ok_or_else(|| MutationError::InvalidPath(path.to_string()))?;
        Ok(NodeRef { tree, path, node })
    }

    pub fn node(&self) -> &'a Expr {
        self.node
    }

    pub fn tree(&self) -> &'a Expr {
        self.tree
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// The step by which this node hangs off its parent; `None` at the root
    pub fn role(&self) -> Option<Step> {
        self.path.last()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        let path = self.path.parent()?;
        let node = self.tree.at(&path)?;
        Some(NodeRef {
            tree: self.tree,
            path,
            node,
        })
    }

    pub fn children(&self) -> Vec<NodeRef<'a>> {
        self.node
            .children()
            .into_iter()
            .map(|(step, node)| NodeRef {
                tree: self.tree,
                path: self.path.child(step),
                node,
            })
            .collect()
    }

    /// This node and everything below it, pre-order
    pub fn descendants(&self) -> Vec<NodeRef<'a>> {
        let mut nodes = vec![self.clone()];
        for child in self.children() {
            nodes.extend(child.descendants());
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a_b_c() -> Expr {
        // a?.b?.c
        Expr::conditional(
            Expr::name("a"),
            Expr::conditional(Expr::member_binding("b"), Expr::member_binding("c")),
        )
    }

    #[test]
    fn test_display() {
        assert_eq!(a_b_c().to_string(), "a?.b?.c");

        let element = Expr::conditional(Expr::name("a"), Expr::element_binding(vec![Expr::name("i")]));
        assert_eq!(element.to_string(), "a?.[i]");

        let spine = Expr::conditional(
            Expr::name("a"),
            Expr::member_access(
                Expr::element_access(Expr::member_binding("b"), vec![Expr::opaque("0")]),
                "c",
            ),
        );
        assert_eq!(spine.to_string(), "a?.b[0].c");

        let call = Expr::invocation(
            Expr::member_access(Expr::name("x"), "f"),
            vec![Expr::name("y"), Expr::opaque("1")],
        );
        assert_eq!(call.to_string(), "x.f(y, 1)");
    }

    #[test]
    fn test_at_and_children() {
        let tree = a_b_c();
        let inner = NodePath::from_steps(vec![Step::Continuation]);
        assert_eq!(tree.at(&inner).unwrap().to_string(), ".b?.c");
        assert_eq!(
            tree.at(&inner.child(Step::Receiver)),
            Some(&Expr::member_binding("b"))
        );
        assert!(tree.at(&NodePath::from_steps(vec![Step::Callee])).is_none());
        assert_eq!(tree.children().len(), 2);
    }

    #[test]
    fn test_replace_at_leaves_original_untouched() {
        let tree = a_b_c();
        let path = NodePath::from_steps(vec![Step::Receiver]);
        let replaced = tree.replace_at(&path, Expr::name("z")).unwrap();

        assert_eq!(replaced.to_string(), "z?.b?.c");
        assert_eq!(tree.to_string(), "a?.b?.c");

        let root = tree.replace_at(&NodePath::root(), Expr::name("q")).unwrap();
        assert_eq!(root, Expr::name("q"));
    }

    #[test]
    fn test_replace_at_invalid_path() {
        let tree = Expr::name("a");
        let err = tree
            .replace_at(&NodePath::from_steps(vec![Step::Receiver]), Expr::name("b"))
            .unwrap_err();
        assert!(matches!(err, MutationError::InvalidPath(_)));
    }

    #[test]
    fn test_node_ref_navigation() {
        let tree = a_b_c();
        let root = NodeRef::root(&tree);
        assert!(root.parent().is_none());
        assert!(root.role().is_none());

        let inner = NodeRef::new(&tree, NodePath::from_steps(vec![Step::Continuation])).unwrap();
        assert_eq!(inner.role(), Some(Step::Continuation));
        let parent = inner.parent().unwrap();
        assert!(parent.path().is_root());
        assert!(matches!(parent.node(), Expr::ConditionalAccess(_)));

        // a, ?.b?.c, .b, .c plus the root
        assert_eq!(root.descendants().len(), 5);
    }

    #[test]
    fn test_path_display_and_prefix() {
        let path = NodePath::from_steps(vec![Step::Continuation, Step::Argument(2)]);
        assert_eq!(path.to_string(), "/continuation/arg2");
        assert_eq!(NodePath::root().to_string(), "/");

        let prefix = NodePath::from_steps(vec![Step::Continuation]);
        assert_eq!(
            path.strip_prefix(&prefix),
            Some(NodePath::from_steps(vec![Step::Argument(2)]))
        );
        assert_eq!(prefix.join(&NodePath::from_steps(vec![Step::Argument(2)])), path);
    }
}

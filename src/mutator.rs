use crate::chain::chain_links;
use crate::entry::is_entry_point;
use crate::error::{MutationError, Result};
use crate::synthesis::{synthesize, Mutation, MutatorKind};
use crate::syntax::{Expr, NodePath, NodeRef};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How aggressive a mutation run is. Mutators above the configured level
/// are not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationLevel {
    Basic,
    Standard,
    Advanced,
    Complete,
}

impl Default for MutationLevel {
    fn default() -> Self {
        MutationLevel::Standard
    }
}

impl fmt::Display for MutationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationLevel::Basic => "basic",
            MutationLevel::Standard => "standard",
            MutationLevel::Advanced => "advanced",
            MutationLevel::Complete => "complete",
        };
        f.write_str(name)
    }
}

impl FromStr for MutationLevel {
    type Err = MutationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(MutationLevel::Basic),
            "standard" => Ok(MutationLevel::Standard),
            "advanced" => Ok(MutationLevel::Advanced),
            "complete" => Ok(MutationLevel::Complete),
            other => Err(MutationError::InvalidInput(format!(
                "Unknown mutation level '{}'",
                other
            ))),
        }
    }
}

pub trait Mutator {
    fn name(&self) -> &'static str;

    fn kind(&self) -> MutatorKind;

    fn level(&self) -> MutationLevel;

    /// Mutations rooted at `node`, produced as the caller pulls them
    fn apply_mutations<'a>(
        &self,
        node: NodeRef<'a>,
    ) -> Box<dyn Iterator<Item = Result<Mutation>> + 'a>;
}

/// Weakens `?.` null checks one at a time
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionalAccessMutator;

impl ConditionalAccessMutator {
    pub fn generate_mutations<'a>(&self, node: NodeRef<'a>) -> Mutations<'a> {
        generate_mutations(node)
    }
}

impl Mutator for ConditionalAccessMutator {
    fn name(&self) -> &'static str {
        "conditional-access"
    }

    fn kind(&self) -> MutatorKind {
        MutatorKind::Access
    }

    fn level(&self) -> MutationLevel {
        MutationLevel::Standard
    }

    fn apply_mutations<'a>(
        &self,
        node: NodeRef<'a>,
    ) -> Box<dyn Iterator<Item = Result<Mutation>> + 'a> {
        Box::new(self.generate_mutations(node))
    }
}

/// Lazy sequence of the mutations of one chain.
///
/// Nothing is computed until the first pull: the entry check runs then, and
/// each later pull synthesizes exactly one mutation. Cloning an unconsumed
/// sequence (or calling [`generate_mutations`] again) replays the same
/// mutations in the same order. After an error the sequence is exhausted.
#[derive(Debug, Clone)]
pub struct Mutations<'a> {
    root: NodeRef<'a>,
    state: State,
}

#[derive(Debug, Clone)]
enum State {
    Start,
    /// Links still to visit; popped from the back so inner links come first
    Walking(Vec<NodePath>),
    Done,
}

impl<'a> Iterator for Mutations<'a> {
    type Item = Result<Mutation>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                State::Start => {
                    let entry = matches!(self.root.node(), Expr::ConditionalAccess(_))
                        && is_entry_point(&self.root);
                    self.state = if entry {
                        State::Walking(chain_links(self.root.node()))
                    } else {
                        debug!("skipping {} at {}", self.root.node(), self.root.path());
                        State::Done
                    };
                }
                State::Walking(pending) => {
                    let link = match pending.pop() {
                        Some(link) => link,
                        None => {
                            self.state = State::Done;
                            continue;
                        }
                    };

                    match synthesize(&self.root, &link) {
                        Ok(Some(mutation)) => {
                            debug!(
                                "{} at {}: {} -> {}",
                                mutation.display_name,
                                mutation.anchor.path,
                                self.root.node(),
                                mutation.replacement_tree
                            );
                            return Some(Ok(mutation));
                        }
                        Ok(None) => continue,
                        Err(e) => {
                            self.state = State::Done;
                            return Some(Err(e));
                        }
                    }
                }
                State::Done => return None,
            }
        }
    }
}

impl std::iter::FusedIterator for Mutations<'_> {}

/// Mutations of the null-safe chain rooted at `node`, one per `?` on its
/// continuation spine, innermost first. Nodes that are not chain roots, or
/// that continue an enclosing chain, produce nothing.
pub fn generate_mutations(node: NodeRef<'_>) -> Mutations<'_> {
    Mutations {
        root: node,
        state: State::Start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;
    use crate::syntax::Step;

    fn rendered(source: &str) -> Vec<String> {
        let tree = parse_expression(source).unwrap();
        generate_mutations(NodeRef::root(&tree))
            .map(|m| m.unwrap().replacement_tree.to_string())
            .collect()
    }

    #[test]
    fn test_single_link() {
        assert_eq!(rendered("a?.b"), vec!["a.b"]);
        assert_eq!(rendered("a?.[i]"), vec!["a[i]"]);
        assert_eq!(rendered("a?.b.c.d"), vec!["a.b.c.d"]);
    }

    #[test]
    fn test_innermost_first() {
        assert_eq!(
            rendered("a?.b?.c?.d"),
            vec!["a?.b?.c.d", "a?.b.c?.d", "a.b?.c?.d"]
        );
    }

    #[test]
    fn test_non_chain_root_yields_nothing() {
        assert!(rendered("a.b").is_empty());
        assert!(rendered("f(a?.b)").is_empty());
    }

    #[test]
    fn test_nested_entry_is_skipped() {
        let tree = parse_expression("a?.b?.c").unwrap();
        let inner = NodeRef::new(&tree, NodePath::from_steps(vec![Step::Continuation])).unwrap();
        assert_eq!(generate_mutations(inner).count(), 0);
    }

    #[test]
    fn test_lazy_and_restartable() {
        let tree = parse_expression("a?.b?.c").unwrap();
        let mut mutations = generate_mutations(NodeRef::root(&tree));
        let replay = mutations.clone();

        let first = mutations.next().unwrap().unwrap();
        assert_eq!(first.replacement_tree.to_string(), "a?.b.c");

        let all: Vec<Mutation> = replay.map(|m| m.unwrap()).collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], first);
    }

    #[test]
    fn test_error_ends_sequence() {
        // a link that is not a conditional access is a walker defect
        let tree = parse_expression("a?.b").unwrap();
        let mut mutations = Mutations {
            root: NodeRef::root(&tree),
            state: State::Walking(vec![NodePath::from_steps(vec![Step::Receiver])]),
        };
        assert!(mutations.next().unwrap().is_err());
        assert!(mutations.next().is_none());
    }

    #[test]
    fn test_mutator_trait() {
        let mutator = ConditionalAccessMutator;
        assert_eq!(mutator.level(), MutationLevel::Standard);
        assert_eq!(mutator.kind(), MutatorKind::Access);

        let tree = parse_expression("x?.y").unwrap();
        assert_eq!(mutator.apply_mutations(NodeRef::root(&tree)).count(), 1);
    }

    #[test]
    fn test_level_parsing_and_order() {
        assert_eq!("Advanced".parse::<MutationLevel>().unwrap(), MutationLevel::Advanced);
        assert!("extreme".parse::<MutationLevel>().is_err());
        assert!(MutationLevel::Basic < MutationLevel::Standard);
        assert_eq!(MutationLevel::default(), MutationLevel::Standard);
    }
}

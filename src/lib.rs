//! # Safenav Mutation
//!
//! Mutation generation for null-safe access chains (`a?.b`, `a?.b?.c`,
//! `a?.[i]`, `a?.b.c.d`).
//!
//! This library provides functionality to:
//! - Model the syntax shapes of a conditional-access chain
//! - Decide which nodes are legitimate chain entry points
//! - Produce, lazily and innermost first, one mutant per `?` that weakens
//!   that single null check and leaves the rest of the chain intact
//! - Drive the mutator over files of chain expressions and write the mutants
//!   and a JSON report
//!
//! ## Example
//!
//! ```rust
//! use safenav_mutation::mutator::generate_mutations;
//! use safenav_mutation::parser::parse_expression;
//! use safenav_mutation::syntax::NodeRef;
//!
//! let tree = parse_expression("order?.Customer?.Name").unwrap();
//! let mutants: Vec<String> = generate_mutations(NodeRef::root(&tree))
//!     .map(|m| m.unwrap().replacement_tree.to_string())
//!     .collect();
//!
//! assert_eq!(mutants, vec!["order?.Customer.Name", "order.Customer?.Name"]);
//! ```

pub mod chain;
pub mod config;
pub mod entry;
pub mod error;
pub mod mutation;
pub mod mutator;
pub mod parser;
pub mod report;
pub mod spine;
pub mod synthesis;
pub mod syntax;

pub use error::{MutationError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::MutationConfig;
    pub use crate::error::{MutationError, Result};
    pub use crate::mutation::{mutate_expression, mutate_source, run_mutation};
    pub use crate::mutator::{
        generate_mutations, ConditionalAccessMutator, MutationLevel, Mutations, Mutator,
    };
    pub use crate::parser::{parse_expression, parse_with_source_map, SourceMap};
    pub use crate::synthesis::{Mutation, MutatorKind};
    pub use crate::syntax::{Expr, NodePath, NodeRef};
}

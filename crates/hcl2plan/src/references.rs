//! configuration expressions of a block
//!
//! Rebuilds the `expressions` object terraform puts into the `configuration` section of a plan.
//! Values are not included, only which addresses each attribute refers to.
use crate::tree::Block;
use indexmap::IndexMap;

pub type Expressions = IndexMap<String, Expression>;

#[derive(serde::Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Expression {
    /// `{"references": [...]}` of a single attribute
    References(References),
    /// one entry per nested block (of the same kind) that has references
    Blocks(Vec<Expressions>),
}

#[derive(serde::Serialize, Debug, Clone, PartialEq, Default)]
pub struct References {
    pub references: Vec<String>,
}

/// Collect the references of all attributes of `block` and its descendants
///
/// Attributes and blocks without any references are left out.
#[tracing::instrument(level = "trace", skip_all, fields(block = %block.kind))]
pub fn block_to_references(block: &Block) -> Expressions {
    let mut expressions = Expressions::new();

    for attribute in &block.attributes {
        if attribute.references.is_empty() {
            continue;
        }

        let references = attribute.references.iter().map(ToString::to_string).collect();
        tracing::trace!(attribute = %attribute.name, ?references);
        expressions.insert(
            attribute.name.clone(),
            Expression::References(References { references }),
        );
    }

    let mut child_expressions: IndexMap<&str, Vec<Expressions>> = IndexMap::new();
    for child in &block.children {
        let child_references = block_to_references(child);
        if child_references.is_empty() {
            continue;
        }

        child_expressions
            .entry(child.kind.as_str())
            .or_default()
            .push(child_references);
    }

    for (kind, blocks) in child_expressions {
        expressions.insert(kind.to_string(), Expression::Blocks(blocks));
    }

    expressions
}

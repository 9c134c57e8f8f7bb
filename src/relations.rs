//! Class Relation Graph
//!
//! A petgraph view of how registered classes point at each other: embedded
//! documents, references by identifier, and arrays of either. Repository code
//! uses it to resolve relations by class name; embedding cycles (self or
//! mutual) are reported via SCCs.
//!
//! Polymorphic references have no fixed target and are kept apart, keyed by
//! the sibling field that names the target per document.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::names::ClassName;
use crate::registry::ModelRegistry;
use crate::schema::{FieldType, SchemaDefinition};

/// How one class points at another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Embedded,
    Reference,
}

/// A named edge between two classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub from: ClassName,
    pub field: String,
    pub to: ClassName,
    pub kind: RelationKind,
    /// Field is an array of the target
    pub many: bool,
}

/// A reference whose target class is read from `path` on each document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolymorphicRelation {
    pub from: ClassName,
    pub field: String,
    pub path: String,
    pub many: bool,
}

/// Relations between registered classes
#[derive(Debug)]
pub struct RelationGraph {
    graph: DiGraph<ClassName, Relation>,
    node_indices: HashMap<ClassName, NodeIndex>,
    polymorphic: Vec<PolymorphicRelation>,
}

impl RelationGraph {
    /// Build from the registry's current definitions
    pub fn build(registry: &ModelRegistry) -> Self {
        Self::from_definitions(&registry.definitions())
    }

    pub fn from_definitions(definitions: &BTreeMap<ClassName, SchemaDefinition>) -> Self {
        let mut graph = DiGraph::with_capacity(definitions.len(), definitions.len() * 2);
        let mut node_indices: HashMap<ClassName, NodeIndex> =
            HashMap::with_capacity(definitions.len());
        let mut polymorphic = Vec::new();

        for class in definitions.keys() {
            let idx = graph.add_node(class.clone());
            node_indices.insert(class.clone(), idx);
        }

        for (class, definition) in definitions {
            for (field, spec) in definition {
                let (inner, many) = match &spec.field_type {
                    FieldType::ArrayOf(items) => (items.as_ref(), true),
                    other => (other, false),
                };

                let (to, kind) = match inner {
                    FieldType::Embedded(to) => (to, RelationKind::Embedded),
                    FieldType::Reference(to) => (to, RelationKind::Reference),
                    FieldType::PolymorphicReference(path) => {
                        polymorphic.push(PolymorphicRelation {
                            from: class.clone(),
                            field: field.clone(),
                            path: path.clone(),
                            many,
                        });
                        continue;
                    }
                    _ => continue,
                };

                // Referenced classes need not be registered themselves.
                let to_idx = *node_indices
                    .entry(to.clone())
                    .or_insert_with(|| graph.add_node(to.clone()));
                let from_idx = node_indices[class];
                graph.add_edge(
                    from_idx,
                    to_idx,
                    Relation {
                        from: class.clone(),
                        field: field.clone(),
                        to: to.clone(),
                        kind,
                        many,
                    },
                );
            }
        }

        Self {
            graph,
            node_indices,
            polymorphic,
        }
    }

    pub fn class_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn relation_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Outgoing relations of a class
    pub fn relations_from(&self, class: &ClassName) -> Vec<&Relation> {
        self.edges(class, Direction::Outgoing)
    }

    /// Incoming relations of a class (who embeds or references it)
    pub fn relations_to(&self, class: &ClassName) -> Vec<&Relation> {
        self.edges(class, Direction::Incoming)
    }

    /// Outgoing identifier references of a class
    pub fn references_from(&self, class: &ClassName) -> Vec<&Relation> {
        self.relations_from(class)
            .into_iter()
            .filter(|r| r.kind == RelationKind::Reference)
            .collect()
    }

    pub fn polymorphic_from(&self, class: &ClassName) -> Vec<&PolymorphicRelation> {
        self.polymorphic.iter().filter(|p| &p.from == class).collect()
    }

    /// Groups of classes that embed each other, including classes that embed
    /// themselves. Reference edges do not count.
    pub fn embedding_cycles(&self) -> Vec<Vec<ClassName>> {
        let mut embedded: DiGraph<ClassName, ()> =
            DiGraph::with_capacity(self.graph.node_count(), 0);
        let mut mapping = HashMap::with_capacity(self.graph.node_count());
        for idx in self.graph.node_indices() {
            mapping.insert(idx, embedded.add_node(self.graph[idx].clone()));
        }
        for edge in self.graph.edge_references() {
            if edge.weight().kind == RelationKind::Embedded {
                embedded.add_edge(mapping[&edge.source()], mapping[&edge.target()], ());
            }
        }

        let mut cycles: Vec<Vec<ClassName>> = kosaraju_scc(&embedded)
            .into_iter()
            .filter(|scc| scc.len() > 1 || embedded.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut names: Vec<ClassName> =
                    scc.into_iter().map(|idx| embedded[idx].clone()).collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Render as Graphviz DOT. Embedded edges are solid, references dashed,
    /// arrays drawn bold.
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph Relations {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str(
            "  node [shape=box, style=rounded, fontname=\"Helvetica\", fontsize=10];\n",
        );
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8];\n\n");

        let mut nodes: Vec<&ClassName> = self.graph.node_weights().collect();
        nodes.sort();
        for class in nodes {
            output.push_str(&format!("  \"{}\";\n", class));
        }
        output.push('\n');

        let mut edges: Vec<&Relation> = self.graph.edge_weights().collect();
        edges.sort_by(|a, b| (&a.from, &a.field).cmp(&(&b.from, &b.field)));
        for relation in edges {
            let style = match relation.kind {
                RelationKind::Embedded => "solid",
                RelationKind::Reference => "dashed",
            };
            let weight = if relation.many { ", penwidth=2" } else { "" };
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\", style={}{}];\n",
                relation.from, relation.to, relation.field, style, weight
            ));
        }

        output.push_str("}\n");
        output
    }

    fn edges(&self, class: &ClassName, direction: Direction) -> Vec<&Relation> {
        let Some(&node_idx) = self.node_indices.get(class) else {
            return Vec::new();
        };

        let mut relations: Vec<&Relation> = self
            .graph
            .edges_directed(node_idx, direction)
            .map(|e| e.weight())
            .collect();
        relations.sort_by(|a, b| (&a.from, &a.field).cmp(&(&b.from, &b.field)));
        relations
    }
}

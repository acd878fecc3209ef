//! # Snapshot Export
//!
//! The render contract: a flat, JSON-ready description of a view graph.
//!
//! Each node exposes its `viewId` and `type` (`person`, `family`, `etc`) plus
//! the display fields of its kind; links expose `source` and `target` view
//! ids. The layout layer positions these and never reads engine types.

use crate::view::{Link, NodeType, ViewGraph, ViewNode, ViewNodeKind, ViewSnapshot};
use crate::PersonId;
use serde::{Deserialize, Serialize};

/// A node as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeJson {
    pub view_id: u64,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub person_id: Option<PersonId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub generation: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ascendancy_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub living: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub death_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent1: Option<PersonId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent2: Option<PersonId>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<PersonId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub marriage_date: Option<String>,
}

impl NodeJson {
    fn empty(view_id: u64, node_type: NodeType) -> Self {
        Self {
            view_id,
            node_type,
            person_id: None,
            name: None,
            gender: None,
            generation: None,
            age: None,
            ascendancy_number: None,
            living: None,
            birth_date: None,
            death_date: None,
            parent1: None,
            parent2: None,
            children: Vec::new(),
            marriage_date: None,
        }
    }
}

impl From<&ViewNode> for NodeJson {
    fn from(node: &ViewNode) -> Self {
        let mut json = Self::empty(node.view_id.0, node.node_type());
        match &node.kind {
            ViewNodeKind::Person(person) => {
                json.person_id = Some(person.id);
                json.name = Some(person.full_name.clone());
                json.gender = Some(person.gender.clone());
                json.generation = person.generation;
                json.age = person.age;
                json.ascendancy_number = person.ascendancy_number;
                json.living = Some(person.person.is_living());
                json.birth_date = person.person.birth_date().map(str::to_string);
                json.death_date = person.person.death_date().map(str::to_string);
            }
            ViewNodeKind::Family { family, .. } => {
                json.parent1 = family.parent1;
                json.parent2 = family.parent2;
                json.children.clone_from(&family.children);
                json.marriage_date.clone_from(&family.marriage_date);
            }
        }
        json
    }
}

/// Nodes and links of a view graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotJson {
    pub start: PersonId,
    pub nodes: Vec<NodeJson>,
    pub links: Vec<Link>,
}

impl SnapshotJson {
    /// Export an event snapshot.
    #[must_use]
    pub fn from_snapshot(start: PersonId, snapshot: &ViewSnapshot<'_>) -> Self {
        Self {
            start,
            nodes: snapshot.nodes.iter().map(NodeJson::from).collect(),
            links: snapshot.links.to_vec(),
        }
    }
}

impl From<&ViewGraph> for SnapshotJson {
    fn from(graph: &ViewGraph) -> Self {
        Self::from_snapshot(graph.start(), &graph.snapshot())
    }
}

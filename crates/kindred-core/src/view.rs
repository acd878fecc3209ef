//! # View Graph
//!
//! The visible subset of the family tree: person nodes, family nodes and
//! collapsed `etc` placeholders, joined by directed links (parent -> family,
//! family -> child).
//!
//! `show_family` and `hide_family` are the only mutations. Every insertion is
//! de-duplicated: person nodes are keyed by `PersonId`, family nodes by
//! `FamilyKey`. A family node is either shown or collapsed (`etc`) and only
//! ever moves between those two states.
//!
//! Nodes live in a vector ordered by view id; links refer to nodes by view id
//! and [`ViewGraph::endpoints`] resolves them.

use crate::family::{FamilyKey, FamilyView};
use crate::{KindredError, Person, PersonId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// NODES AND LINKS
// =============================================================================

/// Identifier of a node within one view graph. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(pub u64);

/// External type discriminator of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Person,
    Family,
    Etc,
}

impl NodeType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Person => "person",
            NodeType::Family => "family",
            NodeType::Etc => "etc",
        }
    }
}

/// Display state of a family node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FamilyState {
    Shown,
    /// Rendered as an `etc` placeholder that can be expanded.
    Collapsed,
}

/// Person payload of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonNode {
    /// Referenced id. Stays the referenced id even when the record is missing.
    pub id: PersonId,
    /// The record, or the unknown placeholder.
    pub person: Person,
    pub gender: String,
    pub ascendancy_number: Option<u64>,
    pub generation: Option<i32>,
    pub age: Option<i64>,
    pub full_name: String,
}

impl PersonNode {
    /// Build the payload from a record; a missing record becomes the unknown
    /// placeholder.
    #[must_use]
    pub fn new(id: PersonId, person: Option<Person>, lang: Option<&str>) -> Self {
        let person = person.unwrap_or_else(Person::unknown);
        Self {
            id,
            gender: person.gender.as_str().to_string(),
            full_name: person.full_name(lang),
            person,
            ascendancy_number: None,
            generation: None,
            age: None,
        }
    }

    /// Check if the record was missing.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.person.id.is_unknown()
    }
}

/// Node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewNodeKind {
    Person(PersonNode),
    Family {
        family: FamilyView,
        state: FamilyState,
    },
}

/// A visible node.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub view_id: ViewId,
    pub kind: ViewNodeKind,
}

impl ViewNode {
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match &self.kind {
            ViewNodeKind::Person(_) => NodeType::Person,
            ViewNodeKind::Family {
                state: FamilyState::Shown,
                ..
            } => NodeType::Family,
            ViewNodeKind::Family {
                state: FamilyState::Collapsed,
                ..
            } => NodeType::Etc,
        }
    }

    /// Person payload, for person nodes.
    #[must_use]
    pub fn person(&self) -> Option<&PersonNode> {
        match &self.kind {
            ViewNodeKind::Person(node) => Some(node),
            ViewNodeKind::Family { .. } => None,
        }
    }

    /// Family payload, for family and etc nodes.
    #[must_use]
    pub fn family(&self) -> Option<&FamilyView> {
        match &self.kind {
            ViewNodeKind::Family { family, .. } => Some(family),
            ViewNodeKind::Person(_) => None,
        }
    }

    fn is_shown_family(&self) -> bool {
        self.node_type() == NodeType::Family
    }
}

/// Directed link between two nodes, by view id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source: ViewId,
    pub target: ViewId,
}

impl Link {
    fn undirected(&self) -> (ViewId, ViewId) {
        if self.source <= self.target {
            (self.source, self.target)
        } else {
            (self.target, self.source)
        }
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// Kind of change notified to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewEventKind {
    Add,
    Remove,
}

/// The full node and link set at the time of an event.
#[derive(Debug, Clone, Copy)]
pub struct ViewSnapshot<'a> {
    pub nodes: &'a [ViewNode],
    pub links: &'a [Link],
}

/// Change callback registered with [`ViewGraph::subscribe`].
pub type ViewObserver = Box<dyn FnMut(ViewEventKind, &ViewSnapshot<'_>) + Send>;

/// Outcome of the initial population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulateReport {
    /// Candidates produced by the mode selector.
    pub families_requested: usize,
    /// Families that ended up shown.
    pub families_shown: usize,
    /// True when candidates were dropped to respect the node budget.
    pub truncated: bool,
}

// =============================================================================
// FAMILY SOURCE
// =============================================================================

/// What the view graph needs from the model side.
pub trait FamilySource {
    /// Payload for a person node.
    fn person_node(&mut self, id: PersonId) -> Result<PersonNode, KindredError>;

    /// Families in which the person is a parent.
    fn families_as_parent(&mut self, id: PersonId) -> Result<Vec<FamilyView>, KindredError>;

    /// Families in which the person is a child.
    fn families_as_child(&mut self, id: PersonId) -> Result<Vec<FamilyView>, KindredError>;
}

// =============================================================================
// VIEW GRAPH
// =============================================================================

/// Observable, de-duplicated set of visible nodes and links.
pub struct ViewGraph {
    start: PersonId,
    nodes: Vec<ViewNode>,
    links: Vec<Link>,
    /// Unordered pairs of linked nodes.
    link_index: BTreeSet<(ViewId, ViewId)>,
    person_index: BTreeMap<PersonId, ViewId>,
    family_index: BTreeMap<FamilyKey, ViewId>,
    next_view_id: u64,
    observers: Vec<ViewObserver>,
}

impl std::fmt::Debug for ViewGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewGraph")
            .field("start", &self.start)
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ViewGraph {
    /// Create a graph holding only the start person.
    ///
    /// No etc fringe is added here; `show_family` creates it around the
    /// members of each family it shows.
    pub fn new<F: FamilySource + ?Sized>(
        start: PersonId,
        source: &mut F,
    ) -> Result<Self, KindredError> {
        let mut graph = Self {
            start,
            nodes: Vec::new(),
            links: Vec::new(),
            link_index: BTreeSet::new(),
            person_index: BTreeMap::new(),
            family_index: BTreeMap::new(),
            next_view_id: 0,
            observers: Vec::new(),
        };
        graph.ensure_person(start, source)?;
        Ok(graph)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// The pinned start person.
    pub fn start(&self) -> PersonId {
        self.start
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[ViewNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn snapshot(&self) -> ViewSnapshot<'_> {
        ViewSnapshot {
            nodes: &self.nodes,
            links: &self.links,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Number of collapsed family placeholders.
    pub fn etc_count(&self) -> usize {
        self.count_type(NodeType::Etc)
    }

    /// Number of shown families.
    pub fn family_count(&self) -> usize {
        self.count_type(NodeType::Family)
    }

    pub fn person_count(&self) -> usize {
        self.person_index.len()
    }

    fn count_type(&self, node_type: NodeType) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.node_type() == node_type)
            .count()
    }

    pub fn node(&self, view_id: ViewId) -> Option<&ViewNode> {
        self.nodes
            .binary_search_by_key(&view_id, |node| node.view_id)
            .ok()
            .map(|index| &self.nodes[index])
    }

    fn node_mut(&mut self, view_id: ViewId) -> Option<&mut ViewNode> {
        self.nodes
            .binary_search_by_key(&view_id, |node| node.view_id)
            .ok()
            .map(|index| &mut self.nodes[index])
    }

    /// Node of a visible person.
    pub fn person_node(&self, person: PersonId) -> Option<&ViewNode> {
        self.person_index
            .get(&person)
            .and_then(|view_id| self.node(*view_id))
    }

    /// Family or etc node of a family.
    pub fn family_by_key(&self, key: FamilyKey) -> Option<&ViewNode> {
        self.family_index
            .get(&key)
            .and_then(|view_id| self.node(*view_id))
    }

    pub fn contains_person(&self, person: PersonId) -> bool {
        self.person_index.contains_key(&person)
    }

    /// Check if the family is currently shown (not collapsed).
    pub fn is_shown(&self, key: FamilyKey) -> bool {
        self.family_by_key(key)
            .is_some_and(ViewNode::is_shown_family)
    }

    /// Source and target nodes of a link.
    pub fn endpoints(&self, link: &Link) -> Option<(&ViewNode, &ViewNode)> {
        Some((self.node(link.source)?, self.node(link.target)?))
    }

    /// Register a change observer.
    pub fn subscribe(
        &mut self,
        observer: impl FnMut(ViewEventKind, &ViewSnapshot<'_>) + Send + 'static,
    ) {
        self.observers.push(Box::new(observer));
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Show a family with its members and the `etc` fringe around them.
    ///
    /// Returns false if the family was already shown.
    pub fn show_family<F: FamilySource + ?Sized>(
        &mut self,
        family: &FamilyView,
        source: &mut F,
    ) -> Result<bool, KindredError> {
        let key = family.key();

        let family_id = match self.family_index.get(&key).copied() {
            Some(view_id) => {
                let Some(node) = self.node_mut(view_id) else {
                    return Err(KindredError::InvalidDataset(format!(
                        "view index points at missing node {}",
                        view_id.0
                    )));
                };
                if node.is_shown_family() {
                    return Ok(false);
                }
                node.kind = ViewNodeKind::Family {
                    family: family.clone(),
                    state: FamilyState::Shown,
                };
                view_id
            }
            None => {
                let view_id = self.insert_node(ViewNodeKind::Family {
                    family: family.clone(),
                    state: FamilyState::Shown,
                });
                self.family_index.insert(key, view_id);
                view_id
            }
        };

        for parent in family.parents() {
            let parent_id = self.ensure_person(parent, source)?;
            self.link(parent_id, family_id);
        }
        for child in &family.children {
            let child_id = self.ensure_person(*child, source)?;
            self.link(family_id, child_id);
        }

        for member in family.members() {
            let Some(member_id) = self.person_index.get(&member).copied() else {
                continue;
            };
            for other in source.families_as_child(member)? {
                if other.key() != key {
                    let etc_id = self.ensure_family(&other);
                    self.link(etc_id, member_id);
                }
            }
            for other in source.families_as_parent(member)? {
                if other.key() != key {
                    let etc_id = self.ensure_family(&other);
                    self.link(member_id, etc_id);
                }
            }
        }

        self.emit(ViewEventKind::Add);
        Ok(true)
    }

    /// Collapse a shown family and remove members that hang only on it.
    ///
    /// Returns false (and logs a warning) if the family is not shown or
    /// contains the start person.
    pub fn hide_family(&mut self, family: &FamilyView) -> Result<bool, KindredError> {
        let key = family.key();

        let Some(family_id) = self.family_index.get(&key).copied() else {
            tracing::warn!(?key, "hide requested for a family that is not in the view");
            return Ok(false);
        };
        let shown = match self.node(family_id) {
            Some(node) if node.is_shown_family() => node.family().cloned(),
            _ => None,
        };
        let Some(shown) = shown else {
            tracing::warn!(?key, "hide requested for a family that is not shown");
            return Ok(false);
        };
        if shown.contains(self.start) {
            tracing::warn!(?key, start = self.start.0, "family of the start person cannot be hidden");
            return Ok(false);
        }

        let leaves: Vec<(PersonId, ViewId)> = shown
            .members()
            .into_iter()
            .filter_map(|member| {
                let view_id = *self.person_index.get(&member)?;
                let linked = self.linked_shown_families(view_id);
                (linked.len() == 1 && linked.contains(&family_id)).then_some((member, view_id))
            })
            .collect();

        let mut removed = BTreeSet::new();
        for (member, view_id) in &leaves {
            self.person_index.remove(member);
            removed.insert(*view_id);
        }

        let mut orphaned = Vec::new();
        for (_, leaf_id) in &leaves {
            for neighbor in self.neighbors(*leaf_id) {
                if neighbor == family_id || removed.contains(&neighbor) {
                    continue;
                }
                let Some(node) = self.node(neighbor) else {
                    continue;
                };
                if node.node_type() != NodeType::Etc {
                    continue;
                }
                if let Some(etc) = node.family()
                    && etc
                        .members()
                        .iter()
                        .all(|member| !self.person_index.contains_key(member))
                {
                    orphaned.push(etc.key());
                    removed.insert(neighbor);
                }
            }
        }
        for orphan in orphaned {
            self.family_index.remove(&orphan);
        }

        if let Some(node) = self.node_mut(family_id)
            && let ViewNodeKind::Family { state, .. } = &mut node.kind
        {
            *state = FamilyState::Collapsed;
        }

        self.nodes.retain(|node| !removed.contains(&node.view_id));
        self.links
            .retain(|link| !removed.contains(&link.source) && !removed.contains(&link.target));
        self.link_index = self.links.iter().map(Link::undirected).collect();

        tracing::debug!(?key, removed = removed.len(), "family hidden");
        self.emit(ViewEventKind::Remove);
        Ok(true)
    }

    /// Show an initial candidate list, bounded by a person node budget.
    ///
    /// Candidates are taken in order until the next one would push the
    /// number of distinct persons past `max_person_nodes`; the rest are
    /// dropped. `progress` receives `(done, total)` after every family.
    pub fn populate<F: FamilySource + ?Sized>(
        &mut self,
        families: &[FamilyView],
        max_person_nodes: usize,
        source: &mut F,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<PopulateReport, KindredError> {
        let mut persons: BTreeSet<PersonId> = self.person_index.keys().copied().collect();
        let mut accepted = families.len();

        for (index, family) in families.iter().enumerate() {
            let new_members: Vec<PersonId> = family
                .members()
                .into_iter()
                .filter(|member| !persons.contains(member))
                .collect();
            if persons.len() + new_members.len() > max_person_nodes {
                accepted = index;
                break;
            }
            persons.extend(new_members);
        }

        let truncated = accepted < families.len();
        if truncated {
            tracing::warn!(
                requested = families.len(),
                accepted,
                max_person_nodes,
                "view truncated to respect the person node budget"
            );
        }

        let mut shown = 0;
        for (index, family) in families[..accepted].iter().enumerate() {
            if self.show_family(family, source)? {
                shown += 1;
            }
            progress(index + 1, accepted);
        }

        Ok(PopulateReport {
            families_requested: families.len(),
            families_shown: shown,
            truncated,
        })
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn insert_node(&mut self, kind: ViewNodeKind) -> ViewId {
        let view_id = ViewId(self.next_view_id);
        self.next_view_id += 1;
        self.nodes.push(ViewNode { view_id, kind });
        view_id
    }

    fn ensure_person<F: FamilySource + ?Sized>(
        &mut self,
        person: PersonId,
        source: &mut F,
    ) -> Result<ViewId, KindredError> {
        if let Some(view_id) = self.person_index.get(&person) {
            return Ok(*view_id);
        }
        let payload = source.person_node(person)?;
        let view_id = self.insert_node(ViewNodeKind::Person(payload));
        self.person_index.insert(person, view_id);
        Ok(view_id)
    }

    /// Existing node of the family, or a new `etc` placeholder.
    fn ensure_family(&mut self, family: &FamilyView) -> ViewId {
        let key = family.key();
        if let Some(view_id) = self.family_index.get(&key) {
            return *view_id;
        }
        let view_id = self.insert_node(ViewNodeKind::Family {
            family: family.clone(),
            state: FamilyState::Collapsed,
        });
        self.family_index.insert(key, view_id);
        view_id
    }

    /// Add a link unless the two nodes are already joined in either direction.
    fn link(&mut self, source: ViewId, target: ViewId) -> bool {
        let link = Link { source, target };
        if !self.link_index.insert(link.undirected()) {
            return false;
        }
        self.links.push(link);
        true
    }

    fn neighbors(&self, view_id: ViewId) -> Vec<ViewId> {
        self.links
            .iter()
            .filter_map(|link| {
                if link.source == view_id {
                    Some(link.target)
                } else if link.target == view_id {
                    Some(link.source)
                } else {
                    None
                }
            })
            .collect()
    }

    fn linked_shown_families(&self, view_id: ViewId) -> BTreeSet<ViewId> {
        self.neighbors(view_id)
            .into_iter()
            .filter(|neighbor| {
                self.node(*neighbor)
                    .is_some_and(ViewNode::is_shown_family)
            })
            .collect()
    }

    fn emit(&mut self, kind: ViewEventKind) {
        let snapshot = ViewSnapshot {
            nodes: &self.nodes,
            links: &self.links,
        };
        for observer in &mut self.observers {
            observer(kind, &snapshot);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! The discrimination tree shared by every registered rule.
//!
//! Each condition (or consequence) pattern is normalized and inserted as a chain of
//! nodes, one per leaf path. Patterns that agree up to variable renaming share their
//! chain. Propagating a fact walks every branch compatible with its paths and reports
//! a [`Hit`] for each pattern that ends where the fact does.

use crate::{
    activation::{ActivationData, Agenda},
    matching::{Matching, VarMap},
    rule::Rule,
    syntax::{Fact, Path},
};

use ::{
    im::Vector,
    indexmap::IndexMap,
    smallvec::SmallVec,
    std::{
        collections::{HashMap, HashSet},
        fmt::Debug,
        rc::Rc,
    },
    tracing::trace,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

#[derive(Debug, Clone)]
pub struct Continuation {
    /// The pattern as written in the rule.
    pub condition: Fact,
    pub varmap: VarMap,
    pub rule: Rc<Rule>,
}

#[derive(Debug, Clone, Default)]
pub struct EndNode {
    pub continuations: IndexMap<String, Continuation>,
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    /// The edge leading here. Empty for the root.
    pub path: Path,
    pub parent: Option<NodeId>,
    pub children: HashMap<Path, NodeId>,
    /// The branch taken by a variable seen for the first time in its pattern.
    pub var_child: Option<NodeId>,
    /// Branches for variables that already occurred earlier in their pattern, and for
    /// first occurrences whose path differs from `var_child`'s.
    pub var_children: SmallVec<[NodeId; 2]>,
    pub endnode: Option<EndNode>,
}

/// A pattern matched by a propagated fact, with bindings in the rule's own names.
#[derive(Debug, Clone)]
pub struct Hit {
    pub matching: Matching,
    pub condition: Fact,
    pub rule: Rc<Rule>,
    pub query_rules: bool,
}

/// What a tree indexes and what it does with its hits.
pub trait Side: Debug + Default {
    fn patterns(rule: &Rule) -> &Vector<Fact>;

    fn add_activation(&mut self, agenda: &mut Agenda, hit: Hit);
}

/// Indexes rule conditions. Hits continue forward chaining.
#[derive(Debug, Default)]
pub struct Conditions;

impl Side for Conditions {
    fn patterns(rule: &Rule) -> &Vector<Fact> {
        &rule.conditions
    }

    fn add_activation(&mut self, agenda: &mut Agenda, hit: Hit) {
        agenda.push(ActivationData::Rule {
            rule: hit.rule,
            matching: hit.matching,
            condition: Some(hit.condition),
            query_rules: hit.query_rules,
        });
    }
}

/// Indexes rule consequences. Hits are only collected, for goal queries.
#[derive(Debug, Default)]
pub struct Consequences {
    backtracks: Vec<Hit>,
}

impl Consequences {
    pub fn take_backtracks(&mut self) -> Vec<Hit> {
        std::mem::replace(&mut self.backtracks, Vec::new())
    }
}

impl Side for Consequences {
    fn patterns(rule: &Rule) -> &Vector<Fact> {
        &rule.consequences
    }

    fn add_activation(&mut self, _agenda: &mut Agenda, hit: Hit) {
        self.backtracks.push(hit);
    }
}

pub type CondSet = RuleSet<Conditions>;
pub type ConsSet = RuleSet<Consequences>;

#[derive(Debug)]
pub struct RuleSet<S: Side> {
    nodes: Vec<Node>,
    side: S,
}

impl<S: Side> Default for RuleSet<S> {
    fn default() -> Self {
        Self {
            nodes: vec![Node::default()],
            side: S::default(),
        }
    }
}

impl<S: Side> RuleSet<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }

    /// Number of registered continuations.
    pub fn rule_count(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(|node| node.endnode.as_ref())
            .map(|end| end.continuations.len())
            .sum()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn side(&self) -> &S {
        &self.side
    }

    pub fn side_mut(&mut self) -> &mut S {
        &mut self.side
    }

    /// The nodes from `id`'s parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[id.0].parent, move |&id| self.nodes[id.0].parent)
    }

    /// Register every pattern of `rule`. Returns whether anything new was registered.
    pub fn add_rule(&mut self, rule: &Rc<Rule>) -> bool {
        let mut added = false;
        for pattern in S::patterns(rule) {
            let (varmap, paths) = pattern.normalize();
            let mut seen = HashSet::new();
            let mut node = NodeId::ROOT;
            for path in paths {
                node = self.step(node, path, &mut seen);
            }

            let key = format!(
                "{}|{}|{}",
                rule.key(),
                varmap
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(","),
                pattern
            );
            let continuations = &mut self.nodes[node.0]
                .endnode
                .get_or_insert_with(EndNode::default)
                .continuations;
            if !continuations.contains_key(&key) {
                trace!(rule = %rule, pattern = %pattern, "registered pattern");
                continuations.insert(
                    key,
                    Continuation {
                        condition: pattern.clone(),
                        varmap,
                        rule: rule.clone(),
                    },
                );
                added = true;
            }
        }
        added
    }

    /// The node a normalized pattern ends at, if it has been registered.
    pub fn lookup(&self, pattern: &Fact) -> Option<NodeId> {
        let (_, paths) = pattern.normalize();
        let mut seen = HashSet::new();
        let mut id = NodeId::ROOT;
        for path in paths {
            let node = &self.nodes[id.0];
            id = if !path.is_var() {
                *node.children.get(&path)?
            } else if seen.insert(path.value().to_string())
                && node.var_child.map(|c| self.nodes[c.0].path == path) == Some(true)
            {
                node.var_child?
            } else {
                node.var_children
                    .iter()
                    .copied()
                    .find(|&c| self.nodes[c.0].path == path)?
            };
        }
        Some(id)
    }

    fn step(&mut self, id: NodeId, path: Path, seen: &mut HashSet<String>) -> NodeId {
        if !path.is_var() {
            if let Some(&child) = self.nodes[id.0].children.get(&path) {
                return child;
            }
            let child = self.push_node(id, path.clone());
            self.nodes[id.0].children.insert(path, child);
            return child;
        }

        if seen.insert(path.value().to_string()) {
            match self.nodes[id.0].var_child {
                None => {
                    let child = self.push_node(id, path);
                    self.nodes[id.0].var_child = Some(child);
                    return child;
                }
                Some(child) if self.nodes[child.0].path == path => return child,
                Some(_) => {}
            }
        }

        let existing = self.nodes[id.0]
            .var_children
            .iter()
            .copied()
            .find(|&c| self.nodes[c.0].path == path);
        match existing {
            Some(child) => child,
            None => {
                let child = self.push_node(id, path);
                self.nodes[id.0].var_children.push(child);
                child
            }
        }
    }

    fn push_node(&mut self, parent: NodeId, path: Path) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            path,
            parent: Some(parent),
            ..Node::default()
        });
        id
    }

    /// Walk `paths` through the tree, reporting every pattern that matches them
    /// completely to the side.
    pub fn propagate(
        &mut self,
        paths: &[Path],
        matching: &Matching,
        agenda: &mut Agenda,
        query_rules: bool,
    ) {
        let mut propagation = Propagation {
            nodes: &self.nodes,
            side: &mut self.side,
            agenda,
            query_rules,
        };
        propagation.walk(NodeId::ROOT, paths, matching);
    }
}

struct Propagation<'a, S> {
    nodes: &'a [Node],
    side: &'a mut S,
    agenda: &'a mut Agenda,
    query_rules: bool,
}

impl<'a, S: Side> Propagation<'a, S> {
    fn walk(&mut self, id: NodeId, paths: &[Path], matching: &Matching) {
        let nodes = self.nodes;
        let node = &nodes[id.0];

        let first = match paths.first() {
            Some(first) => first,
            None => {
                if let Some(end) = &node.endnode {
                    self.add_matching(end, matching);
                }
                return;
            }
        };

        if let Some(&child) = node.children.get(first) {
            self.walk(child, &paths[1..], matching);
        }

        let mut bound_taken = false;
        for &child in &node.var_children {
            let var = &nodes[child.0].path;
            let subpath = match first.get_subpath(var) {
                Some(subpath) => subpath,
                None => continue,
            };
            let rest = subpath.paths_after(paths);

            match matching.get(var.value()) {
                Some(bound) => {
                    if !bound_taken && bound == subpath.value() {
                        bound_taken = true;
                        self.walk(child, rest, matching);
                    }
                }
                None => {
                    if let Some(bound) = matching.bind(var.value(), subpath.value()) {
                        self.walk(child, rest, &bound);
                    }
                }
            }
        }

        if let Some(child) = node.var_child {
            let var = &nodes[child.0].path;
            if let Some(subpath) = first.get_subpath(var) {
                if let Some(bound) = matching.bind(var.value(), subpath.value()) {
                    self.walk(child, subpath.paths_after(paths), &bound);
                }
            }
        }
    }

    fn add_matching(&mut self, end: &EndNode, matching: &Matching) {
        for continuation in end.continuations.values() {
            self.side.add_activation(
                self.agenda,
                Hit {
                    matching: matching.get_real_matching(&continuation.varmap),
                    condition: continuation.condition.clone(),
                    rule: continuation.rule.clone(),
                    query_rules: self.query_rules,
                },
            );
        }
    }
}

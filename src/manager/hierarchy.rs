//! Parent -> children index and session forests.

use crate::agent::{AgentKind, AgentRecord, AgentStatus};
use crate::types::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// In-memory parent -> ordered children map, maintained as branches come and go.
#[derive(Debug, Default)]
pub struct HierarchyIndex {
    children: HashMap<AgentId, Vec<AgentId>>,
}

impl HierarchyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a parent -> child edge. Linking twice is a no-op.
    pub fn link(&mut self, parent: &AgentId, child: &AgentId) {
        let list = self.children.entry(parent.clone()).or_default();
        if !list.contains(child) {
            list.push(child.clone());
        }
    }

    pub fn children(&self, parent: &AgentId) -> &[AgentId] {
        self.children.get(parent).map_or(&[], Vec::as_slice)
    }

    /// Drop a node: its own child list and its entry under any parent.
    pub fn remove_node(&mut self, agent_id: &AgentId) {
        self.children.remove(agent_id);
        for list in self.children.values_mut() {
            list.retain(|c| c != agent_id);
        }
        self.children.retain(|_, list| !list.is_empty());
    }

    /// Number of parents with at least one recorded child.
    pub fn node_count(&self) -> usize {
        self.children.len()
    }
}

/// One agent in a session forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: AgentId,
    pub parent_id: Option<AgentId>,
    pub kind: AgentKind,
    pub topic: String,
    pub depth: u32,
    pub status: AgentStatus,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    fn leaf(agent: &AgentRecord) -> Self {
        Self {
            id: agent.id.clone(),
            parent_id: agent.parent_id.clone(),
            kind: agent.kind,
            topic: agent.topic.clone(),
            depth: agent.depth,
            status: agent.status,
            children: Vec::new(),
        }
    }

    /// Nodes in this subtree, including itself.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(HierarchyNode::size).sum::<usize>()
    }
}

/// Build the forest for rows ordered by (depth, created_at).
///
/// Roots are rows without a parent. Rows whose parent is missing from the
/// input are dropped along with their subtrees.
pub fn build_forest(agents: &[AgentRecord]) -> Vec<HierarchyNode> {
    let mut children_of: HashMap<&AgentId, Vec<&AgentRecord>> = HashMap::new();
    let mut roots = Vec::new();
    for agent in agents {
        match &agent.parent_id {
            Some(parent) => children_of.entry(parent).or_default().push(agent),
            None => roots.push(agent),
        }
    }

    // Assemble bottom-up with an explicit stack: a node is finished once all
    // of its children are.
    let mut finished: HashMap<AgentId, HierarchyNode> = HashMap::new();
    let mut stack: Vec<(&AgentRecord, bool)> = roots.iter().rev().map(|r| (*r, false)).collect();
    while let Some((agent, expanded)) = stack.pop() {
        let kids = children_of.get(&agent.id).map_or(&[][..], Vec::as_slice);
        if !expanded {
            stack.push((agent, true));
            for child in kids.iter().rev() {
                stack.push((*child, false));
            }
            continue;
        }
        let mut node = HierarchyNode::leaf(agent);
        node.children = kids
            .iter()
            .filter_map(|child| finished.remove(&child.id))
            .collect();
        finished.insert(agent.id.clone(), node);
    }

    roots
        .iter()
        .filter_map(|root| finished.remove(&root.id))
        .collect()
}

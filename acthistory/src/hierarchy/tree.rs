use std::collections::HashMap;

use crate::models::{Act, ActId};

use super::MaxDepth;

/// An act emitted by a traversal, with its level in the flattened tree.
/// Roots are at depth 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HierarchyEntry<'a> {
    pub act: &'a Act,
    pub depth: usize,
}

#[derive(Debug)]
struct TreeNode<'a> {
    act: &'a Act,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Arena-backed tree of the acts beneath a single root.
///
/// Every act appears at most once: the index keyed on act id is the visited
/// set, and re-parenting moves an existing node (with its subtree) rather than
/// adding a second copy.
#[derive(Debug)]
pub(crate) struct ActTree<'a> {
    nodes: Vec<TreeNode<'a>>,
    index: HashMap<&'a ActId, usize>,
}

impl<'a> ActTree<'a> {
    pub const ROOT: usize = 0;

    pub fn new(root: &'a Act) -> Self {
        let mut index = HashMap::new();
        index.insert(&root.id, Self::ROOT);
        Self {
            nodes: vec![TreeNode {
                act: root,
                parent: None,
                children: Vec::new(),
            }],
            index,
        }
    }

    pub fn find(&self, id: &ActId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn act(&self, node: usize) -> &'a Act {
        self.nodes[node].act
    }

    /// Append `act` as the last child of `parent`.
    pub fn add(&mut self, parent: usize, act: &'a Act) -> usize {
        let node = self.nodes.len();
        self.nodes.push(TreeNode {
            act,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(node);
        self.index.insert(&act.id, node);
        node
    }

    /// Level of a node; the root is at depth 1.
    pub fn depth(&self, node: usize) -> usize {
        let mut depth = 1;
        let mut current = self.nodes[node].parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.nodes[parent].parent;
        }
        depth
    }

    /// True if `ancestor` is `node` or lies on the path from `node` to the root.
    pub fn is_ancestor_or_self(&self, ancestor: usize, node: usize) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.nodes[candidate].parent;
        }
        false
    }

    /// Detach `node` from its parent and append it, with its subtree, to
    /// `new_parent`.
    pub fn move_to(&mut self, node: usize, new_parent: usize) {
        self.unlink(node);
        self.nodes[node].parent = Some(new_parent);
        self.nodes[new_parent].children.push(node);
    }

    /// Detach `node` and forget it and its descendants.
    pub fn remove(&mut self, node: usize) {
        self.unlink(node);
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let act = self.nodes[current].act;
            if self.index.get(&act.id) == Some(&current) {
                self.index.remove(&act.id);
            }
            stack.extend(self.nodes[current].children.iter().copied());
        }
    }

    fn unlink(&mut self, node: usize) {
        if let Some(parent) = self.nodes[node].parent.take() {
            self.nodes[parent].children.retain(|child| *child != node);
        }
    }

    /// Pre-order traversal from the root, never descending past `max_depth`.
    pub fn flatten(&self, max_depth: MaxDepth) -> Vec<HierarchyEntry<'a>> {
        let mut entries = Vec::with_capacity(self.index.len());
        let mut stack = vec![(Self::ROOT, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            entries.push(HierarchyEntry {
                act: self.nodes[node].act,
                depth,
            });
            if max_depth.expands(depth) {
                stack.extend(
                    self.nodes[node]
                        .children
                        .iter()
                        .rev()
                        .map(|child| (*child, depth + 1)),
                );
            }
        }
        entries
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }
}

//! B+Tree index over i64 keys.
//!
//! Nodes live in an arena of 4 KB pages addressed by u16 page id (pages
//! are created in insertion order and never reclaimed); no node holds an
//! owning reference to another. All data lives in the leaves, which are
//! singly linked left to right for range scans.

pub mod node;

pub use node::{BTreeNode, InternalNode, LeafNode};

use minidb_common::page::{Page, Rid};

/// Maximum keys per node; a node holding more must split.
pub const MAX_KEYS: usize = 4;

/// An order-4 B+Tree mapping i64 keys to record ids.
///
/// Duplicate keys are disallowed by the callers of `insert`; the structure
/// itself does not enforce this.
pub struct BTree {
    /// Node pages; a node's page id is its index here.
    pages: Vec<Page>,
    /// Root page id, None while the tree is empty.
    root: Option<u16>,
}

impl BTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            root: None,
        }
    }

    /// Returns true if no key was ever inserted.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of node pages.
    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    /// Returns the root page id.
    pub fn root(&self) -> Option<u16> {
        self.root
    }

    /// Decodes the node stored at `page_id`.
    pub fn node(&self, page_id: u16) -> BTreeNode {
        BTreeNode::from_page(&self.pages[page_id as usize])
    }

    fn store(&mut self, page_id: u16, node: &BTreeNode) {
        node.write_to(&mut self.pages[page_id as usize]);
    }

    fn alloc(&mut self, node: &BTreeNode) -> u16 {
        let page_id = self.pages.len() as u16;
        let mut page = Page::new();
        node.write_to(&mut page);
        self.pages.push(page);
        page_id
    }

    /// Looks up the record id stored under `key`.
    pub fn search(&self, key: i64) -> Option<Rid> {
        let mut current = self.root?;

        loop {
            match self.node(current) {
                BTreeNode::Internal(node) => {
                    let idx = node
                        .keys
                        .iter()
                        .position(|k| key < *k)
                        .unwrap_or(node.keys.len());
                    current = node.children[idx];
                }
                BTreeNode::Leaf(leaf) => {
                    return leaf
                        .keys
                        .iter()
                        .position(|k| *k == key)
                        .map(|i| leaf.rids[i]);
                }
            }
        }
    }

    /// Returns the record ids of all keys in `[lo, hi]`, ascending.
    ///
    /// Descends to the leaf that would contain `lo` and walks the sibling
    /// chain until a key above `hi` is seen.
    pub fn range_scan(&self, lo: i64, hi: i64) -> Vec<Rid> {
        let mut out = Vec::new();
        let Some(root) = self.root else {
            return out;
        };
        if lo > hi {
            return out;
        }

        let mut current = root;
        let mut leaf = loop {
            match self.node(current) {
                BTreeNode::Internal(node) => {
                    let idx = node
                        .keys
                        .iter()
                        .position(|k| lo < *k)
                        .unwrap_or(node.keys.len());
                    current = node.children[idx];
                }
                BTreeNode::Leaf(leaf) => break leaf,
            }
        };

        loop {
            for (key, rid) in leaf.keys.iter().zip(&leaf.rids) {
                if *key > hi {
                    return out;
                }
                if *key >= lo {
                    out.push(*rid);
                }
            }
            match leaf.next {
                Some(next) => {
                    leaf = match self.node(next) {
                        BTreeNode::Leaf(l) => l,
                        BTreeNode::Internal(_) => return out,
                    };
                }
                None => return out,
            }
        }
    }

    /// Inserts `key` mapped to `rid`, splitting overflowing nodes.
    pub fn insert(&mut self, key: i64, rid: Rid) {
        match self.root {
            None => {
                let leaf = BTreeNode::Leaf(LeafNode {
                    keys: vec![key],
                    rids: vec![rid],
                    next: None,
                });
                let page_id = self.alloc(&leaf);
                self.root = Some(page_id);
            }
            Some(root) => {
                if let Some((separator, right_id)) = self.insert_into(root, key, rid) {
                    let new_root = BTreeNode::Internal(InternalNode {
                        keys: vec![separator],
                        children: vec![root, right_id],
                    });
                    let page_id = self.alloc(&new_root);
                    self.root = Some(page_id);
                }
            }
        }
    }

    /// Recursive insert; a returned pair is a split to propagate upward:
    /// the separator key and the new right sibling's page id.
    fn insert_into(&mut self, page_id: u16, key: i64, rid: Rid) -> Option<(i64, u16)> {
        match self.node(page_id) {
            BTreeNode::Leaf(mut leaf) => {
                let pos = leaf
                    .keys
                    .iter()
                    .position(|k| *k >= key)
                    .unwrap_or(leaf.keys.len());
                leaf.keys.insert(pos, key);
                leaf.rids.insert(pos, rid);

                if leaf.keys.len() <= MAX_KEYS {
                    self.store(page_id, &BTreeNode::Leaf(leaf));
                    return None;
                }

                // Leaf split: right half moves out, the separator is the
                // right half's first key (copied, not removed).
                let mid = leaf.keys.len() / 2;
                let right_keys = leaf.keys.split_off(mid);
                let right_rids = leaf.rids.split_off(mid);
                let separator = right_keys[0];

                let right = BTreeNode::Leaf(LeafNode {
                    keys: right_keys,
                    rids: right_rids,
                    next: leaf.next,
                });
                let right_id = self.alloc(&right);

                leaf.next = Some(right_id);
                self.store(page_id, &BTreeNode::Leaf(leaf));

                Some((separator, right_id))
            }
            BTreeNode::Internal(mut node) => {
                let idx = node
                    .keys
                    .iter()
                    .position(|k| key < *k)
                    .unwrap_or(node.keys.len());
                let (separator, right_id) = self.insert_into(node.children[idx], key, rid)?;

                node.keys.insert(idx, separator);
                node.children.insert(idx + 1, right_id);

                if node.keys.len() <= MAX_KEYS {
                    self.store(page_id, &BTreeNode::Internal(node));
                    return None;
                }

                // Internal split: the middle key is pushed up, not kept.
                let mid = node.keys.len() / 2;
                let push_up = node.keys[mid];
                let right_keys = node.keys.split_off(mid + 1);
                node.keys.pop();
                let right_children = node.children.split_off(mid + 1);

                let right = BTreeNode::Internal(InternalNode {
                    keys: right_keys,
                    children: right_children,
                });
                let right_id = self.alloc(&right);
                self.store(page_id, &BTreeNode::Internal(node));

                Some((push_up, right_id))
            }
        }
    }
}

impl Default for BTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BTree")
            .field("num_pages", &self.pages.len())
            .field("root", &self.root)
            .finish()
    }
}

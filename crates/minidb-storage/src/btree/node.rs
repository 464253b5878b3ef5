//! B+Tree node page layout.
//!
//! Byte 0 is the node type tag (0 = internal, 1 = leaf); bytes 1-2 hold
//! `num_keys` little-endian.
//!
//! Internal node:
//! ```text
//! | tag:u8 | num_keys:u16 | child:u16 key:i64 | ... | child:u16 |
//! ```
//! `num_keys + 1` children; keys strictly ascending; child `i` covers keys
//! below `keys[i]`, the trailing child covers the rest.
//!
//! Leaf node:
//! ```text
//! | tag:u8 | num_keys:u16 | next_leaf:u16 | key:i64 rid:u16,u16 | ... |
//! ```
//! `next_leaf` of 0 means no right sibling.

use bytes::{Buf, BufMut, BytesMut};
use minidb_common::page::{Page, Rid};

/// Node type tag for internal nodes.
const TAG_INTERNAL: u8 = 0;
/// Node type tag for leaf nodes.
const TAG_LEAF: u8 = 1;

/// An internal node: separator keys and child page ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode {
    /// Separator keys, strictly ascending.
    pub keys: Vec<i64>,
    /// Child page ids; always `keys.len() + 1` entries.
    pub children: Vec<u16>,
}

/// A leaf node: keys with their record ids, linked to the right sibling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    /// Keys, ascending.
    pub keys: Vec<i64>,
    /// Record id paired with each key.
    pub rids: Vec<Rid>,
    /// Right sibling, if any.
    pub next: Option<u16>,
}

/// A decoded B+Tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BTreeNode {
    Internal(InternalNode),
    Leaf(LeafNode),
}

impl BTreeNode {
    /// Returns true for leaf nodes.
    pub fn is_leaf(&self) -> bool {
        matches!(self, BTreeNode::Leaf(_))
    }

    /// Returns the number of keys in the node.
    pub fn num_keys(&self) -> usize {
        match self {
            BTreeNode::Internal(node) => node.keys.len(),
            BTreeNode::Leaf(node) => node.keys.len(),
        }
    }

    /// Decodes a node from a page image.
    pub fn from_page(page: &Page) -> Self {
        let mut buf: &[u8] = &page.as_bytes()[..];
        let tag = buf.get_u8();
        let num_keys = buf.get_u16_le() as usize;

        if tag == TAG_LEAF {
            let next_raw = buf.get_u16_le();
            let next = if next_raw == 0 { None } else { Some(next_raw) };

            let mut keys = Vec::with_capacity(num_keys);
            let mut rids = Vec::with_capacity(num_keys);
            for _ in 0..num_keys {
                keys.push(buf.get_i64_le());
                let page_id = buf.get_u16_le();
                let slot_id = buf.get_u16_le();
                rids.push(Rid::new(page_id, slot_id));
            }

            BTreeNode::Leaf(LeafNode { keys, rids, next })
        } else {
            let mut keys = Vec::with_capacity(num_keys);
            let mut children = Vec::with_capacity(num_keys + 1);
            for _ in 0..num_keys {
                children.push(buf.get_u16_le());
                keys.push(buf.get_i64_le());
            }
            children.push(buf.get_u16_le());

            BTreeNode::Internal(InternalNode { keys, children })
        }
    }

    /// Encodes the node into a page image, clearing stale bytes.
    pub fn write_to(&self, page: &mut Page) {
        let mut buf = BytesMut::with_capacity(64);

        match self {
            BTreeNode::Leaf(node) => {
                debug_assert_eq!(node.keys.len(), node.rids.len());
                buf.put_u8(TAG_LEAF);
                buf.put_u16_le(node.keys.len() as u16);
                buf.put_u16_le(node.next.unwrap_or(0));
                for (key, rid) in node.keys.iter().zip(&node.rids) {
                    buf.put_i64_le(*key);
                    buf.put_u16_le(rid.page_id);
                    buf.put_u16_le(rid.slot_id);
                }
            }
            BTreeNode::Internal(node) => {
                debug_assert_eq!(node.children.len(), node.keys.len() + 1);
                buf.put_u8(TAG_INTERNAL);
                buf.put_u16_le(node.keys.len() as u16);
                for (key, child) in node.keys.iter().zip(&node.children) {
                    buf.put_u16_le(*child);
                    buf.put_i64_le(*key);
                }
                buf.put_u16_le(*node.children.last().unwrap());
            }
        }

        page.clear();
        page.write(0, &buf);
    }
}

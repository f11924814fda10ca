//! Parse stacks with shared prefixes.
//!
//! Forking a parse version copies only the head pointer: the links below it
//! are shared through `Arc` until one of the versions pops past them.

use crate::syntax::{GreenNode, Length, StateId};
use std::sync::Arc;

#[derive(Debug)]
struct Link {
    state: StateId,
    /// `None` only for the bottom link.
    node: Option<Arc<GreenNode>>,
    extra: bool,
    /// Absolute end of the text covered up to and including this link.
    end: Length,
    prev: Option<Arc<Link>>,
    depth: usize,
}

impl Drop for Link {
    fn drop(&mut self) {
        let mut prev = self.prev.take();
        while let Some(link) = prev {
            prev = match Arc::try_unwrap(link) {
                Ok(mut link) => link.prev.take(),
                Err(_) => None,
            };
        }
    }
}

/// One element popped off a stack.
#[derive(Debug, Clone)]
pub(crate) struct Popped {
    pub node: Arc<GreenNode>,
    pub extra: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Stack {
    head: Arc<Link>,
}

impl Stack {
    pub fn new(initial: StateId) -> Self {
        Self {
            head: Arc::new(Link {
                state: initial,
                node: None,
                extra: false,
                end: Length::zero(),
                prev: None,
                depth: 1,
            }),
        }
    }

    pub fn state(&self) -> StateId {
        self.head.state
    }

    pub fn end(&self) -> Length {
        self.head.end
    }

    pub fn depth(&self) -> usize {
        self.head.depth
    }

    pub fn push(&mut self, state: StateId, node: Arc<GreenNode>) {
        self.link(state, node, false);
    }

    /// Push a node that does not take part in the grammar (trivia or a
    /// recovered error). The state does not change.
    pub fn push_extra(&mut self, node: Arc<GreenNode>) {
        self.link(self.head.state, node, true);
    }

    fn link(&mut self, state: StateId, node: Arc<GreenNode>, extra: bool) {
        let end = self.head.end + node.len();
        let depth = self.head.depth + 1;
        self.head = Arc::new(Link {
            state,
            node: Some(node),
            extra,
            end,
            prev: Some(self.head.clone()),
            depth,
        });
    }

    /// Pop links until `count` non-extra links are removed, returning them
    /// with the extras between them in document order.
    ///
    /// Returns `None`, leaving the stack untouched, if the stack holds fewer
    /// than `count` non-extra links.
    pub fn pop(&mut self, count: usize) -> Option<Vec<Popped>> {
        let mut popped = Vec::with_capacity(count);
        let mut remaining = count;
        let mut current = self.head.clone();
        while remaining > 0 {
            let node = current.node.clone()?;
            if !current.extra {
                remaining -= 1;
            }
            popped.push(Popped {
                node,
                extra: current.extra,
            });
            current = current.prev.clone()?;
        }
        popped.reverse();
        self.head = current;
        Some(popped)
    }

    /// Every node on the stack, bottom to top.
    pub fn nodes(&self) -> Vec<Popped> {
        let mut nodes = Vec::with_capacity(self.depth());
        let mut current = Some(&self.head);
        while let Some(link) = current {
            if let Some(node) = &link.node {
                nodes.push(Popped {
                    node: node.clone(),
                    extra: link.extra,
                });
            }
            current = link.prev.as_ref();
        }
        nodes.reverse();
        nodes
    }

    /// States of the bottom link and of every non-extra link, bottom to top.
    pub fn states(&self) -> Vec<StateId> {
        let mut states = Vec::with_capacity(self.depth());
        let mut current = Some(&self.head);
        while let Some(link) = current {
            if !link.extra {
                states.push(link.state);
            }
            current = link.prev.as_ref();
        }
        states.reverse();
        states
    }

    /// Whether both stacks have the same shape: the same states and extras
    /// at every depth, so that any further input is handled identically.
    pub fn same_shape(&self, other: &Self) -> bool {
        let mut left = Some(&self.head);
        let mut right = Some(&other.head);
        loop {
            match (left, right) {
                (None, None) => return true,
                (Some(a), Some(b)) => {
                    if Arc::ptr_eq(a, b) {
                        return true;
                    }
                    if a.state != b.state || a.extra != b.extra || a.depth != b.depth || a.end != b.end {
                        return false;
                    }
                    left = a.prev.as_ref();
                    right = b.prev.as_ref();
                }
                _ => return false,
            }
        }
    }
}

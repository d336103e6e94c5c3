//! Tree traversal: pre-order iteration, in-place edits and extraction.

use std::slice;

use crate::ast::{Node, NodeType, Props};

/// Pre-order, depth-first iterator over a forest.
///
/// Yields each node before its children and siblings in order.
#[derive(Debug, Clone)]
pub struct Walk<'n, 'a> {
    stack: Vec<slice::Iter<'n, Node<'a>>>,
}

impl<'n, 'a> Iterator for Walk<'n, 'a> {
    type Item = &'n Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(node) => {
                    if !node.children().is_empty() {
                        self.stack.push(node.children().iter());
                    }
                    return Some(node);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Iterate over every node of `nodes` in pre-order.
pub fn walk<'n, 'a>(nodes: &'n [Node<'a>]) -> Walk<'n, 'a> {
    Walk {
        stack: vec![nodes.iter()],
    }
}

/// Call `f` on the props of every node, in pre-order.
///
/// The callback may rewrite props but cannot change the shape of the tree:
/// an edit that turns a node into another type is undone (see
/// [`Node::update_props`]).
///
/// ```
/// use mfm_core::{inspect, parse, to_string, Props};
///
/// let mut nodes = parse("good morning [tada everynyan!]").unwrap();
/// inspect(&mut nodes, |props| {
///     if let Props::Text { text } = props {
///         *text = text.replace("good morning", "hello").into();
///     }
/// });
/// assert_eq!(to_string(&nodes), "hello [tada everynyan!]");
/// ```
pub fn inspect<'a, F>(nodes: &mut [Node<'a>], mut f: F)
where
    F: FnMut(&mut Props<'a>),
{
    inspect_forest(nodes, &mut f);
}

fn inspect_forest<'a, F>(nodes: &mut [Node<'a>], f: &mut F)
where
    F: FnMut(&mut Props<'a>),
{
    for node in nodes {
        node.update_props(&mut *f);
        inspect_forest(node.children_mut(), f);
    }
}

/// Every node of type `ty`, in pre-order.
pub fn extract<'n, 'a>(nodes: &'n [Node<'a>], ty: NodeType) -> Vec<&'n Node<'a>> {
    extract_by(nodes, |node| node.node_type() == ty)
}

/// Every node matching `pred`, in pre-order.
pub fn extract_by<'n, 'a, P>(nodes: &'n [Node<'a>], mut pred: P) -> Vec<&'n Node<'a>>
where
    P: FnMut(&Node<'a>) -> bool,
{
    walk(nodes).filter(|node| pred(node)).collect()
}

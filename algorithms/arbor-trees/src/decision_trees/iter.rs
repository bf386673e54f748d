use std::iter::Iterator;

use super::TreeNode;
use arbor::{Float, Label};

/// Pre-order (DFT) iterator of nodes in a decision tree, left subtrees first
pub struct NodeIter<'a, F, L> {
    stack: Vec<&'a TreeNode<F, L>>,
}

impl<'a, F, L> NodeIter<'a, F, L> {
    pub fn new(stack: Vec<&'a TreeNode<F, L>>) -> Self {
        NodeIter { stack }
    }
}

impl<'a, F: Float, L: Label> Iterator for NodeIter<'a, F, L> {
    type Item = &'a TreeNode<F, L>;

    fn next(&mut self) -> Option<Self::Item> {
        self.stack.pop().map(|node| {
            node.children()
                .into_iter()
                .rev()
                .for_each(|child| self.stack.push(child));

            node
        })
    }
}

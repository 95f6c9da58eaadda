use std::sync::Arc;

/// An immutable singly-linked list node.
///
/// Each node points back at the node added before it, so a chain is shared
/// structurally: adding to a node never changes what any existing holder of
/// that node observes. Used to collect appended/prepended elements without
/// copying a buffer on every call.
#[derive(Debug)]
pub struct SingleLinkedNode<T> {
    item: T,
    linked: Option<Arc<SingleLinkedNode<T>>>,
}

impl<T> SingleLinkedNode<T> {
    /// Create the first node of a chain.
    pub fn new(item: T) -> Arc<Self> {
        Arc::new(Self { item, linked: None })
    }

    /// Create a new node that links back to this one.
    pub fn add(self: &Arc<Self>, item: T) -> Arc<Self> {
        Arc::new(Self {
            item,
            linked: Some(self.clone()),
        })
    }

    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn linked(&self) -> Option<&Arc<Self>> {
        self.linked.as_ref()
    }

    /// Number of nodes in the chain starting at this node.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// The node `index` steps back from this one; `0` is this node.
    pub fn get_node(&self, index: usize) -> Option<&Self> {
        let mut node = self;
        for _ in 0..index {
            node = node.linked.as_deref()?;
        }
        Some(node)
    }

    /// Items from the newest node to the oldest.
    pub fn iter(&self) -> SingleLinkedNodeIter<'_, T> {
        SingleLinkedNodeIter { node: Some(self) }
    }
}

impl<T: Clone> SingleLinkedNode<T> {
    /// Items in insertion order, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.count());
        self.fill_reversed(&mut items);
        items
    }

    /// Append the chain's items to `dest`, oldest first.
    pub fn fill_reversed(&self, dest: &mut Vec<T>) {
        let start = dest.len();
        dest.extend(self.iter().cloned());
        dest[start..].reverse();
    }
}

// dropping a long chain recursively would overflow the stack; unlink
// iteratively while we hold the only reference.
impl<T> Drop for SingleLinkedNode<T> {
    fn drop(&mut self) {
        let mut next = self.linked.take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut node) => next = node.linked.take(),
                Err(_) => break,
            }
        }
    }
}

pub struct SingleLinkedNodeIter<'a, T> {
    node: Option<&'a SingleLinkedNode<T>>,
}

impl<'a, T> Iterator for SingleLinkedNodeIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.node?;
        self.node = node.linked.as_deref();
        Some(&node.item)
    }
}

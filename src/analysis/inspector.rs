use crate::language::{
    ast::File,
    visit::{inspect, Node, NodeKind},
};

#[derive(Clone, Copy, Debug)]
struct Event<'a> {
    node: Node<'a>,
    /// Push events: the node's own kind. Pop events: every kind in the
    /// subtree, the node included.
    typ: u64,
    /// Index of the matching pop (for a push) or push (for a pop).
    index: usize,
}

/// Flattened traversal of a set of files, built once and replayed by every
/// pass that asks for nodes of particular kinds.
#[derive(Clone, Debug, Default)]
pub struct Inspector<'a> {
    events: Vec<Event<'a>>,
}

fn mask_of(types: &[NodeKind]) -> u64 {
    if types.is_empty() {
        return u64::MAX;
    }
    types.iter().fold(0, |mask, kind| mask | kind.mask())
}

impl<'a> Inspector<'a> {
    pub fn new(files: &[&'a File]) -> Self {
        let mut events: Vec<Event<'a>> = Vec::new();
        let mut stack: Vec<(usize, u64)> = Vec::new();
        for &file in files {
            inspect(Node::File(file), &mut |node| {
                match node {
                    Some(node) => {
                        let typ = node.kind().mask();
                        stack.push((events.len(), typ));
                        events.push(Event { node, typ, index: 0 });
                    }
                    None => {
                        if let Some((push, typ)) = stack.pop() {
                            let pop = events.len();
                            events.push(Event {
                                node: events[push].node,
                                typ,
                                index: push,
                            });
                            events[push].index = pop;
                            if let Some(parent) = stack.last_mut() {
                                parent.1 |= typ;
                            }
                        }
                    }
                }
                true
            });
        }
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Calls `f` for each node of the given kinds, in depth-first order. An
    /// empty `types` matches every node.
    pub fn preorder(&self, types: &[NodeKind], mut f: impl FnMut(Node<'a>)) {
        let mask = mask_of(types);
        let mut i = 0;
        while i < self.events.len() {
            let ev = self.events[i];
            if ev.index > i {
                if ev.typ & mask != 0 {
                    f(ev.node);
                }
                if self.events[ev.index].typ & mask == 0 {
                    i = ev.index;
                }
            }
            i += 1;
        }
    }

    /// Like [`Inspector::preorder`], but `f` also sees the pop of each
    /// matched node and can prune its children by returning false.
    pub fn nodes(&self, types: &[NodeKind], mut f: impl FnMut(Node<'a>, bool) -> bool) {
        let mask = mask_of(types);
        let mut i = 0;
        while i < self.events.len() {
            let ev = self.events[i];
            if ev.index > i {
                if ev.typ & mask != 0 && !f(ev.node, true) {
                    i = ev.index + 1;
                    continue;
                }
                if self.events[ev.index].typ & mask == 0 {
                    i = ev.index + 1;
                    continue;
                }
            } else if self.events[ev.index].typ & mask != 0 {
                f(ev.node, false);
            }
            i += 1;
        }
    }

    /// Like [`Inspector::nodes`], with the ancestors of the current node,
    /// outermost first and the node itself last.
    pub fn with_stack(&self, types: &[NodeKind], mut f: impl FnMut(Node<'a>, bool, &[Node<'a>]) -> bool) {
        let mask = mask_of(types);
        let mut stack: Vec<Node<'a>> = Vec::new();
        let mut i = 0;
        while i < self.events.len() {
            let ev = self.events[i];
            if ev.index > i {
                stack.push(ev.node);
                if ev.typ & mask != 0 && !f(ev.node, true, &stack) {
                    stack.pop();
                    i = ev.index + 1;
                    continue;
                }
                if self.events[ev.index].typ & mask == 0 {
                    stack.pop();
                    i = ev.index + 1;
                    continue;
                }
            } else {
                if self.events[ev.index].typ & mask != 0 {
                    f(ev.node, false, &stack);
                }
                stack.pop();
            }
            i += 1;
        }
    }
}

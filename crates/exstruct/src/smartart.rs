//! SmartArt node trees from flat `(level, text)` lists.
//!
//! Excel lists a diagram's nodes in document order with a depth each. A node
//! becomes a child of the closest preceding node with a smaller level, or a
//! new root when there is none. Skipped levels are not filled in: a level-2
//! node directly after a level-0 node is that node's child.

use exstruct_core::SmartArtNode;

struct ArenaNode {
    level: u32,
    text: String,
    kids: Vec<usize>,
}

/// Build the node forest in one pass with a `(level, node)` stack.
pub fn build_tree<I, S>(items: I) -> Vec<SmartArtNode>
where
    I: IntoIterator<Item = (u32, S)>,
    S: Into<String>,
{
    let mut arena: Vec<ArenaNode> = Vec::new();
    let mut roots: Vec<usize> = Vec::new();
    let mut stack: Vec<(u32, usize)> = Vec::new();

    for (level, text) in items {
        let idx = arena.len();
        arena.push(ArenaNode {
            level,
            text: text.into(),
            kids: Vec::new(),
        });

        while stack.last().is_some_and(|&(top, _)| top >= level) {
            stack.pop();
        }
        match stack.last() {
            Some(&(_, parent)) => arena[parent].kids.push(idx),
            None => roots.push(idx),
        }
        stack.push((level, idx));
    }

    // Kids always have larger indices than their parent, so building from
    // the back finds every kid already materialized.
    let mut built: Vec<Option<SmartArtNode>> = (0..arena.len()).map(|_| None).collect();
    for idx in (0..arena.len()).rev() {
        let node = &mut arena[idx];
        let kids = node
            .kids
            .iter()
            .filter_map(|&k| built[k].take())
            .collect();
        built[idx] = Some(SmartArtNode {
            level: node.level,
            text: std::mem::take(&mut node.text),
            kids,
        });
    }

    roots
        .into_iter()
        .filter_map(|idx| built[idx].take())
        .collect()
}

/// Pre-order `(level, text)` listing of a forest.
pub fn flatten_nodes(nodes: &[SmartArtNode]) -> Vec<(u32, String)> {
    let mut out = Vec::new();
    let mut stack: Vec<&SmartArtNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push((node.level, node.text.clone()));
        stack.extend(node.kids.iter().rev());
    }
    out
}

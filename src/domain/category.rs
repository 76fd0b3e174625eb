use std::collections::{HashMap, HashSet};

use uuid::Uuid;

/// A category with its parent pointer, detached from the ORM row.
#[derive(Debug, Clone, Copy)]
pub struct CategoryNode {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
}

/// Ids of `root` and every category below it.
///
/// Products tagged anywhere in the subtree match a filter on an ancestor
/// category.
pub fn descendant_ids(nodes: &[CategoryNode], root: Uuid) -> HashSet<Uuid> {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for node in nodes {
        if let Some(parent) = node.parent_id {
            children.entry(parent).or_default().push(node.id);
        }
    }

    let mut ids = HashSet::new();
    let mut queue = vec![root];
    while let Some(id) = queue.pop() {
        if ids.insert(id)
            && let Some(kids) = children.get(&id)
        {
            queue.extend(kids);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: Uuid, parent: Option<Uuid>) -> CategoryNode {
        CategoryNode { id, parent_id: parent }
    }

    #[test]
    fn subtree_is_resolved_at_any_depth() {
        let fruit = Uuid::new_v4();
        let citrus = Uuid::new_v4();
        let oranges = Uuid::new_v4();
        let dairy = Uuid::new_v4();
        let nodes = vec![
            node(fruit, None),
            node(citrus, Some(fruit)),
            node(oranges, Some(citrus)),
            node(dairy, None),
        ];

        let ids = descendant_ids(&nodes, fruit);
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&fruit));
        assert!(ids.contains(&citrus));
        assert!(ids.contains(&oranges));
        assert!(!ids.contains(&dairy));
    }

    #[test]
    fn leaf_resolves_to_itself() {
        let leaf = Uuid::new_v4();
        let ids = descendant_ids(&[node(leaf, None)], leaf);
        assert_eq!(ids, HashSet::from([leaf]));
    }
}

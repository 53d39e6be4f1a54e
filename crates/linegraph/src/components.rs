use petgraph::unionfind::UnionFind;

use crate::adj::AdjacencyMatrix;
use crate::id::GroupId;

/// Connected components of an adjacency relation.
///
/// Components are numbered in order of first appearance: the component
/// containing unit `0` is `GroupId(0)`, the next unseen unit opens `GroupId(1)`,
/// and so on.  Members of each component are listed in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Components {
    labels: Vec<GroupId>,
    members: Vec<Vec<u32>>,
}

impl Components {
    /// Number of components.
    #[inline] pub fn len(&self) -> usize { self.members.len() }

    /// Check if there are no components (empty input).
    #[inline] pub fn is_empty(&self) -> bool { self.members.is_empty() }

    /// Component of each unit, indexed by unit.
    #[inline] pub fn labels(&self) -> &[GroupId] { &self.labels }

    /// Component of a single unit.
    #[inline] pub fn label(&self, unit: usize) -> GroupId { self.labels[unit] }

    /// Units in component `group`, ascending.
    #[inline] pub fn members(&self, group: GroupId) -> &[u32] { &self.members[group.index()] }

    /// Iterate over `(group, members)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &[u32])> + '_ {
        self.members.iter().enumerate().map(|(i, m)| (GroupId(i as u32), m.as_slice()))
    }
}

/// Relabel union-find roots so labels follow first appearance of each root.
/// Returns per-unit labels and the number of distinct labels.
pub(crate) fn label_by_first_appearance(roots: &[usize]) -> (Vec<u32>, usize) {
    let mut assigned: Vec<Option<u32>> = vec![None; roots.len()];
    let mut next = 0u32;
    let labels = roots.iter().map(|&root| {
        *assigned[root].get_or_insert_with(|| { next += 1; next - 1 })
    }).collect();
    (labels, next as usize)
}

/// Compute connected components with index-based union-find.
pub fn connected_components(adjacency: &AdjacencyMatrix) -> Components {
    let n = adjacency.num_units();
    let mut uf = UnionFind::<usize>::new(n);
    for (a, b) in adjacency.edges() {
        uf.union(a as usize, b as usize);
    }

    let roots = (0..n).map(|u| uf.find_mut(u)).collect::<Vec<_>>();
    let (labels, count) = label_by_first_appearance(&roots);

    let mut members = vec![Vec::new(); count];
    labels.iter().enumerate().for_each(|(u, &label)| members[label as usize].push(u as u32));

    Components {
        labels: labels.into_iter().map(GroupId).collect(),
        members,
    }
}

/// A read-only CSR (Compressed Sparse Row) adjacency matrix over features.
///
/// `offsets[u]..offsets[u+1]` indexes into `neighbors` to give the sorted
/// list of features adjacent to feature `u`.  The relation is undirected: every
/// edge is stored in both rows.  Supports O(log deg) membership tests via
/// binary search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyMatrix {
    /// CSR row offsets; length = `num_units + 1`.
    offsets: Vec<u32>,
    /// Flattened neighbor lists; sorted and deduplicated within each row.
    neighbors: Vec<u32>,
}

impl AdjacencyMatrix {
    /// Build a symmetric matrix over `num_units` features from an unordered
    /// list of undirected edges.  Self-loops and duplicate edges are dropped.
    pub fn from_edges(num_units: usize, edges: &[(u32, u32)]) -> Self {
        let mut rows = vec![Vec::new(); num_units];
        for &(a, b) in edges {
            assert!((a as usize) < num_units && (b as usize) < num_units,
                "edge ({a}, {b}) out of range for {num_units} units");
            if a == b { continue }
            rows[a as usize].push(b);
            rows[b as usize].push(a);
        }
        rows.iter_mut().for_each(|row| { row.sort_unstable(); row.dedup(); });

        Self {
            offsets: std::iter::once(0u32).chain(
                rows.iter()
                    .map(|row| row.len() as u32)
                    .scan(0u32, |acc, len| { *acc += len; Some(*acc) })
            ).collect(),
            neighbors: rows.into_iter().flatten().collect(),
        }
    }

    /// Number of features covered by this matrix.
    #[inline] pub fn num_units(&self) -> usize { self.offsets.len().saturating_sub(1) }

    /// Number of undirected edges.
    #[inline] pub fn num_edges(&self) -> usize { self.neighbors.len() / 2 }

    #[inline]
    fn range(&self, unit: usize) -> std::ops::Range<usize> {
        self.offsets[unit] as usize .. self.offsets[unit + 1] as usize
    }

    /// Sorted slice of features adjacent to `unit`.
    #[inline]
    pub fn neighbors(&self, unit: usize) -> &[u32] {
        &self.neighbors[self.range(unit)]
    }

    /// Number of features adjacent to `unit`.
    #[inline] pub fn degree(&self, unit: usize) -> usize { self.range(unit).len() }

    /// Returns `true` if `other` is adjacent to `unit` (binary search).
    #[inline]
    pub fn contains(&self, unit: usize, other: usize) -> bool {
        self.neighbors(unit).binary_search(&(other as u32)).is_ok()
    }

    /// Iterate each undirected edge once, as `(low, high)`.
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.num_units()).flat_map(move |u| {
            self.neighbors(u).iter()
                .filter(move |&&v| v as usize > u)
                .map(move |&v| (u as u32, v))
        })
    }
}

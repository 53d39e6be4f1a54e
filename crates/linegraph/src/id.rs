use std::fmt;

// ---------------------------------------------------------------------------
// Index types
// ---------------------------------------------------------------------------

macro_rules! idx {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Position of this id in its arena.
            #[inline] pub fn index(self) -> usize { self.0 as usize }
        }

        impl From<usize> for $name {
            #[inline] fn from(i: usize) -> Self { Self(i as u32) }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

idx!(
    /// Identifies a single line feature within a normalized working set.
    ///
    /// Ids are contiguous from `0` in working-set order, so they double as
    /// arena indices.
    FeatureId
);

idx!(
    /// Identifies a topological node (a cluster of snapped endpoints).
    NodeId
);

idx!(
    /// Identifies a connected group of features (an island).
    GroupId
);

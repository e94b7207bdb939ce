/// A change to the set of splits a reader owns.
#[derive(Debug)]
pub enum SplitsChange<S> {
    /// Splits to read from. A split whose id is already registered replaces
    /// the old one in place.
    Addition(Vec<S>),
    /// Ids of splits to drop. Each id is reported finished exactly once, in
    /// the next batch the reader builds.
    Removal(Vec<String>),
    /// A change kind announced by the framework that this reader cannot handle.
    Unrecognized { kind: String },
}

impl<S> SplitsChange<S> {
    pub fn kind(&self) -> &str {
        match self {
            SplitsChange::Addition(_) => "addition",
            SplitsChange::Removal(_) => "removal",
            SplitsChange::Unrecognized { kind } => kind,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SplitsChange::Addition(splits) => splits.len(),
            SplitsChange::Removal(split_ids) => split_ids.len(),
            SplitsChange::Unrecognized { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

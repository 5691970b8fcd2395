//! Shared-file listing: one ordered snapshot, used for both the Publish count and payload.

/// Ordered filenames taken from a single pass over the shared location.
///
/// Once built the listing cannot change, so the count written in a Publish
/// header always matches the names that follow it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileListing {
    names: Vec<Vec<u8>>,
}

impl FileListing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a listing from names in the order given.
    pub fn from_names<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Vec<u8>>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.names.iter().map(Vec::as_slice)
    }

    /// Bytes the names occupy on the wire, one NUL terminator each.
    pub fn encoded_len(&self) -> usize {
        self.names.iter().map(|n| n.len() + 1).sum()
    }

    pub fn into_names(self) -> Vec<Vec<u8>> {
        self.names
    }
}

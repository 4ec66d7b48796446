use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Consistency boundary stored and fetched as a whole by its key
pub trait Aggregate: Clone + Debug + Send + Sync + 'static {
    type Key: Clone + Debug + Display + Eq + Ord + Hash + Send + Sync + 'static;

    /// Human readable kind, used in not-found messages and logs
    const KIND: &'static str;

    fn key(&self) -> Self::Key;
}

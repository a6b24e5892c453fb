use crate::common::Result;
use crate::storage::tuple::Tuple;
use crate::types::Schema;
use std::sync::Arc;

/// The pull-based iterator protocol shared by every operator.
///
/// Tuples only materialize when a consumer pulls them: each call to
/// [`OpIterator::fetch_next`] produces the next output tuple or `None` at
/// end-of-stream. Operators own their children, so a tree is driven
/// entirely from its root.
///
/// Lifecycle: an operator starts closed, must be opened before the first
/// fetch, and may be reset with `rewind` (close-then-open semantics) while
/// open. Fetching from a closed operator is an error, never a panic.
pub trait OpIterator {
    /// Transitions the operator (and its children) into the open state.
    fn open(&mut self) -> Result<()>;

    /// Releases iteration state. Fetching afterwards is an error.
    fn close(&mut self) -> Result<()>;

    /// Resets iteration to the beginning of the stream. Only legal while
    /// open.
    fn rewind(&mut self) -> Result<()>;

    /// The schema of the tuples this operator emits.
    fn tuple_desc(&self) -> Arc<Schema>;

    /// Produces the next output tuple, or `None` once the stream is
    /// exhausted.
    fn fetch_next(&mut self) -> Result<Option<Tuple>>;
}

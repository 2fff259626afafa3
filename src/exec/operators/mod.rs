//! Physical operators: pull-based iterators over columnar batches.
//!
//! Every operator exposes a fixed output schema from construction and a
//! three-call lifecycle: `open` initialises state, `next` yields at most
//! one non-empty batch per call until the stream ends, `close` releases
//! held state. Build-phase operators (join build side, aggregate, sort)
//! drain their input inside `open`, so the first `next` may take time
//! proportional to the whole input.

mod aggregate;
mod filter;
mod join;
mod limit;
mod project;
mod scan;
mod sort;

pub use aggregate::{AggregateSpec, HashAggregate};
pub use filter::Selection;
pub use join::HashJoin;
pub use limit::Limit;
pub use project::Project;
pub use scan::ColumnarScan;
pub use sort::OrderBy;

use crate::error::Result;
use crate::storage::{DataType, SharedDictionary};

use super::batch::ExecBatch;

/// The pull-iterator contract shared by all physical operators.
pub trait Operator {
    /// Initialise internal state. Build phases run here.
    fn open(&mut self) -> Result<()>;

    /// The next non-empty batch, or `None` at end-of-stream.
    fn next(&mut self) -> Result<Option<ExecBatch>>;

    /// Release held state.
    fn close(&mut self);

    /// Declared output column names, fixed from construction.
    fn output_names(&self) -> &[String];

    /// Declared output column types, fixed from construction.
    fn output_types(&self) -> &[DataType];

    /// The dictionary that STRING codes in this operator's output refer
    /// to, if any.
    fn dictionary(&self) -> Option<SharedDictionary>;
}

/// Operators compose into trees through boxed children.
pub type BoxedOperator = Box<dyn Operator>;

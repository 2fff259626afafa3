//! Vectorised execution: batches, expression evaluation, physical
//! operators, the driver, and output formatters.

pub mod batch;
pub mod driver;
pub mod expression;
pub mod format;
pub mod operators;

pub use batch::{ColumnSlice, ExecBatch, BATCH_SIZE};
pub use driver::{execute_sql, run_query};
pub use format::{DelimitedFormatter, Formatter, TableFormatter};
pub use operators::{BoxedOperator, Operator};

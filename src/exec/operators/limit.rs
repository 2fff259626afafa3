//! Row-count cap.

use crate::error::Result;
use crate::exec::batch::ExecBatch;
use crate::storage::{DataType, SharedDictionary};

use super::{BoxedOperator, Operator};

/// Produces at most `limit` rows in total, splitting the child batch that
/// crosses the boundary. Reopening resets the counter.
pub struct Limit {
    child: BoxedOperator,
    limit: u64,
    produced: u64,
    names: Vec<String>,
    types: Vec<DataType>,
    dict: Option<SharedDictionary>,
}

impl Limit {
    pub fn new(child: BoxedOperator, limit: u64) -> Self {
        let names = child.output_names().to_vec();
        let types = child.output_types().to_vec();
        let dict = child.dictionary();
        Self {
            child,
            limit,
            produced: 0,
            names,
            types,
            dict,
        }
    }
}

impl Operator for Limit {
    fn open(&mut self) -> Result<()> {
        self.produced = 0;
        self.child.open()
    }

    fn next(&mut self) -> Result<Option<ExecBatch>> {
        if self.produced >= self.limit {
            return Ok(None);
        }
        let batch = match self.child.next()? {
            Some(batch) => batch,
            None => return Ok(None),
        };
        let remaining = (self.limit - self.produced) as usize;
        if batch.len <= remaining {
            self.produced += batch.len as u64;
            return Ok(Some(batch));
        }
        let columns = batch
            .columns
            .iter()
            .map(|column| column.slice(0, remaining))
            .collect();
        self.produced = self.limit;
        Ok(Some(ExecBatch::new(columns, remaining)))
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn output_names(&self) -> &[String] {
        &self.names
    }

    fn output_types(&self) -> &[DataType] {
        &self.types
    }

    fn dictionary(&self) -> Option<SharedDictionary> {
        self.dict.clone()
    }
}

//! Inner hash equi-join.

use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::exec::batch::{ColumnBuilder, ExecBatch, BATCH_SIZE};
use crate::exec::expression::{evaluate_predicate, Bindings};
use crate::sql::ast::Expr;
use crate::storage::{DataType, Datum, DatumKey, SharedDictionary};

use super::{BoxedOperator, Operator};

/// Build/probe hash join. `open` drains the right child, materialising
/// every right row as datums and indexing it by key; `next` streams left
/// batches, emitting one combined row per key match (cross product within
/// a key). Output schema is the left schema followed by the right schema.
///
/// The exported dictionary prefers the side that actually has string
/// columns (left wins when both do). When the build side's codes refer to
/// a different dictionary than the adopted one, its string datums are
/// re-coded through the adopted dictionary during the build, so code
/// equality stays sound for keys and downstream decoding alike.
///
/// An ON clause that was not a plain column equality is carried as a
/// residual predicate and applied over the combined row before emission.
pub struct HashJoin {
    left: BoxedOperator,
    right: BoxedOperator,
    left_key_indices: Vec<usize>,
    right_key_indices: Vec<usize>,
    residual: Option<Expr>,
    out_bindings: Bindings,
    left_width: usize,
    right_dict: Option<SharedDictionary>,
    recode_build: bool,
    table: HashMap<DatumKey, Vec<usize>>,
    build_rows: Vec<Vec<Datum>>,
    probe: Option<ExecBatch>,
    probe_row: usize,
    matches: Vec<usize>,
    match_index: usize,
}

impl HashJoin {
    /// # Errors
    /// `NameResolution` for a key name missing from its side's schema,
    /// `Plan` when the key lists differ in length.
    pub fn new(
        left: BoxedOperator,
        right: BoxedOperator,
        left_keys: Vec<String>,
        right_keys: Vec<String>,
        residual: Option<Expr>,
    ) -> Result<Self> {
        if left_keys.len() != right_keys.len() {
            return Err(EngineError::Plan(format!(
                "join key cardinality mismatch: {} vs {}",
                left_keys.len(),
                right_keys.len()
            )));
        }
        let left_key_indices = resolve_keys(&left_keys, left.output_names())?;
        let right_key_indices = resolve_keys(&right_keys, right.output_names())?;

        let mut names = left.output_names().to_vec();
        names.extend_from_slice(right.output_names());
        let mut types = left.output_types().to_vec();
        types.extend_from_slice(right.output_types());
        let left_width = left.output_names().len();

        let left_dict = left.dictionary();
        let right_dict = right.dictionary();
        let left_has_str = left.output_types().contains(&DataType::Str);
        let right_has_str = right.output_types().contains(&DataType::Str);
        let dict = if left_has_str && left_dict.is_some() {
            left_dict
        } else if right_has_str && right_dict.is_some() {
            right_dict.clone()
        } else {
            left_dict.or_else(|| right_dict.clone())
        };

        let recode_build = right_has_str
            && match (&dict, &right_dict) {
                (Some(adopted), Some(build)) => !std::sync::Arc::ptr_eq(adopted, build),
                _ => false,
            };

        let out_bindings = Bindings::new(names, types, dict);
        Ok(Self {
            left,
            right,
            left_key_indices,
            right_key_indices,
            residual,
            out_bindings,
            left_width,
            right_dict,
            recode_build,
            table: HashMap::new(),
            build_rows: Vec::new(),
            probe: None,
            probe_row: 0,
            matches: Vec::new(),
            match_index: 0,
        })
    }

    /// Translate a build-side string datum into the adopted dictionary.
    fn recode(&self, value: Datum) -> Result<Datum> {
        let Datum::Str(code) = value else {
            return Ok(value);
        };
        let source = self.right_dict.as_ref().ok_or_else(|| {
            EngineError::Type("string column without a dictionary binding".into())
        })?;
        let target = self.out_bindings.dictionary().ok_or_else(|| {
            EngineError::Type("string column without a dictionary binding".into())
        })?;
        let text = source
            .read()
            .get(code)
            .map(str::to_string)
            .ok_or_else(|| EngineError::Type(format!("code {} not in dictionary", code)))?;
        let code = target.write().get_or_add(&text);
        Ok(Datum::Str(code))
    }

    /// Produce the next combined batch of up to 4096 rows, before any
    /// residual filtering.
    fn fill_candidate(&mut self) -> Result<Option<ExecBatch>> {
        let types = self.out_bindings.types().to_vec();
        let mut builders: Vec<ColumnBuilder> =
            types.iter().map(|t| ColumnBuilder::new(*t)).collect();
        let mut produced = 0usize;

        'fill: while produced < BATCH_SIZE {
            if self.match_index >= self.matches.len() {
                // Advance the probe cursor to the next row with matches.
                loop {
                    let need_batch = match &self.probe {
                        Some(batch) => self.probe_row >= batch.len,
                        None => true,
                    };
                    if need_batch {
                        match self.left.next()? {
                            Some(batch) => {
                                self.probe = Some(batch);
                                self.probe_row = 0;
                                continue;
                            }
                            None => break 'fill,
                        }
                    }
                    let Some(batch) = self.probe.as_ref() else {
                        break 'fill;
                    };
                    let mut key = Vec::with_capacity(self.left_key_indices.len());
                    for &index in &self.left_key_indices {
                        key.push(batch.columns[index].value(self.probe_row));
                    }
                    if let Some(rows) = self.table.get(&DatumKey(key)) {
                        self.matches = rows.clone();
                        self.match_index = 0;
                        break;
                    }
                    self.probe_row += 1;
                }
            }

            let Some(batch) = self.probe.as_ref() else {
                break;
            };
            while self.match_index < self.matches.len() && produced < BATCH_SIZE {
                let build_row = &self.build_rows[self.matches[self.match_index]];
                for (column, builder) in builders.iter_mut().take(self.left_width).enumerate() {
                    builder.push_from(&batch.columns[column], self.probe_row)?;
                }
                for (offset, value) in build_row.iter().enumerate() {
                    builders[self.left_width + offset].push(*value)?;
                }
                produced += 1;
                self.match_index += 1;
            }
            if self.match_index >= self.matches.len() {
                self.matches.clear();
                self.match_index = 0;
                self.probe_row += 1;
            }
        }

        if produced == 0 {
            return Ok(None);
        }
        let columns = builders.into_iter().map(ColumnBuilder::finish).collect();
        Ok(Some(ExecBatch::new(columns, produced)))
    }
}

fn resolve_keys(keys: &[String], columns: &[String]) -> Result<Vec<usize>> {
    keys.iter()
        .map(|key| {
            columns
                .iter()
                .position(|c| c == key)
                .ok_or_else(|| EngineError::NameResolution(format!("join key not found: {}", key)))
        })
        .collect()
}

impl Operator for HashJoin {
    fn open(&mut self) -> Result<()> {
        self.table.clear();
        self.build_rows.clear();
        self.probe = None;
        self.probe_row = 0;
        self.matches.clear();
        self.match_index = 0;

        self.right.open()?;
        while let Some(batch) = self.right.next()? {
            for row in 0..batch.len {
                let mut row_datums = batch.row(row);
                if self.recode_build {
                    for value in row_datums.iter_mut() {
                        *value = self.recode(*value)?;
                    }
                }
                let key = DatumKey(
                    self.right_key_indices
                        .iter()
                        .map(|&index| row_datums[index])
                        .collect(),
                );
                let row_id = self.build_rows.len();
                self.build_rows.push(row_datums);
                self.table.entry(key).or_default().push(row_id);
            }
        }
        self.right.close();

        self.left.open()
    }

    fn next(&mut self) -> Result<Option<ExecBatch>> {
        loop {
            let batch = match self.fill_candidate()? {
                Some(batch) => batch,
                None => return Ok(None),
            };
            let residual = match &self.residual {
                Some(residual) => residual,
                None => return Ok(Some(batch)),
            };
            let mut selected = Vec::new();
            for row in 0..batch.len {
                if evaluate_predicate(residual, &batch, row, &self.out_bindings)? {
                    selected.push(row);
                }
            }
            if selected.is_empty() {
                continue;
            }
            if selected.len() == batch.len {
                return Ok(Some(batch));
            }
            let mut columns = Vec::with_capacity(batch.columns.len());
            for column in &batch.columns {
                let mut builder = ColumnBuilder::with_capacity(column.data_type(), selected.len());
                for &row in &selected {
                    builder.push_from(column, row)?;
                }
                columns.push(builder.finish());
            }
            return Ok(Some(ExecBatch::new(columns, selected.len())));
        }
    }

    fn close(&mut self) {
        self.left.close();
        self.table.clear();
        self.build_rows.clear();
        self.probe = None;
        self.matches.clear();
    }

    fn output_names(&self) -> &[String] {
        self.out_bindings.names()
    }

    fn output_types(&self) -> &[DataType] {
        self.out_bindings.types()
    }

    fn dictionary(&self) -> Option<SharedDictionary> {
        self.out_bindings.dictionary()
    }
}

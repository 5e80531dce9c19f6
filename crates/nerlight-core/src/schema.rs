//! Arrow schema for the entity summary table.

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::NerError;
use crate::resolver::SummaryRow;

/// Summary table columns, in display order.
pub fn summary_schema() -> Schema {
    Schema::new(vec![
        Field::new("text", DataType::Utf8, false),
        Field::new("label", DataType::Utf8, false),
        Field::new("score", DataType::Utf8, false),
        Field::new("start", DataType::UInt64, false),
        Field::new("end", DataType::UInt64, false),
    ])
}

/// Build a summary RecordBatch; `score` is the `"NN.NN%"` string.
pub fn summary_batch(rows: &[SummaryRow]) -> Result<RecordBatch, NerError> {
    let text = StringArray::from_iter_values(rows.iter().map(|r| r.text.as_str()));
    let label = StringArray::from_iter_values(rows.iter().map(|r| r.label.as_str()));
    let score = StringArray::from_iter_values(rows.iter().map(SummaryRow::score_percent));
    let start = UInt64Array::from_iter_values(rows.iter().map(|r| r.start as u64));
    let end = UInt64Array::from_iter_values(rows.iter().map(|r| r.end as u64));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(text),
        Arc::new(label),
        Arc::new(score),
        Arc::new(start),
        Arc::new(end),
    ];
    Ok(RecordBatch::try_new(Arc::new(summary_schema()), columns)?)
}

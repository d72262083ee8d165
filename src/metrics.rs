use arrow::array::{BooleanArray, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_writer::ArrowWriter;
use std::fs::File;
use std::sync::Arc;
use crate::types::Cost;

/// One outer ILS iteration's bookkeeping, suitable for serializing a whole
/// run's trajectory for offline analysis. Not read by the core itself.
#[derive(Debug)]
pub struct IterationRecord {
    pub iteration: usize,
    pub candidate_pen: Cost,
    pub candidate_obj: Cost,
    pub current_pen: Cost,
    pub best_obj: Cost,
    pub accepted: bool,
    pub restarted: bool,
    pub time: f64,
}

pub fn serialize_to_parquet(
    iteration_data: &[IterationRecord],
    filename: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let iterations: Int64Array = iteration_data.iter().map(|d| d.iteration as i64).collect();
    let candidate_pens: Int64Array = iteration_data.iter().map(|d| d.candidate_pen).collect();
    let candidate_objs: Int64Array = iteration_data.iter().map(|d| d.candidate_obj).collect();
    let current_pens: Int64Array = iteration_data.iter().map(|d| d.current_pen).collect();
    let best_objs: Int64Array = iteration_data.iter().map(|d| d.best_obj).collect();
    let accepted: BooleanArray = iteration_data.iter().map(|d| d.accepted).collect();
    let restarted: BooleanArray = iteration_data.iter().map(|d| d.restarted).collect();
    let times: Float64Array = iteration_data.iter().map(|d| d.time).collect();

    let schema = Schema::new(vec![
        Field::new("iteration", DataType::Int64, false),
        Field::new("candidate_pen", DataType::Int64, false),
        Field::new("candidate_obj", DataType::Int64, false),
        Field::new("current_pen", DataType::Int64, false),
        Field::new("best_obj", DataType::Int64, false),
        Field::new("accepted", DataType::Boolean, false),
        Field::new("restarted", DataType::Boolean, false),
        Field::new("time", DataType::Float64, false),
    ]);

    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(iterations),
            Arc::new(candidate_pens),
            Arc::new(candidate_objs),
            Arc::new(current_pens),
            Arc::new(best_objs),
            Arc::new(accepted),
            Arc::new(restarted),
            Arc::new(times),
        ],
    )?;

    let file = File::create(filename)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}


/// Arrow schema definitions for exported analysis results.
pub mod gaps {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Float32Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::error::ArrowError;
    use arrow::record_batch::RecordBatch;

    use crate::model::GapRecord;

    /// Schema for flattened gap records, one row per analysed requirement.
    pub fn gap_record_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("requirement_text", DataType::Utf8, false),
            Field::new("requirement_type", DataType::Utf8, false),
            Field::new("section", DataType::Utf8, false),
            Field::new("status", DataType::Utf8, false),
            Field::new("coverage_text", DataType::Utf8, false),
            Field::new("severity", DataType::Utf8, false),
            Field::new("confidence_score", DataType::Float32, false),
            Field::new("recommendation", DataType::Utf8, false),
        ])
    }

    /// Flatten gap records into a single RecordBatch.
    pub fn gap_records_batch(gaps: &[GapRecord]) -> Result<RecordBatch, ArrowError> {
        let utf8 = |f: fn(&GapRecord) -> &str| -> ArrayRef {
            Arc::new(StringArray::from_iter_values(gaps.iter().map(f)))
        };

        let columns: Vec<ArrayRef> = vec![
            utf8(|g| g.id.as_str()),
            utf8(|g| g.regulatory_reference.text.as_str()),
            utf8(|g| g.regulatory_reference.kind.as_str()),
            utf8(|g| g.regulatory_reference.section.as_str()),
            utf8(|g| g.internal_coverage.status.as_str()),
            utf8(|g| g.internal_coverage.coverage_text.as_str()),
            utf8(|g| g.internal_coverage.severity.as_str()),
            Arc::new(Float32Array::from_iter_values(
                gaps.iter().map(|g| g.internal_coverage.confidence_score),
            )),
            utf8(|g| g.internal_coverage.recommendation.as_str()),
        ];

        RecordBatch::try_new(Arc::new(gap_record_schema()), columns)
    }
}

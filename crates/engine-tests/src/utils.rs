use engine_runtime::QueryOutput;
use model::core::value::Value;

/// Ids of the rows a query returned, in order.
pub fn row_ids(output: &QueryOutput) -> Vec<i64> {
    let rows = output
        .rows()
        .unwrap_or_else(|| panic!("expected rows, got {output:?}"));
    rows.iter()
        .map(|row| match row.get_value("id") {
            Value::Int(id) => id,
            other => panic!("row without integer id: {other}"),
        })
        .collect()
}

/// Id of the single row returned by `First`/`Last`, if any.
pub fn single_id(output: &QueryOutput) -> Option<i64> {
    match output {
        QueryOutput::Row(Some(row)) => match row.get_value("id") {
            Value::Int(id) => Some(id),
            other => panic!("row without integer id: {other}"),
        },
        QueryOutput::Row(None) => None,
        other => panic!("expected a single row, got {other:?}"),
    }
}

pub fn scalar(output: &QueryOutput) -> &Value {
    output
        .scalar()
        .unwrap_or_else(|| panic!("expected a scalar, got {output:?}"))
}

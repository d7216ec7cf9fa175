use crate::{
    error::{ExecutionError, Result},
    store::QueryStore,
};
use expression_engine::{
    Bindings, EvalContext, Evaluator, ExpressionError, SubqueryExecutor, test_predicate,
};
use futures::future::try_join_all;
use model::{
    core::{identifiers::EntityType, value::Value},
    query::{Expr, ExprRef, Method, MethodCall, ParameterValues},
    records::row::RowData,
};
use std::collections::HashMap;
use tracing::trace;

/// Rows of every entity a query reads, loaded before evaluation starts.
pub type Snapshot = HashMap<EntityType, Vec<RowData>>;

pub async fn load_snapshot(store: &dyn QueryStore, entities: &[EntityType]) -> Result<Snapshot> {
    let tables = try_join_all(entities.iter().map(|entity| store.rows(entity))).await?;
    Ok(entities.iter().cloned().zip(tables).collect())
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Rows(Vec<RowData>),
    /// Result of `First`/`Last` and their `OrDefault` forms.
    Row(Option<RowData>),
    Scalar(Value),
}

impl QueryOutput {
    pub fn rows(&self) -> Option<&[RowData]> {
        match self {
            QueryOutput::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn into_rows(self) -> Option<Vec<RowData>> {
        match self {
            QueryOutput::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn row(&self) -> Option<&RowData> {
        match self {
            QueryOutput::Row(row) => row.as_ref(),
            _ => None,
        }
    }

    pub fn scalar(&self) -> Option<&Value> {
        match self {
            QueryOutput::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// The output as a single value, for queries nested in predicates.
    pub fn into_value(self) -> Result<Value> {
        match self {
            QueryOutput::Scalar(value) => Ok(value),
            QueryOutput::Row(row) => Ok(row.map_or(Value::Null, |row| row.to_value())),
            QueryOutput::Rows(_) => Err(ExecutionError::UnsupportedOperator(
                "a query producing rows cannot be used as a value".to_string(),
            )),
        }
    }
}

/// Evaluates a rewritten query tree over a snapshot.
pub struct Executor<'a> {
    snapshot: &'a Snapshot,
    parameters: &'a ParameterValues,
}

impl<'a> Executor<'a> {
    pub fn new(snapshot: &'a Snapshot, parameters: &'a ParameterValues) -> Self {
        Self {
            snapshot,
            parameters,
        }
    }

    pub fn execute(&self, tree: &Expr) -> Result<QueryOutput> {
        self.run(tree, &Bindings::new())
    }

    fn run(&self, expr: &Expr, outer: &Bindings) -> Result<QueryOutput> {
        match expr {
            Expr::QueryRoot(entity) => Ok(QueryOutput::Rows(self.table(entity)?.to_vec())),
            Expr::Call(call) => self.run_call(expr, call, outer),
            other => Err(ExecutionError::UnsupportedOperator(other.to_string())),
        }
    }

    fn run_call(&self, expr: &Expr, call: &MethodCall, outer: &Bindings) -> Result<QueryOutput> {
        let Some((source, rest)) = call.args.split_first() else {
            return Err(ExecutionError::UnsupportedOperator(expr.to_string()));
        };
        let argument = rest.first();
        trace!("Executing {}", call.method);

        match &call.method {
            Method::IgnoreQueryFilters => self.run(source, outer),

            Method::IgnoreFilterByName | Method::IgnoreFilterByKind(_) => {
                Err(ExecutionError::UnresolvedMarker(expr.to_string()))
            }

            Method::Where => {
                let predicate = argument
                    .ok_or_else(|| ExecutionError::UnsupportedOperator(expr.to_string()))?;
                let rows = self.sequence(source, outer)?;
                Ok(QueryOutput::Rows(self.filter(rows, predicate, outer)?))
            }

            Method::Any => {
                let rows = self.sequence(source, outer)?;
                let found = match argument {
                    Some(predicate) => self.find(rows, predicate, outer, false)?.is_some(),
                    None => !rows.is_empty(),
                };
                Ok(QueryOutput::Scalar(Value::Boolean(found)))
            }

            Method::First | Method::FirstOrDefault | Method::Last | Method::LastOrDefault => {
                let rows = self.sequence(source, outer)?;
                let from_end = matches!(call.method, Method::Last | Method::LastOrDefault);
                let found = match argument {
                    Some(predicate) => self.find(rows, predicate, outer, from_end)?,
                    None if from_end => rows.into_iter().next_back(),
                    None => rows.into_iter().next(),
                };

                match found {
                    Some(row) => Ok(QueryOutput::Row(Some(row))),
                    None if matches!(call.method, Method::First | Method::Last) => {
                        Err(ExecutionError::EmptySequence(expr.to_string()))
                    }
                    None => Ok(QueryOutput::Row(None)),
                }
            }

            Method::Other(name) => match name.as_str() {
                "Count" => {
                    let rows = self.sequence(source, outer)?;
                    let count = match argument {
                        Some(predicate) => self.filter(rows, predicate, outer)?.len(),
                        None => rows.len(),
                    };
                    Ok(QueryOutput::Scalar(Value::Uint(count as u64)))
                }
                "Take" => {
                    let count = argument
                        .ok_or_else(|| ExecutionError::UnsupportedOperator(expr.to_string()))?;
                    let count = self.scalar(count, outer)?;
                    let count = count.as_usize().ok_or_else(|| ExpressionError::TypeMismatch {
                        expected: "non-negative integer".to_string(),
                        actual: count.type_name().to_string(),
                    })?;

                    let mut rows = self.sequence(source, outer)?;
                    rows.truncate(count);
                    Ok(QueryOutput::Rows(rows))
                }
                _ => Err(ExecutionError::UnsupportedOperator(name.clone())),
            },
        }
    }

    fn table(&self, entity: &EntityType) -> Result<&[RowData]> {
        self.snapshot
            .get(entity)
            .map(Vec::as_slice)
            .ok_or_else(|| ExecutionError::UnknownEntity(entity.clone()))
    }

    fn sequence(&self, expr: &ExprRef, outer: &Bindings) -> Result<Vec<RowData>> {
        self.run(expr, outer)?.into_rows().ok_or_else(|| {
            ExecutionError::UnsupportedOperator(format!("{expr} does not produce rows"))
        })
    }

    fn scalar(&self, expr: &Expr, outer: &Bindings) -> Result<Value> {
        let ctx = EvalContext::row(self.parameters, outer, Some(self));
        Ok(expr.evaluate(&ctx)?)
    }

    fn matches(&self, row: &RowData, predicate: &Expr, outer: &Bindings) -> Result<bool> {
        Ok(test_predicate(
            predicate,
            row.to_value(),
            self.parameters,
            outer,
            Some(self),
        )?)
    }

    fn filter(&self, rows: Vec<RowData>, predicate: &Expr, outer: &Bindings) -> Result<Vec<RowData>> {
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            if self.matches(&row, predicate, outer)? {
                kept.push(row);
            }
        }
        Ok(kept)
    }

    fn find(
        &self,
        rows: Vec<RowData>,
        predicate: &Expr,
        outer: &Bindings,
        from_end: bool,
    ) -> Result<Option<RowData>> {
        if from_end {
            for row in rows.into_iter().rev() {
                if self.matches(&row, predicate, outer)? {
                    return Ok(Some(row));
                }
            }
        } else {
            for row in rows {
                if self.matches(&row, predicate, outer)? {
                    return Ok(Some(row));
                }
            }
        }
        Ok(None)
    }
}

impl SubqueryExecutor for Executor<'_> {
    fn evaluate_subquery(
        &self,
        query: &Expr,
        ctx: &EvalContext,
    ) -> expression_engine::Result<Value> {
        let outer = ctx.bindings().cloned().unwrap_or_default();
        self.run(query, &outer)
            .and_then(QueryOutput::into_value)
            .map_err(|e| ExpressionError::Subquery(Box::new(e)))
    }
}

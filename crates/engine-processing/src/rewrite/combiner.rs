use super::{extractor::ParameterExtractor, replacer::replace_variable};
use crate::error::{Result, RewriteError};
use engine_core::filter::FilterDescriptor;
use model::query::{Expr, ExprRef, Lambda, Variable};

/// Conjoin `filters` into the predicate argument of a query operator,
/// keeping its quoting.
pub fn conjoin_predicate(
    predicate: &ExprRef,
    filters: &[FilterDescriptor],
    extractor: &mut ParameterExtractor,
) -> Result<ExprRef> {
    match predicate.as_ref() {
        Expr::Quote(inner) => Ok(Expr::quote(conjoin_predicate(inner, filters, extractor)?)),
        Expr::Lambda(lambda) => {
            let bound = lambda
                .bound_variable()
                .ok_or_else(|| RewriteError::unsupported(predicate))?;
            let body = conjoin(&lambda.body, bound, filters, extractor)?;
            Ok(Lambda::predicate(bound.clone(), body).into_expr())
        }
        _ => Err(RewriteError::unsupported(predicate)),
    }
}

/// Fold `filters` into `body` in the given order. Tail filters go after
/// the accumulated body, every other placement before it.
pub fn conjoin(
    body: &ExprRef,
    bound: &Variable,
    filters: &[FilterDescriptor],
    extractor: &mut ParameterExtractor,
) -> Result<ExprRef> {
    filters.iter().try_fold(body.clone(), |acc, filter| {
        let part = align(filter, bound, extractor)?;
        Ok(if filter.place().is_tail() {
            Expr::and(acc, part)
        } else {
            Expr::and(part, acc)
        })
    })
}

/// Left-fold `filters` into one predicate over the first filter's variable.
/// `None` when there is nothing to conjoin.
pub fn conjoin_all<'f>(
    filters: impl IntoIterator<Item = &'f FilterDescriptor>,
    extractor: &mut ParameterExtractor,
) -> Result<Option<Lambda>> {
    let mut filters = filters.into_iter();
    let Some(first) = filters.next() else {
        return Ok(None);
    };

    let bound = first.bound_variable().clone();
    let mut body = align(first, &bound, extractor)?;
    for filter in filters {
        body = Expr::and(body, align(filter, &bound, extractor)?);
    }
    Ok(Some(Lambda::predicate(bound, body)))
}

/// The filter's body, parameterized and rebound to `bound`.
fn align(
    filter: &FilterDescriptor,
    bound: &Variable,
    extractor: &mut ParameterExtractor,
) -> Result<ExprRef> {
    let body = extractor.extract(&filter.predicate().body)?;
    Ok(replace_variable(&body, filter.bound_variable(), bound))
}

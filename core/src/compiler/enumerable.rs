use super::{Compiler, is_name};
use crate::api::{Error, EvalError};
use crate::memory::Memory;
use crate::parser::Expr;
use crate::reducer::{
    EntitiesReducer, EvalContext, RespondentReducer, fold, lift3, lift_all, ternary,
};
use crate::resolve::{LambdaAwareContext, ParsingNameContext};
use crate::stdlib::Method;
use crate::values::Numeric;

impl<'a> Compiler<'a> {
    pub(crate) fn enumerable(
        &self,
        names: &mut dyn ParsingNameContext,
        expr: &'a Expr<'a>,
    ) -> Result<EntitiesReducer<Memory>, Error> {
        let depth = self.enter()?;
        let result = self.enumerable_inner(names, expr.ungrouped());
        self.leave(depth);
        result
    }

    fn enumerable_inner(
        &self,
        names: &mut dyn ParsingNameContext,
        expr: &'a Expr<'a>,
    ) -> Result<EntitiesReducer<Memory>, Error> {
        match *expr {
            Expr::List(items) => {
                let mut compiled = Vec::with_capacity(items.len());
                for &item in items {
                    compiled.push(self.numeric(names, item)?);
                }
                Ok(lift_all(compiled, build_list))
            }
            Expr::Comprehension {
                element,
                var,
                iter,
                filter,
                ..
            } => {
                if let Some(bound) = names.bound_variable() {
                    return Err(self.error(
                        expr,
                        format!(
                            "Nested comprehensions are not supported ('{var}' is bound inside the comprehension over '{bound}')"
                        ),
                    ));
                }
                let input = self.enumerable(names, iter)?;
                let mut scope = LambdaAwareContext::new(names, var);
                let element = self.numeric(&mut scope, element)?;
                let filter = match filter {
                    Some(filter) => self.numeric(&mut scope, filter)?,
                    None => EntitiesReducer::Constant(Numeric::TRUE),
                };
                Ok(lift3(input, element, filter, select_where))
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.numeric(names, cond)?;
                let then_branch = self.enumerable(names, then_branch)?;
                let else_branch = self.enumerable(names, else_branch)?;
                Ok(ternary(cond, then_branch, else_branch))
            }
            Expr::Call { callable, args } => match *callable.ungrouped() {
                Expr::Attribute { value, attr } if is_name(value, "response") => {
                    self.response_call(names, expr, attr, args)
                }
                Expr::Attribute { value, attr } if Method::from_name(attr) == Some(Method::Get) => {
                    self.dictionary_get(names, expr, value, args, Self::enumerable, Memory::empty())
                }
                _ => Err(self.error(expr, "Unsupported enumerable expression")),
            },
            Expr::Grouped(inner) => self.enumerable_inner(names, inner),
            _ => Err(self.error(expr, "Unsupported enumerable expression")),
        }
    }
}

fn build_list(items: Vec<RespondentReducer<Numeric>>) -> RespondentReducer<Memory> {
    let constants: Option<Vec<Numeric>> = items
        .iter()
        .map(|item| item.as_constant().copied())
        .collect();
    if let Some(values) = constants {
        return RespondentReducer::Constant(Memory::from_values(values));
    }
    RespondentReducer::func(move |ctx| {
        let out = ctx.pool.rent(items.len())?;
        for (index, item) in items.iter().enumerate() {
            let value = item.evaluate(ctx)?;
            ctx.pool.slice_mut(out)[index] = value;
        }
        Ok(Memory::Pooled(out))
    })
}

/// `[element for arg0 in input if filter]`.
fn select_where(
    input: RespondentReducer<Memory>,
    element: RespondentReducer<Numeric>,
    filter: RespondentReducer<Numeric>,
) -> RespondentReducer<Memory> {
    let constant = input.as_constant().is_some()
        && element.as_constant().is_some()
        && filter.as_constant().is_some();
    let run = move |ctx: &mut EvalContext<'_>| -> Result<Memory, EvalError> {
        let source = input.evaluate(ctx)?;
        let saved = ctx.arg0;
        let result = project(ctx, &source, &element, &filter);
        ctx.arg0 = saved;
        result
    };
    if constant {
        fold(run)
    } else {
        RespondentReducer::func(run)
    }
}

// Pooled input is filtered in place: the write cursor never passes the read cursor.
fn project(
    ctx: &mut EvalContext<'_>,
    source: &Memory,
    element: &RespondentReducer<Numeric>,
    filter: &RespondentReducer<Numeric>,
) -> Result<Memory, EvalError> {
    let out = match source {
        Memory::Pooled(slice) => *slice,
        Memory::Shared(values) => ctx.pool.rent(values.len())?,
    };
    let mut written = 0;
    for index in 0..source.len() {
        let value = source.get(index, ctx.pool);
        ctx.arg0 = value;
        if !filter.evaluate(ctx)?.is_truthy() {
            continue;
        }
        ctx.arg0 = value;
        let projected = element.evaluate(ctx)?;
        ctx.pool.slice_mut(out)[written] = projected;
        written += 1;
    }
    Ok(Memory::Pooled(ctx.pool.shrink(out, written)))
}

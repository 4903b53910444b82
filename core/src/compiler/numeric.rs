use std::sync::Arc;

use super::{Compiler, Shape, is_name, shape};
use crate::api::{Error, EvalError};
use crate::memory::Memory;
use crate::model::{EntityValueCombination, ResponseFieldDescriptor};
use crate::parser::{Argument, BoolOp, ComparisonOp, Expr, Literal, UnaryOp};
use crate::reducer::{
    EntitiesReducer, EvalContext, ReducerValue, RespondentReducer, and, fold, lift1, lift2, lift3,
    map, or, ternary, zip2,
};
use crate::resolve::{ParsingNameContext, Resolved, Usage};
use crate::stdlib::{Builtin, LookupTable, Method, aggregate};
use crate::values::Numeric;

type Aggregate = fn(&[Numeric], Option<Numeric>) -> Result<Numeric, EvalError>;

impl<'a> Compiler<'a> {
    pub(crate) fn numeric(
        &self,
        names: &mut dyn ParsingNameContext,
        expr: &'a Expr<'a>,
    ) -> Result<EntitiesReducer<Numeric>, Error> {
        let depth = self.enter()?;
        let result = self.numeric_inner(names, expr.ungrouped());
        self.leave(depth);
        result
    }

    fn numeric_inner(
        &self,
        names: &mut dyn ParsingNameContext,
        expr: &'a Expr<'a>,
    ) -> Result<EntitiesReducer<Numeric>, Error> {
        match *expr {
            Expr::Literal(literal) => Ok(EntitiesReducer::Constant(match literal {
                Literal::Int(value) => Numeric::new(value),
                Literal::Bool(value) => Numeric::from_bool(value),
                Literal::None => Numeric::NULL,
            })),
            Expr::Ident(name) => Ok(self.identifier(names, expr, name)),
            Expr::Attribute { value, attr } => self.attribute(names, expr, value, attr),
            Expr::Unary { op, expr: operand } => Ok(unary(op, self.numeric(names, operand)?)),
            Expr::Binary { op, left, right } => {
                let left = self.numeric(names, left)?;
                let right = self.numeric(names, right)?;
                Ok(lift2(left, right, move |a, b| {
                    zip2(a, b, move |_, x: Numeric, y| x.binary(op, y))
                }))
            }
            Expr::Boolean { op, left, right } => {
                let left = self.numeric(names, left)?;
                let right = self.numeric(names, right)?;
                Ok(match op {
                    BoolOp::And => and(left, right),
                    BoolOp::Or => or(left, right),
                })
            }
            Expr::Comparison { left, rest } => self.comparison_chain(names, left, rest),
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if shape(expr) == Shape::Enumerable {
                    return Err(self.list_where_number_expected(expr));
                }
                let cond = self.numeric(names, cond)?;
                let then_branch = self.numeric(names, then_branch)?;
                let else_branch = self.numeric(names, else_branch)?;
                Ok(ternary(cond, then_branch, else_branch))
            }
            Expr::Call { callable, args } => self.call(names, expr, callable, args),
            Expr::List(_) | Expr::Comprehension { .. } => {
                Err(self.list_where_number_expected(expr))
            }
            Expr::Dict(_) => Err(self.error(
                expr,
                "Dictionary literals can only be used with '.get', e.g. {1: 10}.get(Field1)",
            )),
            Expr::Grouped(inner) => self.numeric_inner(names, inner),
        }
    }

    fn identifier(
        &self,
        names: &mut dyn ParsingNameContext,
        expr: &'a Expr<'a>,
        name: &str,
    ) -> EntitiesReducer<Numeric> {
        match names.lookup(name, Usage::Value) {
            Resolved::BoundVariable => EntitiesReducer::for_respondent(|ctx| Ok(ctx.arg0)),
            Resolved::Variable(variable) => variable.reducer().clone(),
            Resolved::Field(field) => field_value(field),
            Resolved::Unresolved(message) => self.unresolved(names, expr, message),
        }
    }

    fn attribute(
        &self,
        names: &mut dyn ParsingNameContext,
        expr: &'a Expr<'a>,
        value: &'a Expr<'a>,
        attr: &str,
    ) -> Result<EntitiesReducer<Numeric>, Error> {
        if is_name(value, "result") {
            return Ok(match names.result_entity_type(attr) {
                Ok(entity_type) => EntitiesReducer::for_entities(move |combination| {
                    combination
                        .get(&entity_type)
                        .map(|id| RespondentReducer::Constant(Numeric::new(id)))
                        .ok_or_else(|| combination.mismatch(&entity_type))
                }),
                Err(message) => self.unresolved(names, expr, message),
            });
        }
        if is_name(value, "response") {
            return Err(self.error(
                expr,
                format!(
                    "'response.{attr}' must be called, e.g. response.{attr}() or response.{attr}(brand=1)"
                ),
            ));
        }
        Err(self.error(expr, format!("Unsupported attribute access '.{attr}'")))
    }

    fn comparison_chain(
        &self,
        names: &mut dyn ParsingNameContext,
        left: &'a Expr<'a>,
        rest: &'a [(ComparisonOp, &'a Expr<'a>)],
    ) -> Result<EntitiesReducer<Numeric>, Error> {
        let mut lhs = left;
        let mut chain: Option<EntitiesReducer<Numeric>> = None;
        for &(op, rhs) in rest {
            let comparison = self.comparison(names, lhs, op, rhs)?;
            chain = Some(match chain {
                Some(previous) => and(previous, comparison),
                None => comparison,
            });
            lhs = rhs;
        }
        chain.ok_or_else(|| self.error(left, "Comparison is missing its right-hand side"))
    }

    fn comparison(
        &self,
        names: &mut dyn ParsingNameContext,
        lhs: &'a Expr<'a>,
        op: ComparisonOp,
        rhs: &'a Expr<'a>,
    ) -> Result<EntitiesReducer<Numeric>, Error> {
        let left = self.numeric(names, lhs)?;
        match op {
            ComparisonOp::In | ComparisonOp::NotIn => {
                let negate = op == ComparisonOp::NotIn;
                let list = self.enumerable(names, rhs)?;
                Ok(lift2(left, list, move |value, list| {
                    zip2(value, list, move |ctx, value: Numeric, list: Memory| {
                        let found = aggregate::contains(list.as_slice(ctx.pool), value);
                        Ok(Numeric::from_bool(found != negate))
                    })
                }))
            }
            _ => {
                let right = self.numeric(names, rhs)?;
                Ok(lift2(left, right, move |a, b| {
                    zip2(a, b, move |_, x: Numeric, y| x.compare(op, y).map(Numeric::from_bool))
                }))
            }
        }
    }

    fn call(
        &self,
        names: &mut dyn ParsingNameContext,
        expr: &'a Expr<'a>,
        callable: &'a Expr<'a>,
        args: &'a [Argument<'a>],
    ) -> Result<EntitiesReducer<Numeric>, Error> {
        if shape(expr) == Shape::Enumerable {
            return Err(self.list_where_number_expected(expr));
        }
        match *callable.ungrouped() {
            Expr::Ident(name) => match Builtin::from_name(name) {
                Some(builtin) => self.builtin(names, expr, builtin, args),
                None => Err(self.error(callable, format!("Unknown function '{name}'"))),
            },
            Expr::Attribute { value, attr } => match Method::from_name(attr) {
                Some(Method::Count) => self.count(names, expr, value, args),
                Some(Method::Get) => self.dictionary_get(
                    names,
                    expr,
                    value,
                    args,
                    Self::numeric,
                    Numeric::NULL,
                ),
                None => Err(self.error(callable, format!("Invalid method call '.{attr}()'"))),
            },
            _ => Err(self.error(callable, "Invalid method call")),
        }
    }

    fn builtin(
        &self,
        names: &mut dyn ParsingNameContext,
        expr: &'a Expr<'a>,
        builtin: Builtin,
        args: &'a [Argument<'a>],
    ) -> Result<EntitiesReducer<Numeric>, Error> {
        let positional = self.positional(expr, builtin.name(), args, 1, 1, builtin.keywords())?;
        let list = self.enumerable(names, positional[0])?;
        Ok(match builtin {
            Builtin::Len => lift1(list, |r| {
                map(r, |ctx, list: Memory| aggregate::len(list.as_slice(ctx.pool)))
            }),
            Builtin::Sum => lift1(list, |r| {
                map(r, |ctx, list: Memory| aggregate::sum(list.as_slice(ctx.pool)))
            }),
            Builtin::Any => lift1(list, |r| {
                map(r, |ctx, list: Memory| Ok(aggregate::any(list.as_slice(ctx.pool))))
            }),
            Builtin::Min | Builtin::Max => {
                let extreme: Aggregate = if builtin == Builtin::Min {
                    aggregate::min
                } else {
                    aggregate::max
                };
                match keyword(args, "default") {
                    Some(default) => {
                        let default = self.numeric(names, default)?;
                        lift2(list, default, move |list, default| {
                            zip2(list, default, move |ctx, list: Memory, default| {
                                extreme(list.as_slice(ctx.pool), Some(default))
                            })
                        })
                    }
                    None => lift1(list, move |r| {
                        map(r, move |ctx, list: Memory| extreme(list.as_slice(ctx.pool), None))
                    }),
                }
            }
        })
    }

    fn count(
        &self,
        names: &mut dyn ParsingNameContext,
        expr: &'a Expr<'a>,
        receiver: &'a Expr<'a>,
        args: &'a [Argument<'a>],
    ) -> Result<EntitiesReducer<Numeric>, Error> {
        let positional = self.positional(expr, "count", args, 1, 1, &[])?;
        let list = self.enumerable(names, receiver)?;
        let target = self.numeric(names, positional[0])?;
        Ok(lift2(list, target, |list, target| {
            zip2(list, target, |ctx, list: Memory, target| {
                aggregate::count(list.as_slice(ctx.pool), target)
            })
        }))
    }

    /// `{k: v, ...}.get(key[, default])` for numeric or list values.
    pub(super) fn dictionary_get<T: ReducerValue>(
        &self,
        names: &mut dyn ParsingNameContext,
        expr: &'a Expr<'a>,
        receiver: &'a Expr<'a>,
        args: &'a [Argument<'a>],
        value: fn(
            &Self,
            &mut dyn ParsingNameContext,
            &'a Expr<'a>,
        ) -> Result<EntitiesReducer<T>, Error>,
        missing: T,
    ) -> Result<EntitiesReducer<T>, Error> {
        let Expr::Dict(entries) = *receiver.ungrouped() else {
            return Err(self.error(receiver, "'.get' can only be called on a dictionary literal"));
        };
        let positional = self.positional(expr, "get", args, 1, 2, &[])?;
        let key = self.numeric(names, positional[0])?;
        let default = match positional.get(1) {
            Some(&default) => value(self, names, default)?,
            None => EntitiesReducer::Constant(missing),
        };
        let mut compiled = Vec::with_capacity(entries.len());
        for &(entry_key, entry_value) in entries {
            compiled.push((self.numeric(names, entry_key)?, value(self, names, entry_value)?));
        }
        Ok(lift3(dictionary(compiled), key, default, lookup))
    }

    /// Positional arguments of a call, after checking their count and that
    /// every keyword is one of `keywords`, given at most once.
    fn positional(
        &self,
        expr: &'a Expr<'a>,
        function: &str,
        args: &'a [Argument<'a>],
        min: usize,
        max: usize,
        keywords: &[&str],
    ) -> Result<Vec<&'a Expr<'a>>, Error> {
        let mut positional = Vec::with_capacity(args.len());
        let mut seen: Vec<&str> = Vec::new();
        for arg in args {
            match arg.name {
                None => positional.push(arg.value),
                Some(name) if !keywords.contains(&name) => {
                    return Err(self.error(
                        arg.value,
                        format!("{function}() got an unexpected keyword argument '{name}'"),
                    ));
                }
                Some(name) if seen.contains(&name) => {
                    return Err(self.error(
                        arg.value,
                        format!("{function}() got multiple values for argument '{name}'"),
                    ));
                }
                Some(name) => seen.push(name),
            }
        }
        let given = positional.len();
        if given < min || given > max {
            let expected = if min == max {
                format!("exactly {min}")
            } else {
                format!("from {min} to {max}")
            };
            let plural = if max == 1 { "" } else { "s" };
            return Err(self.error(
                expr,
                format!(
                    "{function}() takes {expected} positional argument{plural} ({given} given)"
                ),
            ));
        }
        Ok(positional)
    }
}

fn keyword<'a>(args: &'a [Argument<'a>], name: &str) -> Option<&'a Expr<'a>> {
    args.iter()
        .find(|arg| arg.name == Some(name))
        .map(|arg| arg.value)
}

fn unary(op: UnaryOp, operand: EntitiesReducer<Numeric>) -> EntitiesReducer<Numeric> {
    lift1(operand, move |r| {
        map(r, move |_, value: Numeric| match op {
            UnaryOp::Neg => value.negate(),
            UnaryOp::Pos => value.positive(),
            UnaryOp::Invert => value.invert(),
            UnaryOp::Not => Ok(Numeric::from_bool(!value.is_truthy())),
        })
    })
}

/// Reads a field at the context's values for the field's own entity types.
fn field_value(field: Arc<ResponseFieldDescriptor>) -> EntitiesReducer<Numeric> {
    if field.entity_types().is_empty() {
        let key = EntityValueCombination::empty();
        return EntitiesReducer::for_respondent(move |ctx| {
            Ok(ctx.profile.field_value(&field, &key))
        });
    }
    EntitiesReducer::for_entities(move |combination| {
        let key = combination.restrict_to(field.entity_types())?;
        let field = field.clone();
        Ok(RespondentReducer::func(move |ctx| {
            Ok(ctx.profile.field_value(&field, &key))
        }))
    })
}

fn dictionary<T: ReducerValue>(
    entries: Vec<(EntitiesReducer<Numeric>, EntitiesReducer<T>)>,
) -> EntitiesReducer<LookupTable<T>> {
    let context_free: Option<Vec<_>> = entries
        .iter()
        .map(|(key, value)| Some((key.context_free()?, value.context_free()?)))
        .collect();
    match context_free {
        Some(pairs) => EntitiesReducer::Constant(LookupTable::from_entries(pairs)),
        None => EntitiesReducer::for_entities(move |combination| {
            let pairs = entries
                .iter()
                .map(|(key, value)| {
                    Ok((key.for_context(combination)?, value.for_context(combination)?))
                })
                .collect::<Result<Vec<_>, EvalError>>()?;
            Ok(RespondentReducer::Constant(LookupTable::from_entries(pairs)))
        }),
    }
}

// A table with pending entries reads respondent data, so only frozen tables fold.
fn lookup<T: ReducerValue>(
    table: RespondentReducer<LookupTable<T>>,
    key: RespondentReducer<Numeric>,
    default: RespondentReducer<T>,
) -> RespondentReducer<T> {
    let foldable = matches!(table.as_constant(), Some(table) if table.is_frozen())
        && key.as_constant().is_some()
        && default.as_constant().is_some();
    let get = move |ctx: &mut EvalContext<'_>| -> Result<T, EvalError> {
        let table = table.evaluate(ctx)?;
        let key = key.evaluate(ctx)?;
        match table.get(ctx, key)? {
            Some(value) => Ok(value),
            None => default.evaluate(ctx),
        }
    };
    if foldable {
        fold(get)
    } else {
        RespondentReducer::func(get)
    }
}

//! Dictionary literals, used as the receiver of `.get(key[, default])`.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::api::EvalError;
use crate::reducer::{EvalContext, ReducerValue, RespondentReducer};
use crate::values::Numeric;

/// A dictionary literal after specialization for one context.
///
/// When every key and value is known without a respondent the entries are
/// frozen into a hash map once. Otherwise entries are evaluated lazily per
/// lookup. Duplicate keys resolve to the last entry in both forms.
#[derive(Clone)]
pub enum LookupTable<T> {
    Frozen(Arc<HashMap<Numeric, T>>),
    Pending(Arc<[(RespondentReducer<Numeric>, RespondentReducer<T>)]>),
}

impl<T: ReducerValue> ReducerValue for LookupTable<T> {}

impl<T: ReducerValue> LookupTable<T> {
    pub fn from_entries(entries: Vec<(RespondentReducer<Numeric>, RespondentReducer<T>)>) -> Self {
        let constants: Option<Vec<(Numeric, T)>> = entries
            .iter()
            .map(|(key, value)| Some((*key.as_constant()?, value.as_constant()?.clone())))
            .collect();
        match constants {
            Some(pairs) => LookupTable::Frozen(Arc::new(pairs.into_iter().collect())),
            None => LookupTable::Pending(entries.into()),
        }
    }

    pub fn get(&self, ctx: &mut EvalContext<'_>, key: Numeric) -> Result<Option<T>, EvalError> {
        match self {
            LookupTable::Frozen(map) => Ok(map.get(&key).cloned()),
            LookupTable::Pending(entries) => {
                for (entry_key, value) in entries.iter().rev() {
                    if entry_key.evaluate(ctx)? == key {
                        return value.evaluate(ctx).map(Some);
                    }
                }
                Ok(None)
            }
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, LookupTable::Frozen(_))
    }
}

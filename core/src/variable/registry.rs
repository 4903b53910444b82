use std::sync::Arc;

use hashbrown::HashMap;

use crate::model::ResponseFieldDescriptor;
use crate::values::Numeric;
use crate::variable::CompiledVariable;

/// Something an expression can refer to by name.
#[derive(Debug, Clone)]
pub enum DeclaredItem {
    Variable(Arc<CompiledVariable<Numeric>>),
    Field(Arc<ResponseFieldDescriptor>),
}

/// Declared variables and fields, looked up case-insensitively.
#[derive(Debug, Default)]
pub struct Registry {
    items: HashMap<String, DeclaredItem>,
}

impl Registry {
    pub fn get(&self, name: &str) -> Option<&DeclaredItem> {
        self.items.get(&name.to_lowercase())
    }

    /// Adds or replaces `name`, returning what it replaced.
    pub fn insert(&mut self, name: &str, item: DeclaredItem) -> Option<DeclaredItem> {
        self.items.insert(name.to_lowercase(), item)
    }

    pub fn remove(&mut self, name: &str) -> Option<DeclaredItem> {
        self.items.remove(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Arc<CompiledVariable<Numeric>>> {
        self.items.values().filter_map(|item| match item {
            DeclaredItem::Variable(variable) => Some(variable),
            DeclaredItem::Field(_) => None,
        })
    }
}

//! Name resolution.
//!
//! The compiler asks a [`ParsingNameContext`] what each identifier means.
//! [`RespondentNameContext`] answers from the declared-item registry and
//! records what the expression depends on; [`LambdaAwareContext`] layers a
//! comprehension variable on top of it.

use std::sync::Arc;

use crate::api::Diagnostic;
use crate::model::{EntityRepository, EntityType, ResponseFieldDescriptor};
use crate::values::Numeric;
use crate::variable::{CompiledVariable, DeclaredItem, Registry};

/// How an identifier is being used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    /// A bare identifier evaluated in the current context. Its entity types
    /// become part of the expression's signature.
    Value,
    /// The `X` in `response.X(...)`. Omitted entity types are expanded, so
    /// they do not constrain the context.
    ResponseSource,
}

pub enum Resolved {
    /// The comprehension variable currently in scope.
    BoundVariable,
    Variable(Arc<CompiledVariable<Numeric>>),
    Field(Arc<ResponseFieldDescriptor>),
    /// Nothing by that name; carries the message for the author.
    Unresolved(String),
}

pub trait ParsingNameContext {
    fn lookup(&mut self, name: &str, usage: Usage) -> Resolved;

    /// Resolves the `X` of `result.X` and records it as explicitly referenced.
    fn result_entity_type(&mut self, name: &str) -> Result<EntityType, String>;

    fn repository(&self) -> &dyn EntityRepository;

    /// Name of the comprehension variable in scope, if any.
    fn bound_variable(&self) -> Option<&str>;

    /// Records an unresolved reference. Compilation continues so that every
    /// missing name can be reported at once.
    fn report_unresolved(&mut self, diagnostic: Diagnostic);
}

/// Everything a compiled expression depends on.
#[derive(Debug, Default, Clone)]
pub struct Dependencies {
    pub fields: Vec<Arc<ResponseFieldDescriptor>>,
    /// Identifiers of referenced variables, transitively.
    pub variable_dependencies: Vec<String>,
    /// Entity types the result is computed over, sorted.
    pub entity_types: Vec<EntityType>,
    /// Entity types referenced through `result.X`, sorted.
    pub result_entity_types: Vec<EntityType>,
    pub unresolved: Vec<Diagnostic>,
}

impl Dependencies {
    fn add_field(&mut self, field: &Arc<ResponseFieldDescriptor>) {
        if !self.fields.iter().any(|f| f.name() == field.name()) {
            self.fields.push(field.clone());
        }
    }

    fn add_variable(&mut self, identifier: &str) {
        if !self
            .variable_dependencies
            .iter()
            .any(|v| v.eq_ignore_ascii_case(identifier))
        {
            self.variable_dependencies.push(identifier.to_string());
        }
    }

    fn add_entity_types<'t>(&mut self, entity_types: impl IntoIterator<Item = &'t EntityType>) {
        for entity_type in entity_types {
            insert_sorted(&mut self.entity_types, entity_type);
        }
    }
}

fn insert_sorted(entity_types: &mut Vec<EntityType>, entity_type: &EntityType) {
    if let Err(index) = entity_types.binary_search(entity_type) {
        entity_types.insert(index, entity_type.clone());
    }
}

/// Resolves names against the declared-item registry.
pub struct RespondentNameContext<'r> {
    registry: &'r Registry,
    repository: &'r dyn EntityRepository,
    dependencies: Dependencies,
}

impl<'r> RespondentNameContext<'r> {
    pub fn new(registry: &'r Registry, repository: &'r dyn EntityRepository) -> Self {
        Self {
            registry,
            repository,
            dependencies: Dependencies::default(),
        }
    }

    pub fn into_dependencies(self) -> Dependencies {
        self.dependencies
    }
}

impl ParsingNameContext for RespondentNameContext<'_> {
    fn lookup(&mut self, name: &str, usage: Usage) -> Resolved {
        match self.registry.get(name) {
            Some(DeclaredItem::Variable(variable)) => {
                let deps = &mut self.dependencies;
                deps.add_variable(variable.identifier());
                for identifier in variable.variable_dependencies() {
                    deps.add_variable(identifier);
                }
                for field in variable.fields() {
                    deps.add_field(field);
                }
                if usage == Usage::Value {
                    deps.add_entity_types(variable.entity_types());
                }
                Resolved::Variable(variable.clone())
            }
            Some(DeclaredItem::Field(field)) => {
                self.dependencies.add_field(field);
                if usage == Usage::Value {
                    self.dependencies.add_entity_types(field.entity_types());
                }
                Resolved::Field(field.clone())
            }
            None => Resolved::Unresolved(match usage {
                Usage::Value => format!("Unknown identifier '{}'", name),
                Usage::ResponseSource => format!("Unknown response field 'response.{}'", name),
            }),
        }
    }

    fn result_entity_type(&mut self, name: &str) -> Result<EntityType, String> {
        let entity_type = self
            .repository
            .entity_type(name)
            .ok_or_else(|| format!("Unknown entity type 'result.{}'", name))?;
        insert_sorted(&mut self.dependencies.result_entity_types, &entity_type);
        insert_sorted(&mut self.dependencies.entity_types, &entity_type);
        Ok(entity_type)
    }

    fn repository(&self) -> &dyn EntityRepository {
        self.repository
    }

    fn bound_variable(&self) -> Option<&str> {
        None
    }

    fn report_unresolved(&mut self, diagnostic: Diagnostic) {
        let unresolved = &mut self.dependencies.unresolved;
        if !unresolved.iter().any(|d| d.message == diagnostic.message) {
            unresolved.push(diagnostic);
        }
    }
}

/// Scope of one comprehension variable.
pub struct LambdaAwareContext<'p> {
    inner: &'p mut dyn ParsingNameContext,
    bound: &'p str,
}

impl<'p> LambdaAwareContext<'p> {
    pub fn new(inner: &'p mut dyn ParsingNameContext, bound: &'p str) -> Self {
        Self { inner, bound }
    }
}

impl ParsingNameContext for LambdaAwareContext<'_> {
    fn lookup(&mut self, name: &str, usage: Usage) -> Resolved {
        if name == self.bound {
            Resolved::BoundVariable
        } else {
            self.inner.lookup(name, usage)
        }
    }

    fn result_entity_type(&mut self, name: &str) -> Result<EntityType, String> {
        self.inner.result_entity_type(name)
    }

    fn repository(&self) -> &dyn EntityRepository {
        self.inner.repository()
    }

    fn bound_variable(&self) -> Option<&str> {
        Some(self.bound)
    }

    fn report_unresolved(&mut self, diagnostic: Diagnostic) {
        self.inner.report_unresolved(diagnostic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InMemoryEntityRepository;
    use crate::parser::Span;
    use pretty_assertions::assert_eq;

    fn setup() -> (Registry, InMemoryEntityRepository) {
        let repository = InMemoryEntityRepository::new()
            .with_entity_type("Brand", [1, 2])
            .with_entity_type("Product", [5, 6]);
        let mut registry = Registry::default();
        let brand = repository.entity_type("Brand").unwrap();
        let product = repository.entity_type("Product").unwrap();
        registry.insert(
            "Consider",
            DeclaredItem::Field(Arc::new(ResponseFieldDescriptor::new(
                "Consider",
                [product, brand],
            ))),
        );
        registry.insert(
            "Age",
            DeclaredItem::Field(Arc::new(ResponseFieldDescriptor::new("Age", []))),
        );
        (registry, repository)
    }

    fn names(entity_types: &[EntityType]) -> Vec<&str> {
        entity_types.iter().map(EntityType::identifier).collect()
    }

    #[test]
    fn value_lookups_extend_the_signature() {
        let (registry, repository) = setup();
        let mut context = RespondentNameContext::new(&registry, &repository);
        assert!(matches!(context.lookup("consider", Usage::Value), Resolved::Field(_)));
        assert!(matches!(context.lookup("AGE", Usage::Value), Resolved::Field(_)));
        let deps = context.into_dependencies();
        assert_eq!(names(&deps.entity_types), vec!["Brand", "Product"]);
        assert_eq!(deps.fields.len(), 2);
        assert!(deps.result_entity_types.is_empty());
    }

    #[test]
    fn response_sources_do_not_extend_the_signature() {
        let (registry, repository) = setup();
        let mut context = RespondentNameContext::new(&registry, &repository);
        assert!(matches!(
            context.lookup("Consider", Usage::ResponseSource),
            Resolved::Field(_)
        ));
        let deps = context.into_dependencies();
        assert!(deps.entity_types.is_empty());
        assert_eq!(deps.fields.len(), 1);
    }

    #[test]
    fn result_entity_types_are_explicit() {
        let (registry, repository) = setup();
        let mut context = RespondentNameContext::new(&registry, &repository);
        let brand = context.result_entity_type("bRAND").unwrap();
        assert_eq!(brand.identifier(), "Brand");
        assert_eq!(
            context.result_entity_type("Region").unwrap_err(),
            "Unknown entity type 'result.Region'"
        );
        let deps = context.into_dependencies();
        assert_eq!(names(&deps.result_entity_types), vec!["Brand"]);
        assert_eq!(names(&deps.entity_types), vec!["Brand"]);
    }

    #[test]
    fn unresolved_references_are_deduplicated() {
        let (registry, repository) = setup();
        let mut context = RespondentNameContext::new(&registry, &repository);
        let Resolved::Unresolved(message) = context.lookup("nope", Usage::Value) else {
            panic!("expected unresolved");
        };
        assert_eq!(message, "Unknown identifier 'nope'");
        context.report_unresolved(Diagnostic::error(&message, Span::new(0, 4), "E002"));
        context.report_unresolved(Diagnostic::error(&message, Span::new(7, 11), "E002"));
        assert_eq!(context.into_dependencies().unresolved.len(), 1);
    }

    #[test]
    fn lambda_scope_shadows_one_name() {
        let (registry, repository) = setup();
        let mut outer = RespondentNameContext::new(&registry, &repository);
        let mut scope = LambdaAwareContext::new(&mut outer, "Age");
        assert_eq!(scope.bound_variable(), Some("Age"));
        assert!(matches!(scope.lookup("Age", Usage::Value), Resolved::BoundVariable));
        assert!(matches!(scope.lookup("age", Usage::Value), Resolved::Field(_)));
        assert!(outer.bound_variable().is_none());
    }
}

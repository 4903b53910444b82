//! The fieldexpr compilation engine.

use std::sync::Arc;

use bumpalo::Bump;
use tracing::debug;

use super::{CompileOptions, CompileOptionsOverride, EngineOptions, Error};
use crate::model::{EntityRepository, EntityType, ResponseFieldDescriptor};
use crate::resolve::RespondentNameContext;
use crate::values::Numeric;
use crate::variable::{CompiledVariable, DeclaredItem, Registry};
use crate::{compiler, parser};

const FILTER_CONTEXT: &str = "filter expression";
const METRIC_CONTEXT: &str = "metric variable expression";

/// Compiles expressions against a registry of declared fields and variables.
///
/// The engine owns the registry. Compiling takes `&self`; declaring and
/// deleting take `&mut self`. Compiled variables hold shared handles to what
/// they reference, so they stay valid after the registry changes.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use fieldexpr_core::api::{Engine, EngineOptions};
/// use fieldexpr_core::model::{
///     EntityValue, EntityValueCombination, InMemoryEntityRepository, InMemoryProfile,
///     ResponseFieldDescriptor,
/// };
///
/// let mut repository = InMemoryEntityRepository::new();
/// let brand = repository.add_entity_type("Brand", [1, 2]);
/// let mut engine = Engine::new(EngineOptions::default(), Arc::new(repository));
/// let aware = engine.declare_field(ResponseFieldDescriptor::new("Aware", [brand.clone()]));
///
/// let filter = engine.parse_boolean("Aware == 1").unwrap();
/// let context = EntityValueCombination::new([EntityValue::new(brand, 2)]).unwrap();
/// let profile = InMemoryProfile::new(7).with_answer(&aware, context.clone(), 1);
///
/// let mut evaluator = filter.specialize_for_context(&context).unwrap();
/// assert!(evaluator.evaluate(&profile).unwrap());
/// ```
pub struct Engine {
    options: EngineOptions,
    repository: Arc<dyn EntityRepository>,
    registry: Registry,
}

impl Engine {
    pub fn new(options: EngineOptions, repository: Arc<dyn EntityRepository>) -> Self {
        Self {
            options,
            repository,
            registry: Registry::default(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn repository(&self) -> &Arc<dyn EntityRepository> {
        &self.repository
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Compiles a filter. A blank expression matches everyone.
    pub fn parse_boolean(&self, expression: &str) -> Result<CompiledVariable<bool>, Error> {
        self.compile_boolean(CompileOptionsOverride::default(), expression)
    }

    pub fn compile_boolean(
        &self,
        options_override: CompileOptionsOverride,
        expression: &str,
    ) -> Result<CompiledVariable<bool>, Error> {
        if expression.trim().is_empty() {
            return Ok(CompiledVariable::constant(
                "",
                true,
                self.repository.clone(),
                self.options.default_run_options.clone(),
            ));
        }
        let options = self.compile_options(&options_override);
        let variable = self.compile_variable("", expression, FILTER_CONTEXT, &options)?;
        Ok(variable.into_boolean())
    }

    /// Compiles a metric. A blank expression yields `None`.
    pub fn parse_numeric_or_null(
        &self,
        expression: &str,
    ) -> Result<Option<CompiledVariable<Numeric>>, Error> {
        self.compile_numeric_or_null(CompileOptionsOverride::default(), expression)
    }

    pub fn compile_numeric_or_null(
        &self,
        options_override: CompileOptionsOverride,
        expression: &str,
    ) -> Result<Option<CompiledVariable<Numeric>>, Error> {
        if expression.trim().is_empty() {
            return Ok(None);
        }
        let options = self.compile_options(&options_override);
        self.compile_variable("", expression, METRIC_CONTEXT, &options)
            .map(Some)
    }

    /// Declares `identifier` as `definition`, replacing any previous
    /// declaration of that name. A blank definition declares a variable that
    /// is always null.
    ///
    /// Variables compiled against the previous declaration keep it; they are
    /// not recompiled.
    pub fn declare_or_update(
        &mut self,
        identifier: &str,
        definition: &str,
    ) -> Result<Arc<CompiledVariable<Numeric>>, Error> {
        let variable = if definition.trim().is_empty() {
            CompiledVariable::constant(
                identifier,
                Numeric::NULL,
                self.repository.clone(),
                self.options.default_run_options.clone(),
            )
        } else {
            let context = format!("variable '{}'", identifier);
            let options = self.options.default_compile_options.clone();
            let variable = self.compile_variable(identifier, definition, &context, &options)?;
            if variable.depends_on(identifier) {
                return Err(Error::CyclicDependency {
                    identifier: identifier.to_string(),
                    cycle: self.cycle(identifier, &variable),
                });
            }
            variable
        };
        let variable = Arc::new(variable);
        let replaced = self
            .registry
            .insert(identifier, DeclaredItem::Variable(variable.clone()));
        debug!(
            identifier,
            replaced = replaced.is_some(),
            entity_types = variable.entity_types().len(),
            "Declared variable"
        );
        Ok(variable)
    }

    /// Makes a raw response field referenceable by name.
    pub fn declare_field(
        &mut self,
        descriptor: ResponseFieldDescriptor,
    ) -> Arc<ResponseFieldDescriptor> {
        let field = Arc::new(descriptor);
        self.registry
            .insert(field.name(), DeclaredItem::Field(field.clone()));
        debug!(field = field.name(), "Declared field");
        field
    }

    /// Removes a declared variable or field. Returns whether it existed.
    pub fn delete(&mut self, identifier: &str) -> bool {
        let removed = self.registry.remove(identifier).is_some();
        debug!(identifier, removed, "Deleted declaration");
        removed
    }

    pub fn get_declared(&self, identifier: &str) -> Option<Arc<CompiledVariable<Numeric>>> {
        match self.registry.get(identifier)? {
            DeclaredItem::Variable(variable) => Some(variable.clone()),
            DeclaredItem::Field(_) => None,
        }
    }

    /// A declared variable read as a filter.
    pub fn get_declared_boolean(&self, identifier: &str) -> Option<CompiledVariable<bool>> {
        self.get_declared(identifier)
            .map(|variable| (*variable).clone().into_boolean())
    }

    /// Each declared variable with the entity types it outputs over, in no
    /// particular order. Fields are not included.
    pub fn declared_variables(&self) -> impl Iterator<Item = (&str, &[EntityType])> {
        self.registry
            .variables()
            .map(|variable| (variable.identifier(), variable.result_entity_types()))
    }

    /// Names of the entity types `expression` references as `result.X`.
    pub fn parse_result_entity_type_names(&self, expression: &str) -> Result<Vec<String>, Error> {
        let options = self.options.default_compile_options.clone();
        let variable = self.compile_variable("", expression, METRIC_CONTEXT, &options)?;
        Ok(variable
            .result_entity_types()
            .iter()
            .map(|entity_type| entity_type.identifier().to_string())
            .collect())
    }

    fn compile_options(&self, options_override: &CompileOptionsOverride) -> CompileOptions {
        let mut options = self.options.default_compile_options.clone();
        options.override_with(options_override);
        options
    }

    fn compile_variable(
        &self,
        identifier: &str,
        expression: &str,
        context: &str,
        options: &CompileOptions,
    ) -> Result<CompiledVariable<Numeric>, Error> {
        let arena = Bump::new();
        let parsed = parser::parse_with_limits(&arena, expression, &options.parse_limits())?;
        let mut names = RespondentNameContext::new(&self.registry, self.repository.as_ref());
        let reducer = compiler::compile(parsed, &mut names, options)?;
        let dependencies = names.into_dependencies();

        if !dependencies.unresolved.is_empty() && !options.allow_unresolved {
            return Err(Error::UnresolvedReferences {
                context: context.to_string(),
                expression: expression.to_string(),
                references: dependencies.unresolved,
            });
        }

        debug!(
            expression,
            fields = dependencies.fields.len(),
            variables = dependencies.variable_dependencies.len(),
            entity_types = dependencies.entity_types.len(),
            constant = reducer.as_constant().is_some(),
            "Compiled expression"
        );
        Ok(CompiledVariable::new(
            identifier,
            expression,
            reducer,
            dependencies,
            self.repository.clone(),
            self.options.default_run_options.clone(),
        ))
    }

    /// A path `identifier -> ... -> identifier` through declared variables.
    fn cycle(&self, identifier: &str, variable: &CompiledVariable<Numeric>) -> Vec<String> {
        let through = variable
            .variable_dependencies()
            .iter()
            .filter(|dependency| !dependency.eq_ignore_ascii_case(identifier))
            .find(|dependency| {
                self.get_declared(dependency)
                    .is_some_and(|declared| declared.depends_on(identifier))
            });
        let mut cycle = vec![identifier.to_string()];
        cycle.extend(through.cloned());
        cycle.push(identifier.to_string());
        cycle
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

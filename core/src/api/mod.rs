//! Public API for compiling and evaluating survey field expressions.
//!
//! Everything goes through an [`Engine`]: declare response fields and
//! variables on it, then compile filters and metrics against what has been
//! declared. Compilation happens once; the resulting
//! [`CompiledVariable`](crate::variable::CompiledVariable) is specialized per
//! entity context and evaluated per respondent.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use fieldexpr_core::api::{Engine, EngineOptions};
//! use fieldexpr_core::model::{
//!     EntityRepository, EntityValueCombination, InMemoryEntityRepository, InMemoryProfile,
//!     ResponseFieldDescriptor,
//! };
//!
//! let repository = InMemoryEntityRepository::new().with_entity_type("Brand", [1, 2, 3]);
//! let brand = repository.entity_type("Brand").unwrap();
//! let mut engine = Engine::new(EngineOptions::default(), Arc::new(repository));
//! engine.declare_field(ResponseFieldDescriptor::new("Aware", [brand.clone()]));
//! engine.declare_or_update("AwareCount", "len(response.Aware())").unwrap();
//!
//! let metric = engine
//!     .parse_numeric_or_null("AwareCount * 10")
//!     .unwrap()
//!     .unwrap();
//! let mut evaluator = metric
//!     .specialize_for_context(&EntityValueCombination::empty())
//!     .unwrap();
//! assert_eq!(evaluator.evaluate(&InMemoryProfile::new(1)).unwrap().value(), Some(0));
//! ```

pub mod engine;
pub mod error;
pub mod options;

pub use engine::Engine;
pub use error::{Diagnostic, Error, EvalError, RelatedInfo, Severity};
pub use options::{
    CompileOptions, CompileOptionsOverride, EngineOptions, RunOptions, RunOptionsOverride,
};

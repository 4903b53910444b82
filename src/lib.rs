//! fieldexpr - filters and metrics over survey responses
//!
//! # Overview
//!
//! Analysts write short Python-like expressions over respondents' answers:
//! filters such as `Age >= 18 and Aware == 1` and metrics such as
//! `sum(response.Rating(brand=result.brand))`. Expressions are compiled once,
//! specialized per entity context (for example `Brand=3`), and then evaluated
//! for every respondent.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use fieldexpr::{
//!     Engine, EngineOptions, EntityValue, EntityValueCombination, InMemoryEntityRepository,
//!     InMemoryProfile, ResponseFieldDescriptor,
//! };
//!
//! let mut repository = InMemoryEntityRepository::new();
//! let brand = repository.add_entity_type("Brand", [1, 2, 3]);
//! let mut engine = Engine::new(EngineOptions::default(), Arc::new(repository));
//! let rating = engine.declare_field(ResponseFieldDescriptor::new("Rating", [brand.clone()]));
//!
//! let metric = engine
//!     .parse_numeric_or_null("sum(response.Rating()) * 10 + result.brand")
//!     .unwrap()
//!     .unwrap();
//!
//! let at = |id| EntityValueCombination::new([EntityValue::new(brand.clone(), id)]).unwrap();
//! let respondent = InMemoryProfile::new(1)
//!     .with_answer(&rating, at(1), 4)
//!     .with_answer(&rating, at(3), 2);
//!
//! let mut evaluator = metric.specialize_for_context(&at(2)).unwrap();
//! assert_eq!(evaluator.evaluate(&respondent).unwrap().value(), Some(62));
//! ```
//!
//! # Errors
//!
//! Compile errors carry the expression text; [`render_error_to`] turns them
//! into annotated snippets.

pub mod error_renderer;
pub use error_renderer::{CharSet, RenderConfig, render_error, render_error_to};

pub use fieldexpr_core::api::{
    CompileOptions, CompileOptionsOverride, Diagnostic, Engine, EngineOptions, Error, EvalError,
    RelatedInfo, RunOptions, RunOptionsOverride, Severity,
};
pub use fieldexpr_core::model::{
    EmptyProfile, EntityRepository, EntityType, EntityValue, EntityValueCombination,
    InMemoryEntityRepository, InMemoryProfile, Profile, ResponseFieldDescriptor,
};
pub use fieldexpr_core::values::Numeric;
pub use fieldexpr_core::variable::{CompiledVariable, ContextEvaluator, SingleDimensionMatcher};

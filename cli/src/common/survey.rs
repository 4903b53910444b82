//! Survey definitions loaded from JSON.
//!
//! A survey file declares the entity types, the response fields, any derived
//! variables and the respondents' answers:
//!
//! ```json
//! {
//!   "entity_types": { "Brand": [1, 2, 3] },
//!   "fields": [{ "name": "Aware", "entity_types": ["Brand"] }],
//!   "variables": [{ "name": "AwareCount", "expression": "len(response.Aware())" }],
//!   "respondents": [
//!     { "id": 1, "answers": [{ "field": "Aware", "context": { "Brand": 2 }, "value": 1 }] }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use fieldexpr::{
    Engine, EngineOptions, EntityRepository, EntityType, EntityValue, EntityValueCombination,
    InMemoryEntityRepository, InMemoryProfile, ResponseFieldDescriptor,
};
use serde::Deserialize;
use tracing::debug;

use super::error::{CliError, CliResult};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Survey {
    pub entity_types: BTreeMap<String, Vec<i32>>,
    pub fields: Vec<FieldDef>,
    pub variables: Vec<VariableDef>,
    pub respondents: Vec<RespondentDef>,
    pub options: EngineOptions,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    pub name: String,
    #[serde(default)]
    pub entity_types: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableDef {
    pub name: String,
    pub expression: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RespondentDef {
    pub id: i64,
    #[serde(default)]
    pub answers: Vec<AnswerDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnswerDef {
    pub field: String,
    #[serde(default)]
    pub context: BTreeMap<String, i32>,
    pub value: i32,
}

/// An engine with the survey's declarations plus its respondents.
pub struct LoadedSurvey {
    pub engine: Engine,
    pub respondents: Vec<InMemoryProfile>,
}

impl Survey {
    /// Reads a survey file, or an empty survey when no path is given.
    pub fn read(path: Option<&Path>) -> CliResult<Survey> {
        let Some(path) = path else {
            return Ok(Survey::default());
        };
        let text = std::fs::read_to_string(path).map_err(|e| {
            CliError::survey(format!("could not read '{}': {}", path.display(), e))
        })?;
        Survey::parse(&text)
            .map_err(|e| CliError::survey(format!("invalid survey '{}': {}", path.display(), e)))
    }

    pub fn parse(text: &str) -> Result<Survey, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Declares everything in the survey on a fresh engine.
    pub fn load(self) -> CliResult<LoadedSurvey> {
        let mut repository = InMemoryEntityRepository::new();
        for (name, ids) in &self.entity_types {
            repository.add_entity_type(name, ids.iter().copied());
        }
        let repository: Arc<dyn EntityRepository> = Arc::new(repository);
        let mut engine = Engine::new(self.options, repository.clone());

        let mut fields = BTreeMap::new();
        for field in self.fields {
            let entity_types = field
                .entity_types
                .iter()
                .map(|name| lookup_entity_type(repository.as_ref(), name))
                .collect::<CliResult<Vec<_>>>()?;
            let descriptor = engine.declare_field(ResponseFieldDescriptor::new(
                field.name.clone(),
                entity_types,
            ));
            fields.insert(field.name.to_lowercase(), descriptor);
        }

        for variable in self.variables {
            engine
                .declare_or_update(&variable.name, &variable.expression)
                .map_err(|error| CliError::expression(variable.name.clone(), error))?;
        }

        let mut respondents = Vec::with_capacity(self.respondents.len());
        for respondent in self.respondents {
            let mut profile = InMemoryProfile::new(respondent.id);
            for answer in respondent.answers {
                let field = fields.get(&answer.field.to_lowercase()).ok_or_else(|| {
                    CliError::survey(format!(
                        "respondent {} answers unknown field '{}'",
                        respondent.id, answer.field
                    ))
                })?;
                let combination = combination(
                    repository.as_ref(),
                    answer.context.iter().map(|(name, id)| (name.as_str(), *id)),
                )?;
                profile.set_answer(field.name(), combination, answer.value);
            }
            respondents.push(profile);
        }

        debug!(
            entity_types = self.entity_types.len(),
            fields = fields.len(),
            respondents = respondents.len(),
            "Loaded survey"
        );
        Ok(LoadedSurvey {
            engine,
            respondents,
        })
    }
}

fn lookup_entity_type(repository: &dyn EntityRepository, name: &str) -> CliResult<EntityType> {
    repository
        .entity_type(name)
        .ok_or_else(|| CliError::survey(format!("unknown entity type '{}'", name)))
}

/// Builds a combination from `(entity type name, id)` pairs.
pub fn combination<'a>(
    repository: &dyn EntityRepository,
    pairs: impl IntoIterator<Item = (&'a str, i32)>,
) -> CliResult<EntityValueCombination> {
    let values = pairs
        .into_iter()
        .map(|(name, id)| Ok(EntityValue::new(lookup_entity_type(repository, name)?, id)))
        .collect::<CliResult<Vec<_>>>()?;
    Ok(EntityValueCombination::new(values)?)
}

/// Parses `Brand=3` style context arguments.
pub fn parse_context(
    repository: &dyn EntityRepository,
    args: &[String],
) -> CliResult<EntityValueCombination> {
    let pairs = args
        .iter()
        .filter(|arg| !arg.trim().is_empty())
        .map(|arg| {
            let (name, id) = arg
                .split_once('=')
                .ok_or_else(|| CliError::survey(format!("expected NAME=ID, got '{}'", arg)))?;
            let id = id
                .trim()
                .parse::<i32>()
                .map_err(|_| CliError::survey(format!("invalid instance id in '{}'", arg)))?;
            Ok((name.trim(), id))
        })
        .collect::<CliResult<Vec<_>>>()?;
    combination(repository, pairs)
}

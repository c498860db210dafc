//! Filtering and projection of records into entry models.

use std::collections::HashMap;

use catsync_catalog::{AttributeValue, BoundValue, CatalogTypeAttribute};
use catsync_core::{AttributeDefinition, Output, SourcedRecord};
use catsync_expr::{Evaluator, Program};
use serde_json::Value;
use tracing::debug;

use crate::error::ProjectionError;
use crate::model::{DesiredType, EntryModel};

/// Derive the desired type shape from an output declaration.
pub fn marshal_type(output: &Output) -> DesiredType {
    DesiredType {
        type_name: output.type_name.clone(),
        name: output.name.clone(),
        description: output.description.clone(),
        attributes: output
            .attributes
            .iter()
            .map(|attribute| CatalogTypeAttribute {
                id: attribute.id.clone(),
                name: attribute.name.clone(),
                data_type: attribute.data_type.clone(),
                array: attribute.array,
                required: attribute.required,
            })
            .collect(),
    }
}

/// Projects records into entry models for one output at a time.
///
/// Projection is a pure function of the output declaration and the records:
/// same inputs, same models, in the same order.
pub struct Projector {
    evaluator: Evaluator,
}

impl Projector {
    pub fn new() -> Self {
        Self {
            evaluator: Evaluator::new(),
        }
    }

    /// Records passing the output's source filter. An absent filter accepts
    /// everything.
    pub fn collect(
        &self,
        output: &Output,
        records: &[SourcedRecord],
    ) -> Result<Vec<SourcedRecord>, ProjectionError> {
        let Some(filter) = &output.source_filter else {
            return Ok(records.to_vec());
        };
        let program = self.evaluator.compile(filter)?;

        let mut collected = Vec::new();
        for sourced in records {
            if self
                .evaluator
                .eval_bool(&program, &sourced.record, &sourced.origin)?
            {
                collected.push(sourced.clone());
            }
        }

        debug!(
            type_name = %output.type_name,
            matched = collected.len(),
            total = records.len(),
            "collected records for output"
        );
        Ok(collected)
    }

    /// Evaluate the output's entry expressions over each record.
    pub fn marshal_entries(
        &self,
        output: &Output,
        records: &[SourcedRecord],
    ) -> Result<Vec<EntryModel>, ProjectionError> {
        let programs = CompiledEntrySource::compile(&self.evaluator, output)?;

        let mut seen: HashMap<String, String> = HashMap::new();
        let mut models = Vec::with_capacity(records.len());
        for sourced in records {
            let model = self.marshal_one(output, &programs, sourced)?;

            if let Some(first_origin) = seen.get(&model.external_id) {
                return Err(ProjectionError::DuplicateExternalId {
                    external_id: model.external_id,
                    first_origin: first_origin.clone(),
                    second_origin: sourced.origin.clone(),
                });
            }
            seen.insert(model.external_id.clone(), sourced.origin.clone());
            models.push(model);
        }

        Ok(models)
    }

    fn marshal_one(
        &self,
        output: &Output,
        programs: &CompiledEntrySource,
        sourced: &SourcedRecord,
    ) -> Result<EntryModel, ProjectionError> {
        let record = &sourced.record;
        let origin = &sourced.origin;

        let external_id = self
            .evaluator
            .eval_string(&programs.external_id, record, origin)?;
        if external_id.is_empty() {
            return Err(ProjectionError::EmptyExternalId {
                origin: origin.clone(),
            });
        }

        let name = self.evaluator.eval_string(&programs.name, record, origin)?;

        let rank = match &programs.rank {
            Some(program) => {
                let value = self.evaluator.eval_int(program, record, origin)?;
                i32::try_from(value).map_err(|_| ProjectionError::RankOutOfRange {
                    origin: origin.clone(),
                    value,
                })?
            }
            None => 0,
        };

        let mut aliases = Vec::with_capacity(programs.aliases.len());
        for program in &programs.aliases {
            aliases.push(self.evaluator.eval_string(program, record, origin)?);
        }

        let mut attribute_values = HashMap::new();
        for (attribute, program) in &programs.values {
            let bound = self.bind_attribute(attribute, program, sourced)?;
            if let Some(bound) = bound {
                attribute_values.insert(attribute.id.clone(), bound);
            }
        }

        for attribute in &output.attributes {
            let empty = attribute_values
                .get(&attribute.id)
                .is_none_or(BoundValue::is_empty);
            if attribute.required && empty {
                return Err(ProjectionError::MissingRequired {
                    attribute: attribute.id.clone(),
                    origin: origin.clone(),
                });
            }
        }

        Ok(EntryModel {
            external_id,
            name,
            rank,
            aliases,
            attribute_values,
        })
    }

    /// Evaluate one attribute's value expression. A null result means the
    /// record simply has no value for the attribute.
    fn bind_attribute(
        &self,
        attribute: &AttributeDefinition,
        program: &Program,
        sourced: &SourcedRecord,
    ) -> Result<Option<BoundValue>, ProjectionError> {
        let record = &sourced.record;
        let origin = &sourced.origin;

        if attribute.array {
            let values = self.evaluator.eval_list(program, record, origin)?;
            let coerced = values
                .into_iter()
                .map(|value| coerce(attribute, origin, value))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Some(BoundValue::array(coerced)));
        }

        match self.evaluator.eval(program, record, origin)? {
            Value::Null => Ok(None),
            value => Ok(Some(BoundValue::scalar(coerce(attribute, origin, value)?))),
        }
    }
}

impl Default for Projector {
    fn default() -> Self {
        Self::new()
    }
}

struct CompiledEntrySource {
    external_id: Program,
    name: Program,
    rank: Option<Program>,
    aliases: Vec<Program>,
    /// Attribute definition and its value program, in schema order.
    values: Vec<(AttributeDefinition, Program)>,
}

impl CompiledEntrySource {
    fn compile(evaluator: &Evaluator, output: &Output) -> Result<Self, ProjectionError> {
        let source = &output.entry_source;

        let rank = source
            .rank
            .as_deref()
            .map(|expr| evaluator.compile(expr))
            .transpose()?;
        let aliases = source
            .aliases
            .iter()
            .map(|expr| evaluator.compile(expr))
            .collect::<Result<Vec<_>, _>>()?;

        let mut values = Vec::new();
        for attribute in &output.attributes {
            if let Some(expr) = source.values.get(&attribute.id) {
                values.push((attribute.clone(), evaluator.compile(expr)?));
            }
        }

        Ok(Self {
            external_id: evaluator.compile(&source.external_id)?,
            name: evaluator.compile(&source.name)?,
            rank,
            aliases,
            values,
        })
    }
}

/// Type an evaluated value per the attribute's declared type. Scalar types
/// are `string`, `bool` and `number`; any other declared type is a
/// reference to another catalog type, carried as that entry's external id.
fn coerce(
    attribute: &AttributeDefinition,
    origin: &str,
    value: Value,
) -> Result<AttributeValue, ProjectionError> {
    let mismatch = |expected: &'static str, actual: &Value| ProjectionError::AttributeType {
        attribute: attribute.id.clone(),
        origin: origin.to_string(),
        expected,
        actual: type_name(actual).to_string(),
    };

    match attribute.data_type.as_str() {
        "bool" => match value {
            Value::Bool(b) => Ok(AttributeValue::Bool(b)),
            other => Err(mismatch("bool", &other)),
        },
        "number" => match value {
            Value::Number(n) => Ok(AttributeValue::Number(n)),
            other => Err(mismatch("number", &other)),
        },
        // Strings and references: scalars render as text, references are
        // external ids and so also text.
        _ => match value {
            Value::String(s) => Ok(AttributeValue::String(s)),
            Value::Number(n) => Ok(AttributeValue::String(n.to_string())),
            Value::Bool(b) => Ok(AttributeValue::String(b.to_string())),
            other => Err(mismatch("string", &other)),
        },
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

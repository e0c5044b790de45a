//! Backend descriptor schema.
//!
//! Every backend folder carries a pure-data descriptor that is either a
//! single model or an ordered sequence of model stages. Sequences are only
//! usable when adjacent stages agree on the types of the fields they share.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::feature::{FeatureKind, FeatureRecord};

/// Errors raised while interpreting a descriptor.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DescriptorError {
    #[error("Invalid descriptor: {0}")]
    Invalid(String),

    #[error(
        "Type mismatch between {producer} output '{field}' ({produced}) \
         and {consumer} input '{field}' ({expected})"
    )]
    StageTypeMismatch {
        producer: String,
        consumer: String,
        field: String,
        produced: FeatureKind,
        expected: FeatureKind,
    },

    #[error("Stage '{0}' not found in sequence")]
    UnknownStage(String),
}

/// Declared input feature, with an optional default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputFeature {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FeatureKind,
    #[serde(default)]
    pub value: Option<Value>,
}

/// Declared output field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FeatureKind,
}

/// A standalone model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleModel {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub figure: Option<String>,
    pub input_features: Vec<InputFeature>,
    pub output_template: Vec<OutputField>,
}

/// One stage of a model sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_features: Vec<InputFeature>,
    #[serde(default)]
    pub output_template: Vec<OutputField>,
}

/// An ordered chain of stages where each stage feeds the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSequence {
    pub name: String,
    pub version: String,
    pub stages: Vec<Stage>,
}

/// A parsed backend descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Descriptor {
    Single(SingleModel),
    Sequence(ModelSequence),
}

impl Descriptor {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Single(model) => &model.name,
            Self::Sequence(sequence) => &sequence.name,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            Self::Single(model) => &model.version,
            Self::Sequence(sequence) => &sequence.version,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }

    /// Features a caller has to supply.
    pub fn input_features(&self) -> &[InputFeature] {
        match self {
            Self::Single(model) => &model.input_features,
            Self::Sequence(sequence) => sequence.input_features(),
        }
    }

    /// Fields produced by the final model.
    pub fn output_template(&self) -> &[OutputField] {
        match self {
            Self::Single(model) => &model.output_template,
            Self::Sequence(sequence) => sequence.output_template(),
        }
    }
}

impl ModelSequence {
    /// Inputs of the first stage.
    pub fn input_features(&self) -> &[InputFeature] {
        self.stages
            .first()
            .map(|s| s.input_features.as_slice())
            .unwrap_or_default()
    }

    /// Outputs of the last stage.
    pub fn output_template(&self) -> &[OutputField] {
        self.stages
            .last()
            .map(|s| s.output_template.as_slice())
            .unwrap_or_default()
    }

    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Id of the stage following `id`, if any.
    pub fn next_stage_id(&self, id: &str) -> Option<&str> {
        let position = self.stages.iter().position(|s| s.id == id)?;
        self.stages.get(position + 1).map(|s| s.id.as_str())
    }

    /// Check that every output shared with the next stage's inputs has the same type.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        for pair in self.stages.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let expected: HashMap<&str, FeatureKind> = next
                .input_features
                .iter()
                .map(|f| (f.name.as_str(), f.kind))
                .collect();

            for output in &current.output_template {
                if let Some(&kind) = expected.get(output.name.as_str()) {
                    if kind != output.kind {
                        return Err(DescriptorError::StageTypeMismatch {
                            producer: current.name.clone(),
                            consumer: next.name.clone(),
                            field: output.name.clone(),
                            produced: output.kind,
                            expected: kind,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Build the input for `next_stage_id` in its declared order.
    ///
    /// Each feature is taken from `current_output` by name, then from
    /// `additional`, then from the declared default (null when absent).
    pub fn prepare_next_input(
        &self,
        current_output: &[FeatureRecord],
        next_stage_id: &str,
        additional: &HashMap<String, Value>,
    ) -> Result<Vec<FeatureRecord>, DescriptorError> {
        let stage = self
            .stage(next_stage_id)
            .ok_or_else(|| DescriptorError::UnknownStage(next_stage_id.to_string()))?;

        let produced: HashMap<&str, &FeatureRecord> = current_output
            .iter()
            .map(|r| (r.name.as_str(), r))
            .collect();

        Ok(stage
            .input_features
            .iter()
            .map(|feature| {
                if let Some(record) = produced.get(feature.name.as_str()) {
                    (*record).clone()
                } else if let Some(value) = additional.get(&feature.name) {
                    FeatureRecord::new(feature.name.clone(), feature.kind, value.clone())
                } else {
                    FeatureRecord::new(
                        feature.name.clone(),
                        feature.kind,
                        feature.value.clone().unwrap_or(Value::Null),
                    )
                }
            })
            .collect())
    }
}

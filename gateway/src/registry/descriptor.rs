//! Parsing of per-backend TOML descriptors.

use serde::Deserialize;

use model_gateway_common::{
    Descriptor, DescriptorError, InputFeature, ModelSequence, OutputField, SingleModel, Stage,
};

const DEFAULT_MODEL_NAME: &str = "Unknown Model";
const DEFAULT_VERSION: &str = "v1.0.0";

/// Every attribute a descriptor may carry; the variant is decided afterwards.
#[derive(Debug, Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    figure: Option<String>,
    #[serde(default)]
    input_features: Vec<InputFeature>,
    #[serde(default)]
    output_template: Vec<OutputField>,
    #[serde(default)]
    sequence_name: Option<String>,
    #[serde(default)]
    sequence_version: Option<String>,
    #[serde(default)]
    stages: Option<Vec<Stage>>,
}

/// Parse a descriptor document.
///
/// A document declaring both `sequence_name` and `stages` is a sequence and
/// must pass stage type validation; anything else is a single model.
pub fn parse_descriptor(text: &str) -> Result<Descriptor, DescriptorError> {
    let raw: RawDescriptor =
        toml::from_str(text).map_err(|e| DescriptorError::Invalid(e.to_string()))?;

    if let (Some(name), Some(stages)) = (raw.sequence_name, raw.stages) {
        let sequence = ModelSequence {
            name,
            version: raw
                .sequence_version
                .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            stages,
        };
        sequence.validate()?;
        return Ok(Descriptor::Sequence(sequence));
    }

    Ok(Descriptor::Single(SingleModel {
        name: raw.name.unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
        version: raw.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
        description: raw.description,
        figure: raw.figure,
        input_features: raw.input_features,
        output_template: raw.output_template,
    }))
}

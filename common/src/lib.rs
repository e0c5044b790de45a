//! Model Gateway Common Types
//!
//! Data contracts shared by the gateway and the model backends it fronts.

pub mod descriptor;
pub mod feature;

pub use descriptor::{
    Descriptor, DescriptorError, InputFeature, ModelSequence, OutputField, SingleModel, Stage,
};
pub use feature::{validate_records, FeatureError, FeatureKind, FeatureRecord};

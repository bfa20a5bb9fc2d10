pub mod error;
pub mod flow;
pub mod image_type;
pub mod image_version;
pub mod ramp_rule;
pub mod rampup;
pub mod version_info;

pub use error::ResolveError;
pub use flow::FlowContext;
pub use image_type::{normalized_type_name, ImageType};
pub use image_version::{ImageVersion, VersionState};
pub use ramp_rule::RampRule;
pub use rampup::{normalized_plan, RampupEntry};
pub use version_info::{ImageVersionMetadata, Selection, VersionInfo, VersionSet};

pub mod telemetry;

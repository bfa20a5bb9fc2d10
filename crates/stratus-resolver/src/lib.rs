pub mod bucket;
pub mod resolver;

pub use bucket::{DigestBucketer, FlowBucketer};
pub use resolver::VersionResolver;

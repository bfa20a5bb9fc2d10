pub mod etcd;
pub mod memory;
pub mod types;

pub use etcd::EtcdImageStore;
pub use memory::MemoryImageStore;
pub use types::{ImageTypeCatalog, ImageVersionCatalog, RampRuleStore, RampupStore};

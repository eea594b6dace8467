pub mod config;
pub mod generator;
pub mod render;

pub use config::{GroupKind, HubConfig, HubGroupDef, SubgroupDef};
pub use generator::{collect_group, write_global_index, write_group, CollectedGroup, GroupOutput, HubWriteOptions};
pub use render::{GroupSummary, HubLink};

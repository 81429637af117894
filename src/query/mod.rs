pub mod relations;
pub mod stats;

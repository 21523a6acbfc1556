pub mod ai;
pub mod incident;

pub use incident::{Dimension, IncidentRecord, RelationEdge};

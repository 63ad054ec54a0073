pub mod scoring_service;
pub mod structural_eq;
pub mod tree_materializer;

pub use scoring_service::{effective_max_score, ScoringService, ShapeCheck};
pub use structural_eq::{same_content, ComparisonCache};
pub use tree_materializer::{materialize, number_questions, NumberedQuestion};

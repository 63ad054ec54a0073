pub mod answer;
pub mod edges;
pub mod form;
pub mod identifier;
pub mod loaders;
pub mod question;
pub mod response;

pub use answer::{parse_date, AnswerValue, RangeBound, RangeValue};
pub use edges::{Edge, EdgeSet};
pub use form::{FormDefinition, ResponseDraft};
pub use identifier::Identifier;
pub use loaders::{load_all_form_definitions, load_form_definition};
pub use question::{
    total_score, AnswerKey, ChildRef, ChoiceOption, ConditionalEntry, ParentContent,
    QuestionNode, QuestionType,
};
pub use response::{Response, ResponseEntry};

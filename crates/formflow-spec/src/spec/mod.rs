pub mod field;
pub mod form;
pub mod section;
pub mod target;

pub use field::{
    ConditionalLogic, ConditionalRule, Field, FieldType, TableColumn, TableColumnType,
    TextValidation,
};
pub use form::Form;
pub use section::{Column, Section};
pub use target::{END_TARGET, SectionTarget};

pub mod case_record;
pub mod document;
pub mod enums;

pub use case_record::*;
pub use document::*;
pub use enums::*;

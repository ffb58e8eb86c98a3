pub mod conversion;
pub mod definition;
pub mod parsing;
pub mod reader;

pub use conversion::*;
pub use definition::*;
pub use parsing::StepParser;
pub use reader::*;

pub mod pipeline;
pub mod scanner;
pub mod selectors;

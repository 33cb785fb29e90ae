pub mod convert;
pub mod labels;
pub mod taxonomy;

pub mod article;
pub mod source;

pub use article::*;
pub use source::*;

pub mod file;
pub mod payment;
pub mod plan;
pub mod quota;

pub use file::*;
pub use payment::*;
pub use plan::*;
pub use quota::*;

pub mod boundary;
pub mod extraction;
pub mod fill;
pub mod simplification;
pub mod threshold;

pub use boundary::*;
pub use extraction::*;
pub use fill::*;
pub use simplification::*;
pub use threshold::*;

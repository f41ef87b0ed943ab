pub mod bounds;
pub mod errors;
pub mod evaluation;
pub mod run;
pub mod space;

pub use bounds::*;
pub use errors::*;
pub use evaluation::*;
pub use run::*;
pub use space::*;

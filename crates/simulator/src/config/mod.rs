pub mod cli;
pub mod scenario;
pub mod simulate;
pub mod solve;

pub use cli::*;
pub use scenario::*;
pub use simulate::*;
pub use solve::*;

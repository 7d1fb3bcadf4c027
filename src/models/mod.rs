pub mod routing;
pub mod supply;
pub mod utils;

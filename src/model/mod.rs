pub mod connection;
pub mod element;
pub mod flow;
pub mod validation;

pub use connection::*;
pub use element::*;
pub use flow::*;
pub use validation::*;

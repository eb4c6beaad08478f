pub mod connection;
pub mod hub;

pub use connection::serve;
pub use hub::Hub;

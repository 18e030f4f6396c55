pub mod session;
mod strategies;

pub use strategies::AuthStrategy;

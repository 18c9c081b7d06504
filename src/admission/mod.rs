pub mod controller;
pub mod resolver;
pub mod session;

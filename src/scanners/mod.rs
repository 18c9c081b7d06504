pub mod device;
pub mod scanner;
pub mod scripted;

pub mod operator;
pub mod outcome;
pub mod scan;
pub mod ticket;

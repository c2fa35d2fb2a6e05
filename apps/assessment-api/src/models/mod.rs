pub mod catalog;
pub mod student;
pub mod user;

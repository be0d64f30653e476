pub mod database;
pub mod entity;

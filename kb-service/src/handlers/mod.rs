pub mod admin;
pub mod articles;
pub mod categories;
pub mod health;
pub mod seed;

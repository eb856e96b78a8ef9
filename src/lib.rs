pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod expenses;
pub mod middleware;
pub mod response;
pub mod state;
pub mod storage;
pub mod timestamp;
pub mod users;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub mod agent;
pub mod cache;
pub mod serve;

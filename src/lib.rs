#![forbid(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod favorites;
pub mod fetch;
pub mod filter;
pub mod list;
pub mod logging;
pub mod paginate;
pub mod record;
pub mod render;
pub mod search;
pub mod serve;
pub mod view;

pub mod broker;
pub mod config;
pub mod error;
pub mod handler;
pub mod identity;
pub mod mfa;
pub mod run;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

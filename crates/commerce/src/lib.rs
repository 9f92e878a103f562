//! Altiplano Commerce library.
//!
//! This crate provides the checkout/order service as a library, allowing it
//! to be tested and reused by the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

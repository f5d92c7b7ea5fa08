//! OpenML Catalog Module
//!
//! Provides integration with the OpenML REST API for tagged dataset
//! listings, descriptions, features, qualities and ARFF downloads.
//!
//! API Documentation: https://www.openml.org/apis

mod client;
mod mapper;
mod models;

pub use client::OpenmlCatalog;

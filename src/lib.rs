//! Billing Address Validator Library
//!
//! Reads billing records from a spreadsheet, validates each postal address
//! against an address-validation web service, flattens the replies into
//! columns, saves the enriched table and renders a quality report.
//!
//! # Modules
//!
//! - `address_client`: HTTP client for the validation endpoint.
//! - `config`: Configuration management.
//! - `dataset`: Spreadsheet and delimited-file I/O.
//! - `enrichment`: Batch enrichment of billing rows.
//! - `errors`: Error handling types.
//! - `models`: Validation request/response and normalized record types.
//! - `normalizer`: Response flattening.
//! - `report`: Value counts and the HTML chart panel.

pub mod address_client;
pub mod config;
pub mod dataset;
pub mod enrichment;
pub mod errors;
pub mod models;
pub mod normalizer;
pub mod report;

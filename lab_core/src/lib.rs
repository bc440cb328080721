//! # CosinorAge Lab Core
//!
//! Client-side core of the multi-individual CosinorAge lab.
//!
//! This crate drives a batch of wearable-accelerometer recordings through a
//! remote analysis service and turns the per-file biomarker payloads it returns
//! into distribution and correlation visualizations.
//!
//! ## Features
//!
//! - **Bulk ingestion**: upload, schema consistency checks, column configuration
//!   and batch submission, modelled as an explicit state machine
//! - **Partial failures**: loading failures and processing failures are kept apart
//! - **Feature pooling**: scalar, per-day and nested feature payloads pool into one
//!   distribution per feature name
//! - **Distributions**: histograms, Gaussian kernel density curves and summary statistics
//! - **Correlations**: diverging colour scale and upper-triangular heatmap layout
//!
//! ## Architecture
//!
//! - [`api`]: Data Transfer Objects exchanged with the analysis service
//! - [`models`]: Domain types (feature values, batch configuration, age inputs)
//! - [`remote`]: The [`remote::AnalysisService`] seam, its HTTP and in-memory
//!   implementations, errors and configuration
//! - [`services`]: Validators, the batch controller and the analytics engine
//!

pub mod api;

pub mod models;

pub mod remote;

pub mod services;

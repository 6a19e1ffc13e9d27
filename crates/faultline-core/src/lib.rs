//! Faultline Core - Domain types and port definitions
//!
//! This crate contains everything the capture pipeline and the sinks agree on:
//! - **Domain types** - `DiagnosticEvent`, `Breadcrumb`, `LogRecord`, `ErrorSignal`, levels and masks
//! - **Configuration** - YAML-backed `Config` with defaults, validation and a builder
//! - **Port definitions** - Traits for adapters: `CaptureSink`, `Transport`, `ContextProvider`,
//!   `SceneCapture`, `SourceProvider`
//!
//! # Architecture
//!
//! The domain module holds plain data with no I/O. Ports define the trait
//! interfaces the pipeline depends on; their implementations live in
//! `faultline-sinks` or in the host application.

pub mod config;
pub mod domain;
pub mod ports;

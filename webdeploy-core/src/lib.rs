//! webdeploy Core
//!
//! Core library for describing a stack as a plain resource graph and
//! rendering it into a template for an external provisioning engine

pub mod case_convert;
pub mod differ;
pub mod graph;
pub mod plan;
pub mod resource;
pub mod schema;
pub mod template;

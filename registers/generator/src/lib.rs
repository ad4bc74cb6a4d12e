// Licensed under the Apache-2.0 license

//! Device description to C register header generator.
//!
//! This crate reads a vendor device description (a top-level XML document
//! plus one module document per peripheral definition), validates it into
//! a [`Device`] model and emits a C11 header with bit-packed register
//! overlays, padded peripheral structs and fixed-address instance handles.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use registers_generator::{generate_c_header_from_file, FilterConfig, OutputConfig};
//!
//! let filter = FilterConfig::new().exclude_name("CPU_DWT");
//! let header = generate_c_header_from_file(
//!     Path::new("cc26x2/CC2652R1F.xml"),
//!     &filter,
//!     &OutputConfig::default(),
//! )
//! .unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`model`]: validated device model and its raw candidates
//! - [`ingest`]: XML documents to [`Device`]
//! - [`layout`]: bit and byte layout planning
//! - [`output`]: C header emission
//! - [`config`]: filtering ([`FilterConfig`]) and output settings ([`OutputConfig`])
//! - [`util`]: name conversion and comment formatting

pub mod config;
pub mod error;
pub mod ingest;
pub mod layout;
pub mod model;
pub mod output;
pub mod util;


use registers_xml::{FileSource, FsFileSource};
use std::path::Path;

pub use config::{FilterConfig, OutputConfig};
pub use error::Error;
pub use model::{
    Device, PeripheralDefinition, PeripheralInstance, Register, RegisterBitfield, RwAccess,
};

/// Generates a C header for the device description at `path`.
pub fn generate_c_header_from_file(
    path: &Path,
    filter: &FilterConfig,
    output: &OutputConfig,
) -> anyhow::Result<String> {
    generate_c_header_from_source(&FsFileSource, path, filter, output)
}

/// Generates a C header for the device description at `path`, reading all
/// documents through `source`.
pub fn generate_c_header_from_source(
    source: &dyn FileSource,
    path: &Path,
    filter: &FilterConfig,
    output: &OutputConfig,
) -> anyhow::Result<String> {
    let device = ingest::parse_device(source, path, filter)?;
    Ok(generate_c_header(&device, output))
}

/// Generates a C header for an already validated `device`.
pub fn generate_c_header(device: &Device, output: &OutputConfig) -> String {
    output::generate_header(device, output)
}

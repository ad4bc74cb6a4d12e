// Licensed under the Apache-2.0 license.

//! Minimal reader for attribute-bearing device description documents.
//!
//! Vendor device descriptions are XML files where all of the interesting
//! data lives in element attributes. This crate reads such a document into
//! an [`Element`] tree and nothing more: character data is skipped and there
//! is no namespace, DTD or schema handling.
//!
//! ```
//! let root = registers_xml::parse(r#"<device partnum="CC2652"><cpu id="CM4"/></device>"#).unwrap();
//! assert_eq!(root.attr("partnum"), Some("CC2652"));
//! assert_eq!(root.descendants("cpu").count(), 1);
//! ```

mod element;
mod parser;
mod source;

use anyhow::Context;
use std::path::Path;

pub use element::Element;
pub use parser::parse;
pub use source::{FileSource, FsFileSource, MemFileSource};

/// Reads `path` through `source` and parses it.
///
/// Errors carry the path of the document that failed.
pub fn parse_file(source: &dyn FileSource, path: &Path) -> anyhow::Result<Element> {
    let text = source
        .read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse(&text).with_context(|| format!("failed to parse {}", path.display()))
}

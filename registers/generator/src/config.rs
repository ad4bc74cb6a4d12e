// Licensed under the Apache-2.0 license

//! Configuration for instance filtering and output formatting.
//!
//! [`FilterConfig`] decides which instance entries of a device description
//! take part in generation. [`OutputConfig`] controls cosmetic aspects of
//! the emitted header.

use registers_xml::Element;

/// Configuration for filtering which peripheral instances are generated.
///
/// Instances whose `id` attribute is missing or empty are always skipped;
/// vendor descriptions use them for placeholder blocks that are not visible
/// to software.
///
/// # Example
///
/// ```
/// use registers_generator::config::FilterConfig;
///
/// // Only peripherals mapped in the APB window, without the debug block
/// let config = FilterConfig::new()
///     .include_address_range(0x4000_0000, 0x400F_FFFF)
///     .exclude_name("CPU_DWT");
/// assert!(config.should_include(0x4000_1000, "UART0"));
/// assert!(!config.should_include(0x4000_2000, "cpu_dwt"));
/// assert!(!config.should_include(0xE000_0000, "CPU_SCS"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct FilterConfig {
    /// Only include instances whose base address falls within these ranges
    /// (inclusive). If empty, all addresses are included (subject to
    /// exclude_address_ranges).
    pub include_address_ranges: Vec<(u64, u64)>,

    /// Exclude instances whose base address falls within these ranges
    /// (inclusive).
    pub exclude_address_ranges: Vec<(u64, u64)>,

    /// Exclude instances whose id matches (case-insensitive).
    pub exclude_names: Vec<String>,
}

impl FilterConfig {
    /// Create a new FilterConfig with no filtering (everything included).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_address_range(mut self, start: u64, end: u64) -> Self {
        self.include_address_ranges.push((start, end));
        self
    }

    pub fn exclude_address_range(mut self, start: u64, end: u64) -> Self {
        self.exclude_address_ranges.push((start, end));
        self
    }

    /// Exclude instances whose id matches (case-insensitive).
    pub fn exclude_name(mut self, name: &str) -> Self {
        self.exclude_names.push(name.to_lowercase());
        self
    }

    /// Returns true if this filter has no constraints (everything passes).
    pub fn is_empty(&self) -> bool {
        self.include_address_ranges.is_empty()
            && self.exclude_address_ranges.is_empty()
            && self.exclude_names.is_empty()
    }

    /// Returns true if the instance node has a usable identifier.
    pub fn is_visible(instance: &Element) -> bool {
        instance.attr("id").is_some_and(|id| !id.trim().is_empty())
    }

    /// Check whether an instance at `address` named `name` should be
    /// generated.
    pub fn should_include(&self, address: u64, name: &str) -> bool {
        let name_lower = name.to_lowercase();
        if self.exclude_names.iter().any(|n| *n == name_lower) {
            return false;
        }

        let in_range = |ranges: &[(u64, u64)]| {
            ranges
                .iter()
                .any(|(start, end)| address >= *start && address <= *end)
        };
        if in_range(&self.exclude_address_ranges) {
            return false;
        }
        self.include_address_ranges.is_empty() || in_range(&self.include_address_ranges)
    }
}

/// Cosmetic settings for the generated header.
#[derive(Clone, Debug)]
pub struct OutputConfig {
    /// Column at which comments are wrapped.
    pub comment_width: usize,
    /// Lines emitted as `//` comments before anything else, e.g. a license
    /// notice.
    pub banner: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            comment_width: 100,
            banner: Vec::new(),
        }
    }
}

impl OutputConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comment_width(mut self, width: usize) -> Self {
        self.comment_width = width;
        self
    }

    pub fn add_banner_line(mut self, line: &str) -> Self {
        self.banner.push(line.to_string());
        self
    }
}

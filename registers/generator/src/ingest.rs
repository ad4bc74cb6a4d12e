// Licensed under the Apache-2.0 license

//! Builds a [`Device`] from a TI-style XML device description.
//!
//! The top-level document names the part and lists, under its `cpu`
//! element, every peripheral instance with the relative path (`href`) of the
//! document that defines its registers:
//!
//! ```text
//! <device partnum="CC2652R1F">
//!   <cpu id="CM4">
//!     <instance id="UART0" href="Modules/UART.xml" baseaddr="0x40001000" size="0x1000" .../>
//!     <instance id="UART1" href="Modules/UART.xml" baseaddr="0x4000B000" size="0x1000" .../>
//!   </cpu>
//! </device>
//!
//! <module id="UART" description="...">
//!   <register id="DR" width="32" offset="0x0" description="...">
//!     <bitfield id="DATA" begin="7" end="0" width="8" rwaccess="RW" resetval="0x0" .../>
//!   </register>
//! </module>
//! ```
//!
//! Instances are grouped by definition document first, so each definition
//! is read once and validated together with all of its instances.

use crate::config::FilterConfig;
use crate::error::{Error, Result};
use crate::model::{
    Device, PeripheralDefinition, PeripheralInstance, RawBitfield, RawDevice, RawInstance,
    RawPeripheral, RawRegister, Register, RegisterBitfield, RwAccess,
};
use anyhow::Context;
use log::{debug, info};
use registers_xml::{Element, FileSource};
use std::path::{Path, PathBuf};

fn get_attr<'a>(elem: &'a Element, attr: &str) -> Result<&'a str> {
    elem.attr(attr).ok_or_else(|| Error::missing(elem.tag(), attr))
}

fn parse_dec(value: &str, what: &str, entity: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::malformed(what, value, entity))
}

/// Parses a hex attribute, with or without a `0x` prefix.
fn parse_hex(value: &str, what: &str, entity: &str) -> Result<i128> {
    let trimmed = value.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    if digits.starts_with(['+', '-']) {
        return Err(Error::malformed(what, value, entity));
    }
    let magnitude =
        i128::from_str_radix(digits, 16).map_err(|_| Error::malformed(what, value, entity))?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn narrow(value: i128, what: &str, entity: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::malformed(what, &format!("{value:#x}"), entity))
}

/// Derives an instance's array index from its identifier.
///
/// The definition name is stripped as a prefix and the rest parsed as an
/// integer, so `TIMER2` of `TIMER` is index 2. An identifier without the
/// prefix, or a remainder that is not an integer, means the instance has no
/// index.
pub fn instance_index(instance_name: &str, definition_name: &str) -> Option<i64> {
    instance_name.strip_prefix(definition_name)?.parse().ok()
}

fn parse_register_bitfield(elem: &Element) -> Result<RegisterBitfield> {
    let name = get_attr(elem, "id")?;
    let bit_offset = parse_dec(get_attr(elem, "end")?, "end", name)?;
    let bit_width = parse_dec(get_attr(elem, "width")?, "width", name)?;
    let bit_begin = parse_dec(get_attr(elem, "begin")?, "begin", name)?;

    if i128::from(bit_begin) - i128::from(bit_offset) != i128::from(bit_width) - 1 {
        return Err(Error::CrossReference(format!(
            "Mismatch between begin: {bit_begin}, width: {bit_width}, and end: {bit_offset} in {name}."
        )));
    }

    RawBitfield {
        name: name.to_string(),
        description: get_attr(elem, "description")?.trim().to_string(),
        bit_offset,
        bit_width,
        rw_access: RwAccess::from_code(get_attr(elem, "rwaccess")?, name)?,
        reset_value: parse_hex(get_attr(elem, "resetval")?, "reset value", name)?,
    }
    .validate()
}

fn parse_register(elem: &Element) -> Result<Register> {
    let name = get_attr(elem, "id")?;
    let offset = parse_hex(get_attr(elem, "offset")?, "offset", name)?;
    RawRegister {
        name: name.to_string(),
        description: get_attr(elem, "description")?.trim().to_string(),
        bit_width: parse_dec(get_attr(elem, "width")?, "width", name)?,
        address_offset: narrow(offset, "offset", name)?,
        bitfields: elem
            .descendants("bitfield")
            .map(parse_register_bitfield)
            .collect::<Result<_>>()?,
    }
    .validate()
}

fn parse_peripheral_instance(elem: &Element, definition_name: &str) -> Result<PeripheralInstance> {
    let name = get_attr(elem, "id")?;
    let start = narrow(
        parse_hex(get_attr(elem, "baseaddr")?, "baseaddr", name)?,
        "baseaddr",
        name,
    )?;
    let size = narrow(parse_hex(get_attr(elem, "size")?, "size", name)?, "size", name)?;

    // Not every instance carries an end address.
    let end = match elem.attr("endaddr") {
        Some(end) => i128::from(narrow(parse_hex(end, "endaddr", name)?, "endaddr", name)?),
        None => i128::from(start) + i128::from(size) - 1,
    };
    if end - i128::from(start) != i128::from(size) - 1 {
        return Err(Error::CrossReference(format!(
            "Mismatch between start: {start:#010x}, end: {end:#010x}, and size: {size:#x} in {name}."
        )));
    }

    RawInstance {
        name: name.to_string(),
        index: instance_index(name, definition_name),
        address: start,
        size,
    }
    .validate()
}

/// Reads the definition at `path` and validates it together with the
/// instance nodes that reference it.
fn parse_peripheral_definition(
    source: &dyn FileSource,
    path: &Path,
    instance_elems: &[&Element],
) -> anyhow::Result<PeripheralDefinition> {
    let root = registers_xml::parse_file(source, path)?;
    let name = get_attr(&root, "id")?;

    let registers = root
        .descendants("register")
        .map(|elem| {
            parse_register(elem).with_context(|| {
                format!(
                    "while processing register {}",
                    elem.attr("id").unwrap_or("<unnamed>")
                )
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let instances = instance_elems
        .iter()
        .map(|elem| {
            parse_peripheral_instance(elem, name).with_context(|| {
                format!(
                    "while processing instance {}",
                    elem.attr("id").unwrap_or("<unnamed>")
                )
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    debug!(
        "{name}: {} register(s), {} instance(s)",
        registers.len(),
        instances.len()
    );

    Ok(RawPeripheral {
        name: name.to_string(),
        description: get_attr(&root, "description")?.trim().to_string(),
        registers,
        instances,
    }
    .validate()?)
}

/// Definition document → the instance nodes that use it, in order of first
/// appearance.
type ResolutionMap<'a> = Vec<(PathBuf, Vec<&'a Element>)>;

/// Groups the visible instance nodes under `cpu` by the definition they
/// reference. `base` is the directory `href`s are relative to.
fn resolve_instances<'a>(
    source: &dyn FileSource,
    base: &Path,
    cpu: &'a Element,
    filter: &FilterConfig,
) -> anyhow::Result<ResolutionMap<'a>> {
    let mut map: ResolutionMap<'a> = Vec::new();

    for instance in cpu.descendants("instance") {
        if !FilterConfig::is_visible(instance) {
            debug!(
                "skipping instance without id (href: {})",
                instance.attr("href").unwrap_or("<none>")
            );
            continue;
        }
        let id = get_attr(instance, "id")?;
        if !filter.is_empty() {
            let address = parse_hex(get_attr(instance, "baseaddr")?, "baseaddr", id)?;
            let included = u64::try_from(address).is_ok_and(|a| filter.should_include(a, id));
            if !included {
                debug!("filtered out instance {id}");
                continue;
            }
        }

        let path = base.join(get_attr(instance, "href")?);
        match map
            .iter_mut()
            .find(|(known, _)| source.same_file(known, &path))
        {
            Some((_, elems)) => elems.push(instance),
            None => map.push((path, vec![instance])),
        }
    }

    Ok(map)
}

/// Parses the device description at `path`, reading referenced definition
/// documents through `source`.
pub fn parse_device(
    source: &dyn FileSource,
    path: &Path,
    filter: &FilterConfig,
) -> anyhow::Result<Device> {
    parse_device_inner(source, path, filter)
        .with_context(|| format!("while processing {}", path.display()))
}

fn parse_device_inner(
    source: &dyn FileSource,
    path: &Path,
    filter: &FilterConfig,
) -> anyhow::Result<Device> {
    let root = registers_xml::parse_file(source, path)?;
    let cpu = root
        .descendants("cpu")
        .next()
        .ok_or_else(|| Error::missing(root.tag(), "cpu"))?;

    let base = path.parent().unwrap_or(Path::new(""));
    let resolution = resolve_instances(source, base, cpu, filter)?;

    let peripherals = resolution
        .iter()
        .map(|(definition, instances)| {
            parse_peripheral_definition(source, definition, instances)
                .with_context(|| format!("while processing {}", definition.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let device = RawDevice {
        part_number: get_attr(&root, "partnum")?.to_string(),
        cpu_name: get_attr(cpu, "id")?.to_string(),
        peripherals,
    }
    .validate()?;

    info!(
        "{}: {} peripheral definition(s), {} instance(s)",
        device.part_number(),
        device.peripherals().len(),
        device
            .peripherals()
            .iter()
            .map(|p| p.instances().len())
            .sum::<usize>()
    );
    Ok(device)
}

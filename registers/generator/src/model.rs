// Licensed under the Apache-2.0 license

//! Validated model of a device's address space.
//!
//! Every entity is built in two steps: the caller fills in a `Raw*` candidate
//! with whatever was read from the source document, then calls `validate()`.
//! Validation either returns the canonical entity (children sorted, all
//! invariants checked) or an [`Error`] naming the field, its value and the
//! owning entity. Validated entities have no setters, so an invalid model is
//! never observable.
//!
//! ```text
//! Device
//! └── PeripheralDefinition[]       (ingestion order)
//!     ├── Register[]               (sorted by address offset, may alias)
//!     │   └── RegisterBitfield[]   (sorted by bit offset, never overlap)
//!     └── PeripheralInstance[]     (sorted by base address, same size)
//! ```

use crate::error::{Error, Result};
use std::collections::HashSet;

/// Register widths a peripheral may declare.
pub const REGISTER_WIDTHS: [u64; 4] = [8, 16, 32, 64];

/// Largest instance index; bounds the length of emitted handle arrays.
pub const MAX_INSTANCE_INDEX: u64 = 0xffff;

fn check_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvariantViolation(format!("{kind} is missing name.")));
    }
    Ok(())
}

fn check_non_negative(value: i64, field: &str, owner: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| {
        Error::InvariantViolation(format!("{} ({value}) is negative in {owner}.", capitalize(field)))
    })
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Software access permitted on a bitfield.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RwAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl RwAccess {
    /// Maps a description's access code onto an access kind.
    ///
    /// `R`/`RO` are read-only, `W`/`WO` write-only, and `RW` or an empty code
    /// read-write. Anything else is rejected.
    pub fn from_code(code: &str, owner: &str) -> Result<Self> {
        match code {
            "R" | "RO" => Ok(RwAccess::ReadOnly),
            "W" | "WO" => Ok(RwAccess::WriteOnly),
            "" | "RW" => Ok(RwAccess::ReadWrite),
            _ => Err(Error::malformed("rwaccess", code, owner)),
        }
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            RwAccess::ReadOnly => "RO",
            RwAccess::WriteOnly => "WO",
            RwAccess::ReadWrite => "RW",
        }
    }
}

//=============================================================================
// Bitfields
//=============================================================================

/// Unvalidated bitfield as read from a description.
#[derive(Clone, Debug)]
pub struct RawBitfield {
    pub name: String,
    pub description: String,
    pub bit_offset: i64,
    pub bit_width: i64,
    pub rw_access: RwAccess,
    pub reset_value: i128,
}

impl RawBitfield {
    pub fn validate(self) -> Result<RegisterBitfield> {
        check_name("RegisterBitfield", &self.name)?;
        let bit_offset = check_non_negative(self.bit_offset, "bit offset", &self.name)?;
        let bit_width = check_non_negative(self.bit_width, "bit width", &self.name)?;
        if bit_width == 0 {
            return Err(Error::InvariantViolation(format!(
                "Bit width (0) is not positive in {}.",
                self.name
            )));
        }
        if self.reset_value < 0 {
            return Err(Error::InvariantViolation(format!(
                "Reset value ({}) is negative in {}.",
                self.reset_value, self.name
            )));
        }
        let too_large = bit_width < 127 && self.reset_value >= (1i128 << bit_width);
        let reset_value = u64::try_from(self.reset_value)
            .ok()
            .filter(|_| !too_large)
            .ok_or_else(|| {
                Error::InvariantViolation(format!(
                    "Reset value ({}) too large in {}.",
                    self.reset_value, self.name
                ))
            })?;
        Ok(RegisterBitfield {
            name: self.name,
            description: self.description,
            bit_offset,
            bit_width,
            rw_access: self.rw_access,
            reset_value,
        })
    }
}

/// A named range of bits within a register.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterBitfield {
    name: String,
    description: String,
    bit_offset: u64,
    bit_width: u64,
    rw_access: RwAccess,
    reset_value: u64,
}

impl RegisterBitfield {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Position of the least significant bit.
    pub fn bit_offset(&self) -> u64 {
        self.bit_offset
    }

    pub fn bit_width(&self) -> u64 {
        self.bit_width
    }

    /// One past the most significant bit.
    pub fn bit_end(&self) -> u64 {
        self.bit_offset + self.bit_width
    }

    pub fn rw_access(&self) -> RwAccess {
        self.rw_access
    }

    pub fn reset_value(&self) -> u64 {
        self.reset_value
    }
}

//=============================================================================
// Registers
//=============================================================================

/// Unvalidated register template.
#[derive(Clone, Debug)]
pub struct RawRegister {
    pub name: String,
    pub description: String,
    pub bit_width: i64,
    pub address_offset: i64,
    pub bitfields: Vec<RegisterBitfield>,
}

impl RawRegister {
    pub fn validate(self) -> Result<Register> {
        check_name("Register", &self.name)?;

        let bit_width = u64::try_from(self.bit_width)
            .ok()
            .filter(|w| REGISTER_WIDTHS.contains(w))
            .ok_or_else(|| {
                Error::InvariantViolation(format!(
                    "Invalid bit width ({}) in {}.",
                    self.bit_width, self.name
                ))
            })?;

        let address_offset =
            check_non_negative(self.address_offset, "address offset", &self.name)?;
        if address_offset % (bit_width / 8) != 0 {
            return Err(Error::InvariantViolation(format!(
                "Unaligned address offset ({address_offset:#010x}) in {}.",
                self.name
            )));
        }

        let mut bitfields = self.bitfields;
        bitfields.sort_by_key(RegisterBitfield::bit_offset);

        let mut end = 0;
        for bitfield in &bitfields {
            if bitfield.bit_offset < end {
                return Err(Error::InvariantViolation(format!(
                    "Overlapping bitfield ({}) in {}.",
                    bitfield.name, self.name
                )));
            }
            end = bitfield.bit_end();
        }
        if end > bit_width {
            return Err(Error::InvariantViolation(format!(
                "Bit width ({end}) overflowed in {} ({bit_width}).",
                self.name
            )));
        }

        Ok(Register {
            name: self.name,
            description: self.description,
            bit_width,
            address_offset,
            bitfields,
        })
    }
}

/// Fixed-width storage at an offset within a peripheral.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Register {
    name: String,
    description: String,
    bit_width: u64,
    address_offset: u64,
    bitfields: Vec<RegisterBitfield>,
}

impl Register {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn bit_width(&self) -> u64 {
        self.bit_width
    }

    pub fn byte_width(&self) -> u64 {
        self.bit_width / 8
    }

    pub fn address_offset(&self) -> u64 {
        self.address_offset
    }

    /// Byte offset one past the register.
    pub fn end_offset(&self) -> u64 {
        self.address_offset + self.byte_width()
    }

    /// Bitfields in ascending bit-offset order.
    pub fn bitfields(&self) -> &[RegisterBitfield] {
        &self.bitfields
    }
}

//=============================================================================
// Peripherals
//=============================================================================

/// Unvalidated placement of a peripheral.
#[derive(Clone, Debug)]
pub struct RawInstance {
    pub name: String,
    pub index: Option<i64>,
    pub address: i64,
    pub size: i64,
}

impl RawInstance {
    pub fn validate(self) -> Result<PeripheralInstance> {
        check_name("PeripheralInstance", &self.name)?;
        let index = self
            .index
            .map(|i| check_non_negative(i, "index", &self.name))
            .transpose()?;
        if let Some(index) = index.filter(|&i| i > MAX_INSTANCE_INDEX) {
            return Err(Error::InvariantViolation(format!(
                "Index ({index}) exceeds {MAX_INSTANCE_INDEX} in {}.",
                self.name
            )));
        }
        let address = check_non_negative(self.address, "address", &self.name)?;
        let size = check_non_negative(self.size, "size", &self.name)?;
        if size == 0 {
            return Err(Error::InvariantViolation(format!(
                "Size (0) is not positive in {}.",
                self.name
            )));
        }
        Ok(PeripheralInstance {
            name: self.name,
            index,
            address,
            size,
        })
    }
}

/// One concrete placement of a peripheral definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeripheralInstance {
    name: String,
    index: Option<u64>,
    address: u64,
    size: u64,
}

impl PeripheralInstance {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Array position, or `None` for a singleton.
    pub fn index(&self) -> Option<u64> {
        self.index
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Last byte address covered by the instance.
    pub fn end_address(&self) -> u64 {
        self.address + (self.size - 1)
    }
}

/// Unvalidated peripheral definition.
#[derive(Clone, Debug)]
pub struct RawPeripheral {
    pub name: String,
    pub description: String,
    pub registers: Vec<Register>,
    pub instances: Vec<PeripheralInstance>,
}

impl RawPeripheral {
    pub fn validate(self) -> Result<PeripheralDefinition> {
        check_name("PeripheralDefinition", &self.name)?;

        // Registers may share an offset (read/write aliases); keep declaration
        // order among them.
        let mut registers = self.registers;
        registers.sort_by_key(Register::address_offset);

        let mut instances = self.instances;
        instances.sort_by_key(PeripheralInstance::address);

        let mut seen = HashSet::new();
        for instance in &instances {
            if let Some(index) = instance.index {
                if !seen.insert(index) {
                    return Err(Error::InvariantViolation(format!(
                        "Duplicate index ({index}) for instance ({}) in {}.",
                        instance.name, self.name
                    )));
                }
            }
            if instance.size != instances[0].size {
                return Err(Error::InvariantViolation(format!(
                    "Peripheral size mismatch between {} ({:#x}) and {} ({:#x}).",
                    instance.name, instance.size, instances[0].name, instances[0].size
                )));
            }
        }

        if let Some(first) = instances.first() {
            if let Some(register) = registers.iter().find(|r| r.end_offset() > first.size) {
                return Err(Error::InvariantViolation(format!(
                    "Registers overflowed peripheral size in {}: {} ends at {:#x}, size is {:#x}.",
                    self.name,
                    register.name,
                    register.end_offset(),
                    first.size
                )));
            }
        }

        Ok(PeripheralDefinition {
            name: self.name,
            description: self.description,
            registers,
            instances,
        })
    }
}

/// Register layout shared by every instance of one kind of hardware block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeripheralDefinition {
    name: String,
    description: String,
    registers: Vec<Register>,
    instances: Vec<PeripheralInstance>,
}

impl PeripheralDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Registers in ascending offset order; aliases are adjacent.
    pub fn registers(&self) -> &[Register] {
        &self.registers
    }

    /// Instances in ascending address order.
    pub fn instances(&self) -> &[PeripheralInstance] {
        &self.instances
    }

    /// Size shared by all instances, if there are any.
    pub fn instance_size(&self) -> Option<u64> {
        self.instances.first().map(PeripheralInstance::size)
    }
}

//=============================================================================
// Device
//=============================================================================

/// Unvalidated device.
#[derive(Clone, Debug)]
pub struct RawDevice {
    pub part_number: String,
    pub cpu_name: String,
    pub peripherals: Vec<PeripheralDefinition>,
}

impl RawDevice {
    pub fn validate(self) -> Result<Device> {
        if self.part_number.is_empty() {
            return Err(Error::InvariantViolation(
                "Device is missing part number.".to_string(),
            ));
        }
        if self.cpu_name.is_empty() {
            return Err(Error::InvariantViolation(format!(
                "Device {} is missing CPU name.",
                self.part_number
            )));
        }
        Ok(Device {
            part_number: self.part_number,
            cpu_name: self.cpu_name,
            peripherals: self.peripherals,
        })
    }
}

/// Root of the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Device {
    part_number: String,
    cpu_name: String,
    peripherals: Vec<PeripheralDefinition>,
}

impl Device {
    pub fn part_number(&self) -> &str {
        &self.part_number
    }

    pub fn cpu_name(&self) -> &str {
        &self.cpu_name
    }

    /// Peripherals in ingestion order.
    pub fn peripherals(&self) -> &[PeripheralDefinition] {
        &self.peripherals
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    pub fn field(name: &str, bit_offset: i64, bit_width: i64) -> RegisterBitfield {
        RawBitfield {
            name: name.to_string(),
            description: format!("{name} field"),
            bit_offset,
            bit_width,
            rw_access: RwAccess::ReadWrite,
            reset_value: 0,
        }
        .validate()
        .unwrap()
    }

    pub fn register(
        name: &str,
        bit_width: i64,
        address_offset: i64,
        bitfields: Vec<RegisterBitfield>,
    ) -> Register {
        RawRegister {
            name: name.to_string(),
            description: format!("{name} register"),
            bit_width,
            address_offset,
            bitfields,
        }
        .validate()
        .unwrap()
    }

    pub fn instance(name: &str, index: Option<i64>, address: i64, size: i64) -> PeripheralInstance {
        RawInstance {
            name: name.to_string(),
            index,
            address,
            size,
        }
        .validate()
        .unwrap()
    }

    pub fn peripheral(
        name: &str,
        registers: Vec<Register>,
        instances: Vec<PeripheralInstance>,
    ) -> PeripheralDefinition {
        RawPeripheral {
            name: name.to_string(),
            description: format!("{name} peripheral"),
            registers,
            instances,
        }
        .validate()
        .unwrap()
    }
}

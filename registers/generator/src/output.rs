// Licensed under the Apache-2.0 license

//! C header generation from a validated [`Device`].
//!
//! ## Generated Header Structure
//!
//! ```text
//! #pragma once
//! #include ...                         // header block
//!
//! // TIMER registers.                   // one block per peripheral
//! typedef union { struct { ... }; uint32_t raw; } TimerCtlRegDef;
//! static_assert(sizeof(TimerCtlRegDef) == 4);
//! typedef struct { TimerCtlRegDef CTL; ... } TimerPeriphDef;
//! static_assert(sizeof(TimerPeriphDef) == 8);
//! static_assert(offsetof(TimerPeriphDef, CTL) == 0);
//!
//! // Peripheral instance definitions.   // trailing handle block
//! static volatile TimerPeriphDef *const TIMER0 = (volatile TimerPeriphDef *)0x40010000;
//! static volatile TimerPeriphDef *const TIMER[2] = { TIMER0, TIMER1, };
//! ```
//!
//! Output is a pure function of the model and the [`OutputConfig`].

use crate::config::OutputConfig;
use crate::layout::{plan_peripheral, plan_register, BitSlot, Member};
use crate::model::{Device, PeripheralDefinition, Register};
use crate::util::{c_type_from_bits, camel_case, hex_const, wrap_comment};

/// Name of the overlay type of `register`.
pub fn register_typedef(peripheral: &PeripheralDefinition, register: &Register) -> String {
    format!(
        "{}{}RegDef",
        camel_case(peripheral.name()),
        camel_case(register.name())
    )
}

/// Name of the struct type of `peripheral`.
pub fn peripheral_typedef(peripheral: &PeripheralDefinition) -> String {
    format!("{}PeriphDef", camel_case(peripheral.name()))
}

/// Generate the complete header for `device`.
pub fn generate_header(device: &Device, config: &OutputConfig) -> String {
    let mut blocks = vec![header_block(device, config)];
    blocks.extend(
        device
            .peripherals()
            .iter()
            .map(|p| peripheral_definition(p, config)),
    );
    blocks.push("// Peripheral instance definitions.".to_string());
    blocks.extend(
        device
            .peripherals()
            .iter()
            .map(|p| peripheral_instances(p, config))
            .filter(|block| !block.is_empty()),
    );

    let mut output = blocks.join("\n\n");
    output.push('\n');
    output
}

fn header_block(device: &Device, config: &OutputConfig) -> String {
    let mut lines: Vec<String> = config.banner.iter().map(|l| format!("// {l}")).collect();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.extend(
        [
            "#pragma once",
            "",
            "#include <assert.h>",
            "#include <stddef.h>",
            "#include <stdint.h>",
            "",
        ]
        .map(String::from),
    );
    lines.push(format!("// {} register definitions.", device.part_number()));
    lines.push(format!("// CPU: {}", device.cpu_name()));
    lines.join("\n")
}

/// Register overlays followed by the peripheral struct.
fn peripheral_definition(peripheral: &PeripheralDefinition, config: &OutputConfig) -> String {
    let mut blocks = vec![format!("// {} registers.", peripheral.name())];
    blocks.extend(
        peripheral
            .registers()
            .iter()
            .map(|r| register_definition(peripheral, r, config)),
    );
    blocks.push(peripheral_struct(peripheral, config));
    blocks.join("\n\n")
}

/// `typedef union` pairing the bitfield view with a raw integer view.
fn register_definition(
    peripheral: &PeripheralDefinition,
    register: &Register,
    config: &OutputConfig,
) -> String {
    let data_type = c_type_from_bits(register.bit_width());
    let typedef_name = register_typedef(peripheral, register);

    let mut lines = vec![format!(
        "// {} {} register definition.",
        peripheral.name().to_uppercase(),
        register.name().to_uppercase()
    )];
    lines.extend(wrap_comment(peripheral.description(), "", config.comment_width));
    lines.push("typedef union {".to_string());
    lines.push("  struct {".to_string());

    for slot in plan_register(register) {
        let bit_width = slot.bit_width();
        match slot {
            BitSlot::Unused { index, .. } => lines.push(format!(
                "    {data_type} unused{index} : {bit_width};  // Unused field."
            )),
            BitSlot::Field(field) => {
                lines.extend(wrap_comment(
                    field.description(),
                    "    ",
                    config.comment_width,
                ));
                lines.push(format!(
                    "    {data_type} {} : {bit_width};  // {}, reset: {}",
                    field.name().to_uppercase(),
                    field.rw_access().abbreviation(),
                    hex_const(field.reset_value())
                ));
            }
        }
    }

    lines.push("  };".to_string());
    lines.push(format!(
        "  {data_type} raw;  // Entire register as raw {data_type}."
    ));
    lines.push(format!("}} {typedef_name};"));
    lines.push(String::new());
    lines.push(format!(
        "static_assert(sizeof({typedef_name}) == {});",
        register.byte_width()
    ));
    lines.join("\n")
}

/// `typedef struct` with padding, alias unions and layout assertions.
fn peripheral_struct(peripheral: &PeripheralDefinition, config: &OutputConfig) -> String {
    let typedef_name = peripheral_typedef(peripheral);
    let layout = plan_peripheral(peripheral);

    let mut fields = Vec::new();
    let mut asserts = Vec::new();
    // With instances the plan is padded out to exactly the instance size.
    if peripheral.instance_size().is_some() {
        asserts.push(format!(
            "static_assert(sizeof({typedef_name}) == {});",
            layout.size
        ));
    }

    let mut push_register = |fields: &mut Vec<String>, register: &Register, indent: &str| {
        fields.extend(wrap_comment(
            register.description(),
            indent,
            config.comment_width,
        ));
        fields.push(format!(
            "{indent}{} {};",
            register_typedef(peripheral, register),
            register.name().to_uppercase()
        ));
        asserts.push(format!(
            "static_assert(offsetof({typedef_name}, {}) == {});",
            register.name().to_uppercase(),
            register.address_offset()
        ));
    };

    for member in &layout.members {
        match member {
            Member::Unused { index, size, .. } => fields.push(format!(
                "  uint8_t unused{index}[{size}];  // Unused address space."
            )),
            Member::Register(register) => push_register(&mut fields, *register, "  "),
            Member::Union(registers) => {
                fields.push("  union {".to_string());
                for &register in registers {
                    push_register(&mut fields, register, "    ");
                }
                fields.push("  };".to_string());
            }
        }
    }

    let mut lines = wrap_comment(peripheral.description(), "", config.comment_width);
    lines.push("typedef struct {".to_string());
    lines.extend(fields);
    lines.push(format!("}} {typedef_name};"));
    if !asserts.is_empty() {
        lines.push(String::new());
        lines.extend(asserts);
    }
    lines.join("\n")
}

/// Fixed-address handles, plus an indexed array when every instance has an
/// index and there is more than one.
fn peripheral_instances(peripheral: &PeripheralDefinition, config: &OutputConfig) -> String {
    let typedef_name = peripheral_typedef(peripheral);
    let comment = wrap_comment(peripheral.description(), "", config.comment_width);

    let mut blocks = Vec::new();
    let handles: Vec<String> = peripheral
        .instances()
        .iter()
        .flat_map(|inst| {
            comment.iter().cloned().chain(std::iter::once(format!(
                "static volatile {typedef_name} *const {} = (volatile {typedef_name} *){:#010x};",
                inst.name().to_uppercase(),
                inst.address()
            )))
        })
        .collect();
    if !handles.is_empty() {
        blocks.push(handles.join("\n"));
    }

    let indices: Option<Vec<u64>> = peripheral.instances().iter().map(|i| i.index()).collect();
    if let Some(indices) = indices.filter(|i| i.len() > 1) {
        let len = indices.iter().max().map_or(0, |max| max + 1);
        let mut slots = vec!["NULL".to_string(); len as usize];
        for (inst, index) in peripheral.instances().iter().zip(indices) {
            slots[index as usize] = inst.name().to_uppercase();
        }

        let mut lines = comment.clone();
        lines.push(format!(
            "static volatile {typedef_name} *const {}[{len}] = {{",
            peripheral.name().to_uppercase()
        ));
        lines.extend(slots.into_iter().map(|s| format!("    {s},")));
        lines.push("};".to_string());
        blocks.push(lines.join("\n"));
    }

    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_util::*;
    use crate::model::RawDevice;

    fn device(peripherals: Vec<PeripheralDefinition>) -> Device {
        RawDevice {
            part_number: "CC2652R1F".to_string(),
            cpu_name: "CM4".to_string(),
            peripherals,
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn test_typedef_names() {
        let p = peripheral("AON_RTC", vec![register("CHCTL", 32, 0, vec![])], vec![]);
        assert_eq!(peripheral_typedef(&p), "AonRtcPeriphDef");
        assert_eq!(register_typedef(&p, &p.registers()[0]), "AonRtcChctlRegDef");
    }

    #[test]
    fn test_register_overlay() {
        let p = peripheral("TIMER", vec![register("CTL", 32, 0, vec![field("EN", 0, 1)])], vec![]);
        let code = register_definition(&p, &p.registers()[0], &OutputConfig::default());
        let expected = "\
// TIMER CTL register definition.
// TIMER peripheral
typedef union {
  struct {
    // EN field
    uint32_t EN : 1;  // RW, reset: 0
    uint32_t unused0 : 31;  // Unused field.
  };
  uint32_t raw;  // Entire register as raw uint32_t.
} TimerCtlRegDef;

static_assert(sizeof(TimerCtlRegDef) == 4);";
        assert_eq!(code, expected);
    }

    #[test]
    fn test_peripheral_struct_back_to_back() {
        let p = peripheral(
            "TIMER",
            vec![register("CTL", 32, 0, vec![]), register("CNT", 32, 4, vec![])],
            vec![instance("TIMER0", Some(0), 0x4001_0000, 8)],
        );
        let code = peripheral_struct(&p, &OutputConfig::default());
        let expected = "\
// TIMER peripheral
typedef struct {
  // CTL register
  TimerCtlRegDef CTL;
  // CNT register
  TimerCntRegDef CNT;
} TimerPeriphDef;

static_assert(sizeof(TimerPeriphDef) == 8);
static_assert(offsetof(TimerPeriphDef, CTL) == 0);
static_assert(offsetof(TimerPeriphDef, CNT) == 4);";
        assert_eq!(code, expected);
        assert!(!code.contains("unused"));
    }

    #[test]
    fn test_peripheral_struct_union_and_padding() {
        let p = peripheral(
            "UART",
            vec![
                register("RX", 32, 0, vec![]),
                register("TX", 32, 0, vec![]),
                register("STAT", 32, 8, vec![]),
            ],
            vec![instance("UART0", Some(0), 0x4000_1000, 0x10)],
        );
        let code = peripheral_struct(&p, &OutputConfig::default());
        let expected = "\
// UART peripheral
typedef struct {
  union {
    // RX register
    UartRxRegDef RX;
    // TX register
    UartTxRegDef TX;
  };
  uint8_t unused0[4];  // Unused address space.
  // STAT register
  UartStatRegDef STAT;
  uint8_t unused1[4];  // Unused address space.
} UartPeriphDef;

static_assert(sizeof(UartPeriphDef) == 16);
static_assert(offsetof(UartPeriphDef, RX) == 0);
static_assert(offsetof(UartPeriphDef, TX) == 0);
static_assert(offsetof(UartPeriphDef, STAT) == 8);";
        assert_eq!(code, expected);
    }

    #[test]
    fn test_instance_handles_and_array() {
        let p = peripheral(
            "TIMER",
            vec![],
            vec![
                instance("TIMER2", Some(2), 0x4001_2000, 0x1000),
                instance("TIMER0", Some(0), 0x4001_0000, 0x1000),
            ],
        );
        let code = peripheral_instances(&p, &OutputConfig::default());
        let expected = "\
// TIMER peripheral
static volatile TimerPeriphDef *const TIMER0 = (volatile TimerPeriphDef *)0x40010000;
// TIMER peripheral
static volatile TimerPeriphDef *const TIMER2 = (volatile TimerPeriphDef *)0x40012000;

// TIMER peripheral
static volatile TimerPeriphDef *const TIMER[3] = {
    TIMER0,
    NULL,
    TIMER2,
};";
        assert_eq!(code, expected);
    }

    #[test]
    fn test_no_array_without_every_index() {
        let p = peripheral(
            "TIMER",
            vec![],
            vec![
                instance("TIMER0", Some(0), 0x4001_0000, 0x1000),
                instance("TIMER_ALT", None, 0x4001_1000, 0x1000),
            ],
        );
        let code = peripheral_instances(&p, &OutputConfig::default());
        assert!(code.contains("*const TIMER_ALT ="));
        assert!(!code.contains("TIMER["));

        let single = peripheral(
            "WDT",
            vec![],
            vec![instance("WDT0", Some(0), 0x4008_0000, 0x1000)],
        );
        let code = peripheral_instances(&single, &OutputConfig::default());
        assert!(!code.contains("WDT["));
    }

    #[test]
    fn test_header_ordering() {
        let d = device(vec![
            peripheral(
                "UART",
                vec![register("DR", 32, 0, vec![])],
                vec![instance("UART0", Some(0), 0x4000_1000, 4)],
            ),
            peripheral(
                "GPIO",
                vec![register("DOUT", 32, 0, vec![])],
                vec![instance("GPIO", None, 0x4002_2000, 4)],
            ),
        ]);
        let config = OutputConfig::new().add_banner_line("Generated file, do not edit.");
        let code = generate_header(&d, &config);

        assert!(code.starts_with("// Generated file, do not edit.\n\n#pragma once\n"));
        assert!(code.contains("// CC2652R1F register definitions.\n// CPU: CM4"));
        assert!(code.ends_with(";\n"));

        let pos = |needle: &str| code.find(needle).unwrap();
        assert!(pos("// UART registers.") < pos("// GPIO registers."));
        assert!(pos("} UartPeriphDef;") < pos("// GPIO registers."));
        assert!(pos("} GpioPeriphDef;") < pos("// Peripheral instance definitions."));
        assert!(pos("// Peripheral instance definitions.") < pos("*const UART0 ="));
        assert!(pos("*const UART0 =") < pos("*const GPIO ="));
    }

    #[test]
    fn test_comment_width() {
        let p = peripheral(
            "TIMER",
            vec![register("CTL", 8, 0, vec![])],
            vec![],
        );
        let code = register_definition(&p, &p.registers()[0], &OutputConfig::new().comment_width(12));
        assert!(code.contains("\n// TIMER\n// peripheral\n"));
    }
}

// Licensed under the Apache-2.0 license

//! Layout planning: turns declared positions into contiguous layouts.
//!
//! A register's bitfields only say where they sit; a C bit-packed struct
//! needs every bit accounted for, left to right. Likewise a peripheral's
//! registers only carry offsets, while a C struct places members one after
//! another. The planner fills the gaps with "unused" padding and merges
//! registers declared at the same offset into one union group.
//!
//! ```text
//! Register CTL (32 bits): EN @0..1, MODE @4..6
//!   → [EN:1] [unused0:3] [MODE:2] [unused1:26]
//!
//! Peripheral (size 0x10): CTL @0x0, RX @0x8, TX @0x8
//!   → [CTL:4] [unused0:4] [union{RX,TX}:4] [unused1:4]
//! ```

use crate::model::{PeripheralDefinition, Register, RegisterBitfield};
use log::warn;

/// One span of a register's bit plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitSlot<'a> {
    Field(&'a RegisterBitfield),
    Unused {
        index: usize,
        bit_offset: u64,
        bit_width: u64,
    },
}

impl BitSlot<'_> {
    #[cfg(test)]
    pub fn bit_offset(&self) -> u64 {
        match self {
            BitSlot::Field(field) => field.bit_offset(),
            BitSlot::Unused { bit_offset, .. } => *bit_offset,
        }
    }

    pub fn bit_width(&self) -> u64 {
        match self {
            BitSlot::Field(field) => field.bit_width(),
            BitSlot::Unused { bit_width, .. } => *bit_width,
        }
    }
}

/// Lays out `register`'s bitfields across its full width.
///
/// Declared fields appear in ascending offset order, with an `Unused` slot
/// for every gap (before the first field, between fields and after the last
/// one). The slot widths always sum to the register width.
pub fn plan_register(register: &Register) -> Vec<BitSlot<'_>> {
    let mut slots = Vec::with_capacity(register.bitfields().len() * 2 + 1);
    let mut cursor = 0;
    let mut unused = 0;

    for field in register.bitfields() {
        if field.bit_offset() > cursor {
            slots.push(BitSlot::Unused {
                index: unused,
                bit_offset: cursor,
                bit_width: field.bit_offset() - cursor,
            });
            unused += 1;
        }
        slots.push(BitSlot::Field(field));
        cursor = field.bit_end();
    }

    if cursor < register.bit_width() {
        slots.push(BitSlot::Unused {
            index: unused,
            bit_offset: cursor,
            bit_width: register.bit_width() - cursor,
        });
    }

    slots
}

/// One member of a peripheral's struct layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Member<'a> {
    Register(&'a Register),
    /// Registers sharing one offset, in declaration order.
    Union(Vec<&'a Register>),
    /// Padding bytes.
    Unused { index: usize, offset: u64, size: u64 },
}

impl Member<'_> {
    pub fn offset(&self) -> u64 {
        match self {
            Member::Register(register) => register.address_offset(),
            Member::Union(registers) => registers[0].address_offset(),
            Member::Unused { offset, .. } => *offset,
        }
    }

    /// Bytes the layout cursor advances past this member.
    ///
    /// A union advances by its first member's width, whatever the widths of
    /// the others.
    pub fn span(&self) -> u64 {
        match self {
            Member::Register(register) => register.byte_width(),
            Member::Union(registers) => registers[0].byte_width(),
            Member::Unused { size, .. } => *size,
        }
    }

    /// Registers carried by this member.
    pub fn registers(&self) -> &[&Register] {
        match self {
            Member::Register(register) => std::slice::from_ref(register),
            Member::Union(registers) => registers,
            Member::Unused { .. } => &[],
        }
    }

    /// False for a union whose members declare different widths.
    pub fn widths_agree(&self) -> bool {
        let registers = self.registers();
        registers
            .iter()
            .all(|r| r.bit_width() == registers[0].bit_width())
    }
}

/// Struct layout of one peripheral.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeripheralLayout<'a> {
    pub members: Vec<Member<'a>>,
    /// Cursor position after the last member.
    pub size: u64,
}

/// Groups consecutive registers with equal offsets. `registers` must be
/// sorted by offset.
fn group_by_offset(registers: &[Register]) -> Vec<Vec<&Register>> {
    let mut groups: Vec<Vec<&Register>> = Vec::new();
    for register in registers {
        match groups.last_mut() {
            Some(group) if group[0].address_offset() == register.address_offset() => {
                group.push(register);
            }
            _ => groups.push(vec![register]),
        }
    }
    groups
}

/// Lays out `peripheral`'s registers as consecutive struct members.
///
/// Padding is inserted from the running cursor up to each group's offset,
/// and after the last group up to the instance size when the peripheral has
/// instances.
pub fn plan_peripheral(peripheral: &PeripheralDefinition) -> PeripheralLayout<'_> {
    let mut members = Vec::new();
    let mut cursor = 0;
    let mut unused = 0;

    for group in group_by_offset(peripheral.registers()) {
        let member = if group.len() == 1 {
            Member::Register(group[0])
        } else {
            Member::Union(group)
        };
        let offset = member.offset();
        if offset > cursor {
            members.push(Member::Unused {
                index: unused,
                offset: cursor,
                size: offset - cursor,
            });
            unused += 1;
        } else if offset < cursor {
            warn!(
                "{}: register {} at {:#x} overlaps the previous member ending at {:#x}",
                peripheral.name(),
                member.registers()[0].name(),
                offset,
                cursor
            );
        }

        if !member.widths_agree() {
            warn!(
                "{}: registers aliased at {:#x} differ in width; layout advances by {} bytes",
                peripheral.name(),
                offset,
                member.span()
            );
        }
        cursor = offset + member.span();
        members.push(member);
    }

    if let Some(size) = peripheral.instance_size() {
        if size > cursor {
            members.push(Member::Unused {
                index: unused,
                offset: cursor,
                size: size - cursor,
            });
            cursor = size;
        }
    }

    PeripheralLayout {
        members,
        size: cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_util::*;

    #[test]
    fn test_single_field_register() {
        let reg = register("CTL", 32, 0, vec![field("EN", 0, 1)]);
        let plan = plan_register(&reg);
        assert_eq!(plan.len(), 2);
        assert!(matches!(plan[0], BitSlot::Field(f) if f.name() == "EN"));
        assert_eq!(
            plan[1],
            BitSlot::Unused {
                index: 0,
                bit_offset: 1,
                bit_width: 31
            }
        );
    }

    #[test]
    fn test_gaps_everywhere() {
        let reg = register(
            "CTL",
            16,
            0,
            vec![field("B", 8, 2), field("A", 2, 3)],
        );
        let widths: Vec<_> = plan_register(&reg).iter().map(BitSlot::bit_width).collect();
        assert_eq!(widths, [2, 3, 3, 2, 6]);
        let unused: Vec<_> = plan_register(&reg)
            .into_iter()
            .filter_map(|s| match s {
                BitSlot::Unused { index, .. } => Some(index),
                BitSlot::Field(_) => None,
            })
            .collect();
        assert_eq!(unused, [0, 1, 2]);
    }

    #[test]
    fn test_register_without_fields() {
        let reg = register("DATA", 8, 0, vec![]);
        assert_eq!(
            plan_register(&reg),
            [BitSlot::Unused {
                index: 0,
                bit_offset: 0,
                bit_width: 8
            }]
        );
    }

    #[test]
    fn test_bit_plan_covers_register_exactly() {
        let cases = [
            register("A", 8, 0, vec![field("X", 0, 8)]),
            register("B", 32, 0, vec![field("X", 31, 1)]),
            register("C", 64, 0, vec![field("X", 3, 5), field("Y", 40, 20)]),
            register("D", 16, 0, vec![field("X", 0, 1), field("Y", 1, 1), field("Z", 15, 1)]),
        ];
        for reg in &cases {
            let plan = plan_register(reg);
            let total: u64 = plan.iter().map(BitSlot::bit_width).sum();
            assert_eq!(total, reg.bit_width(), "{}", reg.name());
            let mut cursor = 0;
            for slot in &plan {
                assert_eq!(slot.bit_offset(), cursor, "{}", reg.name());
                cursor += slot.bit_width();
            }
        }
    }

    #[test]
    fn test_back_to_back_registers() {
        let p = peripheral(
            "TIMER",
            vec![register("CTL", 32, 0, vec![]), register("CNT", 32, 4, vec![])],
            vec![instance("TIMER0", Some(0), 0x4000_0000, 8)],
        );
        let layout = plan_peripheral(&p);
        assert_eq!(layout.size, 8);
        assert_eq!(layout.members.len(), 2);
        assert!(layout
            .members
            .iter()
            .all(|m| !matches!(m, Member::Unused { .. })));
        let offsets: Vec<_> = layout.members.iter().map(Member::offset).collect();
        assert_eq!(offsets, [0, 4]);
    }

    #[test]
    fn test_aliased_registers_form_one_union() {
        let p = peripheral(
            "UART",
            vec![register("RX", 32, 0, vec![]), register("TX", 32, 0, vec![])],
            vec![instance("UART0", Some(0), 0x4000_1000, 4)],
        );
        let layout = plan_peripheral(&p);
        assert_eq!(layout.members.len(), 1);
        let Member::Union(group) = &layout.members[0] else {
            panic!("expected a union, got {:?}", layout.members[0]);
        };
        let names: Vec<_> = group.iter().map(|r| r.name()).collect();
        assert_eq!(names, ["RX", "TX"]);
        assert_eq!(layout.members[0].span(), 4);
        assert_eq!(layout.size, 4);
    }

    #[test]
    fn test_padding_between_and_after() {
        let p = peripheral(
            "GPIO",
            vec![
                register("DOUT", 8, 1, vec![]),
                register("DIN", 32, 8, vec![]),
                register("DIR", 16, 14, vec![]),
            ],
            vec![instance("GPIO", None, 0x4002_2000, 0x20)],
        );
        let layout = plan_peripheral(&p);
        let spans: Vec<_> = layout
            .members
            .iter()
            .map(|m| (m.offset(), m.span()))
            .collect();
        assert_eq!(
            spans,
            [(0, 1), (1, 1), (2, 6), (8, 4), (12, 2), (14, 2), (16, 16)]
        );
        let indices: Vec<_> = layout
            .members
            .iter()
            .filter_map(|m| match m {
                Member::Unused { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, [0, 1, 2, 3]);
    }

    #[test]
    fn test_member_spans_sum_to_instance_size() {
        let peripherals = [
            peripheral(
                "A",
                vec![register("X", 32, 0x10, vec![])],
                vec![instance("A0", None, 0, 0x400)],
            ),
            peripheral(
                "B",
                vec![
                    register("X", 64, 0, vec![]),
                    register("Y", 64, 0, vec![]),
                    register("Z", 8, 0x3ff, vec![]),
                ],
                vec![instance("B0", None, 0, 0x400)],
            ),
            peripheral("C", vec![], vec![instance("C0", None, 0, 0x10)]),
        ];
        for p in &peripherals {
            let layout = plan_peripheral(p);
            let total: u64 = layout.members.iter().map(Member::span).sum();
            assert_eq!(Some(total), p.instance_size(), "{}", p.name());
            assert_eq!(Some(layout.size), p.instance_size());
        }
    }

    #[test]
    fn test_no_trailing_padding_without_instances() {
        let p = peripheral("A", vec![register("X", 32, 4, vec![])], vec![]);
        let layout = plan_peripheral(&p);
        assert_eq!(layout.members.len(), 2);
        assert_eq!(layout.size, 8);
    }

    /// Aliased registers of different widths: the cursor only advances by
    /// the first member's width, so the planned size no longer matches the
    /// storage a C union of both would occupy.
    #[test]
    fn test_mismatched_union_advances_by_first_member() {
        let p = peripheral(
            "ADC",
            vec![register("LO", 32, 0, vec![]), register("FULL", 64, 0, vec![])],
            vec![instance("ADC", None, 0x4003_0000, 8)],
        );
        let layout = plan_peripheral(&p);
        let union = &layout.members[0];
        assert!(!union.widths_agree());
        assert_eq!(union.span(), 4);

        let widest = union
            .registers()
            .iter()
            .map(|r| r.byte_width())
            .max()
            .unwrap();
        assert_eq!(widest, 8);
        assert_ne!(union.span(), widest);

        // Planned bytes still add up to the instance size.
        assert_eq!(
            layout.members[1],
            Member::Unused {
                index: 0,
                offset: 4,
                size: 4
            }
        );
        assert_eq!(layout.size, 8);
    }

    #[test]
    fn test_union_widths_agree() {
        let p = peripheral(
            "UART",
            vec![register("RX", 16, 0, vec![]), register("TX", 16, 0, vec![])],
            vec![],
        );
        let layout = plan_peripheral(&p);
        assert!(layout.members.iter().all(Member::widths_agree));
    }
}

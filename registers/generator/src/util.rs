// Licensed under the Apache-2.0 license

//! Name conversion and formatting helpers for C code generation.

/// Converts a description name into a type-name fragment.
///
/// Words are split on `_` and spaces. An all-upper-case word becomes a
/// single capitalized token, any other word only has its first character
/// upper-cased.
///
/// # Examples
/// ```
/// use registers_generator::util::camel_case;
/// assert_eq!(camel_case("AON_BATMON"), "AonBatmon");
/// assert_eq!(camel_case("I2C0"), "I2c0");
/// assert_eq!(camel_case("myCoolTimer"), "MyCoolTimer");
/// ```
pub fn camel_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    for word in name.split(['_', ' ']) {
        let mut chars = word.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        result.extend(first.to_uppercase());
        if is_upper_word(word) {
            result.extend(chars.flat_map(char::to_lowercase));
        } else {
            result.push_str(chars.as_str());
        }
    }
    result
}

/// True if `word` has at least one cased character and none in lower case.
fn is_upper_word(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && !word.chars().any(char::is_lowercase)
}

/// C storage type for a register of `bit_width` bits.
pub fn c_type_from_bits(bit_width: u64) -> &'static str {
    match bit_width {
        0..=8 => "uint8_t",
        9..=16 => "uint16_t",
        17..=32 => "uint32_t",
        _ => "uint64_t",
    }
}

/// Formats an integer as a hex constant with underscores for readability.
///
/// Values <= 9 are formatted as decimal; larger values use hex with
/// underscore separators every 4 digits.
///
/// # Examples
/// ```
/// use registers_generator::util::hex_const;
/// assert_eq!(hex_const(5), "5");
/// assert_eq!(hex_const(0x1234), "0x1234");
/// assert_eq!(hex_const(0x12345678), "0x1234_5678");
/// ```
pub fn hex_const(val: u64) -> String {
    if val > 9 {
        let mut x = String::new();
        for (i, c) in format!("{val:x}").chars().rev().enumerate() {
            if i % 4 == 0 && i != 0 {
                x.push('_');
            }
            x.push(c);
        }
        "0x".to_string() + &x.chars().rev().collect::<String>()
    } else {
        format!("{val}")
    }
}

/// Wraps `text` into `// ` comment lines no wider than `width` columns
/// (including `indent`).
///
/// Whitespace is collapsed and the first letter of the text is capitalized. Empty text
/// produces no lines. A single word longer than the available space gets a
/// line of its own.
pub fn wrap_comment(text: &str, indent: &str, width: usize) -> Vec<String> {
    let prefix = format!("{indent}// ");
    let text = capitalize_sentence(text.trim());
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && prefix.len() + line.len() + 1 + word.len() > width {
            lines.push(format!("{prefix}{line}"));
            line.clear();
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(format!("{prefix}{line}"));
    }
    lines
}

fn capitalize_sentence(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("TIMER"), "Timer");
        assert_eq!(camel_case("AON_RTC"), "AonRtc");
        assert_eq!(camel_case("CPU_SCS"), "CpuScs");
        assert_eq!(camel_case("gpt_Ctl"), "GptCtl");
        assert_eq!(camel_case("Sys Ctrl"), "SysCtrl");
        assert_eq!(camel_case("2D_GFX"), "2dGfx");
        assert_eq!(camel_case("123"), "123");
        assert_eq!(camel_case("A__B"), "AB");
        assert_eq!(camel_case(""), "");
    }

    #[test]
    fn test_c_type_from_bits() {
        assert_eq!(c_type_from_bits(8), "uint8_t");
        assert_eq!(c_type_from_bits(16), "uint16_t");
        assert_eq!(c_type_from_bits(32), "uint32_t");
        assert_eq!(c_type_from_bits(64), "uint64_t");
    }

    #[test]
    fn test_hex_const() {
        assert_eq!(hex_const(0), "0");
        assert_eq!(hex_const(9), "9");
        assert_eq!(hex_const(10), "0xa");
        assert_eq!(hex_const(0x12345678), "0x1234_5678");
    }

    #[test]
    fn test_wrap_comment() {
        assert_eq!(wrap_comment("enable the  timer", "", 100), ["// Enable the timer"]);
        assert!(wrap_comment("   ", "  ", 100).is_empty());

        let lines = wrap_comment("aaa bbb ccc ddd", "  ", 13);
        assert_eq!(lines, ["  // Aaa bbb", "  // ccc ddd"]);
        assert!(lines.iter().all(|l| l.len() <= 13));

        let lines = wrap_comment("x averyveryverylongword y", "", 10);
        assert_eq!(lines, ["// X", "// averyveryverylongword", "// y"]);
    }
}

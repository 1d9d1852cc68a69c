const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Appends `value` as a quoted JSON string with JCS escaping.
pub(crate) fn write_string(out: &mut String, value: &str) {
    out.reserve(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{0c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => {
                let code = c as usize;
                out.push_str("\\u00");
                out.push(char::from(HEX_DIGITS[code >> 4]));
                out.push(char::from(HEX_DIGITS[code & 0xf]));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(value: &str) -> String {
        let mut out = String::new();
        write_string(&mut out, value);
        out
    }

    #[test]
    fn it_uses_short_escapes_where_json_has_them() {
        assert_eq!(render("\u{08}\t\n\u{0c}\r"), r#""\b\t\n\f\r""#);
    }

    #[test]
    fn it_escapes_other_control_characters_as_lowercase_hex() {
        assert_eq!(render("\u{00}\u{0f}\u{1f}"), r#""\u0000\u000f\u001f""#);
    }

    #[test]
    fn it_escapes_quote_and_backslash_only() {
        assert_eq!(render(r#"a"b\c/d"#), r#""a\"b\\c/d""#);
    }

    #[test]
    fn it_leaves_delete_and_c1_controls_unescaped() {
        assert_eq!(render("\u{7f}\u{80}\u{9f}"), "\"\u{7f}\u{80}\u{9f}\"");
    }

    #[test]
    fn it_emits_non_ascii_as_utf8() {
        assert_eq!(render("€ö😀"), "\"€ö😀\"");
    }
}

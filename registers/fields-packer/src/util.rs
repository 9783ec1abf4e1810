// Licensed under the Apache-2.0 license

//! Helpers for wrapping generated C headers.

/// Include guard macro for a header file name.
///
/// Every character that cannot appear in a C identifier becomes `_`.
///
/// # Examples
/// ```
/// use fields_packer::util::guard_flag;
/// assert_eq!(guard_flag("reg_all.h"), "__REG_ALL_H__");
/// assert_eq!(guard_flag("reg-accessor.h"), "__REG_ACCESSOR_H__");
/// ```
pub fn guard_flag(header_name: &str) -> String {
    let mut flag = String::from("__");
    for c in header_name.chars() {
        if c.is_ascii_alphanumeric() {
            flag.push(c.to_ascii_uppercase());
        } else {
            flag.push('_');
        }
    }
    flag.push_str("__");
    flag
}

/// Opening and closing lines of an include guard for `header_name`.
///
/// # Examples
/// ```
/// use fields_packer::util::once_only_header;
/// let (head, tail) = once_only_header("reg_all.h");
/// assert_eq!(head, "#ifndef __REG_ALL_H__\n#define __REG_ALL_H__");
/// assert_eq!(tail, "#endif /* __REG_ALL_H__ */");
/// ```
pub fn once_only_header(header_name: &str) -> (String, String) {
    let flag = guard_flag(header_name);
    (
        format!("#ifndef {flag}\n#define {flag}"),
        format!("#endif /* {flag} */"),
    )
}

/// `code` wrapped in an include guard, one newline between each part.
pub fn with_header_guard(header_name: &str, code: &str) -> String {
    let (head, tail) = once_only_header(header_name);
    [head.as_str(), code, tail.as_str()].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_flag() {
        assert_eq!(guard_flag("reg_accessor.h"), "__REG_ACCESSOR_H__");
        assert_eq!(guard_flag("Regs.v2.h"), "__REGS_V2_H__");
    }

    #[test]
    fn test_with_header_guard() {
        assert_eq!(
            with_header_guard("a.h", "int x;"),
            "#ifndef __A_H__\n#define __A_H__\nint x;\n#endif /* __A_H__ */"
        );
    }
}

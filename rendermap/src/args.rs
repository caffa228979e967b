//! Runtime input argument scanning.
//!
//! The runtime hands every component the same raw argument list. Each
//! component picks out the flags it understands and leaves everything else
//! alone, so unknown flags always pass through untouched.
//!
//! Flag values use C `atoi` semantics: leading whitespace, an optional sign
//! and leading digits. Anything unparsable yields 0.

/// Returns the value following each occurrence of one of `flags`.
///
/// A recognised flag consumes the next argument as its value. A recognised
/// flag in the last position has no value and is skipped.
///
/// # Example
///
/// ```
/// use rendermap::args::flag_values;
///
/// let args: Vec<String> = ["-n", "64", "-x", "-p", "2"].iter().map(|s| s.to_string()).collect();
/// let found: Vec<_> = flag_values(&args, &["-n", "-p"]).collect();
/// assert_eq!(found, vec![("-n", "64"), ("-p", "2")]);
/// ```
pub fn flag_values<'a>(
    args: &'a [String],
    flags: &'a [&'a str],
) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    let mut i = 0;
    std::iter::from_fn(move || {
        while i < args.len() {
            let arg = args[i].as_str();
            i += 1;
            if let Some(flag) = flags.iter().find(|f| **f == arg) {
                if i < args.len() {
                    let value = args[i].as_str();
                    i += 1;
                    return Some((*flag, value));
                }
            }
        }
        None
    })
}

/// Parses an integer the way C `atoi` does, saturating on overflow.
pub fn atoi(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(b - b'0');
        value = value.saturating_mul(10).saturating_add(digit);
    }

    if negative {
        -value
    } else {
        value
    }
}

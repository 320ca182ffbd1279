use std::path::{Path, PathBuf};

/// `<dir>/<stem>.<ext>` -> `<dir>/<stem>-<suffix>.csv`
pub fn output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    input.with_file_name(format!("{}-{}.csv", stem, suffix))
}

/// Format a float the way the exported tables have always looked:
/// shortest round-trip digits (exact ties go to the even digit), integral
/// values keep a `.0`, and very large or very small magnitudes switch to
/// `1e-05` / `1.5e+16` notation.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0.0".to_string() } else { "0.0".to_string() };
    }

    let mut buffer = ryu::Buffer::new();
    let (digits, exp) = shortest_digits(buffer.format_finite(v.abs()));
    let sign = if v < 0.0 { "-" } else { "" };

    if (-4..16).contains(&exp) {
        if exp < 0 {
            let zeros = "0".repeat((-exp - 1) as usize);
            format!("{sign}0.{zeros}{digits}")
        } else {
            let int_len = exp as usize + 1;
            if digits.len() <= int_len {
                let zeros = "0".repeat(int_len - digits.len());
                format!("{sign}{digits}{zeros}.0")
            } else {
                format!("{sign}{}.{}", &digits[..int_len], &digits[int_len..])
            }
        }
    } else {
        let mantissa = match digits.len() {
            1 => digits.clone(),
            _ => format!("{}.{}", &digits[..1], &digits[1..]),
        };
        let exp_sign = if exp < 0 { '-' } else { '+' };
        format!("{sign}{mantissa}e{exp_sign}{:02}", exp.abs())
    }
}

/// Split a positive ryu rendering (`940.6143188476562`, `1e16`, `1.5e-7`)
/// into significant digits and the exponent of the leading digit.
fn shortest_digits(rendered: &str) -> (String, i32) {
    let (mantissa, exp) = match rendered.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (rendered, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all: String = int_part.chars().chain(frac_part.chars()).collect();

    let leading = all.len() - all.trim_start_matches('0').len();
    let digits = all.trim_start_matches('0').trim_end_matches('0').to_string();
    let lead_exp = int_part.len() as i32 - leading as i32 - 1 + exp;
    (digits, lead_exp)
}

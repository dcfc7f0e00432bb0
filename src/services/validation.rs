//! Input rules shared by the stores and the request models.
//!
//! Messages mirror the field-level errors clients already expect:
//! `{"field": ["message"]}`.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::web::error::AppError;

pub const NAME_MAX_LEN: usize = 255;
pub const TITLE_MAX_LEN: usize = 255;
pub const PASSWORD_MIN_LEN: usize = 5;

const PRICE_DECIMAL_PLACES: u32 = 2;
const PRICE_MAX_DIGITS: u32 = 5;

pub const REQUIRED: &str = "This field is required.";

/// Trims and checks a required text field.
pub fn text_value(value: Option<&str>, max_len: usize) -> Result<String, String> {
    let value = value.ok_or_else(|| REQUIRED.to_string())?.trim();
    if value.is_empty() {
        return Err("This field may not be blank.".to_string());
    }
    if value.chars().count() > max_len {
        return Err(format!(
            "Ensure this field has no more than {max_len} characters."
        ));
    }
    Ok(value.to_string())
}

pub fn require_text(field: &str, value: Option<&str>, max_len: usize) -> Result<String, AppError> {
    text_value(value, max_len).map_err(|msg| AppError::validation(field, msg))
}

/// Lowercases the whole address, local part included.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn email_value(raw: Option<&str>) -> Result<String, String> {
    let email = normalize_email(raw.ok_or_else(|| REQUIRED.to_string())?);
    if email.is_empty() {
        return Err("This field may not be blank.".to_string());
    }
    if !is_valid_email(&email) {
        return Err("Enter a valid email address.".to_string());
    }
    Ok(email)
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    if domain == "localhost" {
        return true;
    }
    domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

pub fn password_value(raw: Option<&str>) -> Result<String, String> {
    let password = raw.ok_or_else(|| REQUIRED.to_string())?;
    if password.is_empty() {
        return Err("This field may not be blank.".to_string());
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(format!(
            "Ensure this field has at least {PASSWORD_MIN_LEN} characters."
        ));
    }
    Ok(password.to_string())
}

/// Accepts a JSON number or numeric string with at most two decimals and
/// three integer digits. The result always carries two decimal places.
pub fn price_value(raw: Option<&Value>) -> Result<Decimal, String> {
    let invalid = || "A valid number is required.".to_string();
    let parsed = match raw {
        None | Some(Value::Null) => return Err(REQUIRED.to_string()),
        Some(Value::Number(n)) => {
            let text = n.to_string();
            Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text))
        }
        Some(Value::String(s)) => {
            let text = s.trim();
            if !is_plain_decimal(text) {
                return Err(invalid());
            }
            Decimal::from_str(text)
        }
        Some(_) => return Err(invalid()),
    };

    let mut price = parsed.map_err(|_| invalid())?.normalize();

    if price.scale() > PRICE_DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."
        ));
    }
    let max_integer_digits = PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES;
    if price.abs().trunc() >= Decimal::from(10_i64.pow(max_integer_digits)) {
        return Err(format!(
            "Ensure that there are no more than {max_integer_digits} digits before the decimal point."
        ));
    }

    price.rescale(PRICE_DECIMAL_PLACES);
    Ok(price)
}

/// An optional leading `-`, then digits with at most one `.`.
fn is_plain_decimal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    !(whole.is_empty() && fraction.is_empty())
        && whole.chars().all(|c| c.is_ascii_digit())
        && fraction.chars().all(|c| c.is_ascii_digit())
}

/// Accepts a non-negative JSON integer or integer string.
pub fn minutes_value(raw: Option<&Value>) -> Result<i32, String> {
    let invalid = || "A valid integer is required.".to_string();
    let minutes = match raw {
        None | Some(Value::Null) => return Err(REQUIRED.to_string()),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(invalid)?,
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid())?,
        Some(_) => return Err(invalid()),
    };
    if minutes < 0 {
        return Err("Ensure this value is greater than or equal to 0.".to_string());
    }
    i32::try_from(minutes).map_err(|_| "Ensure this value is less than or equal to 2147483647.".to_string())
}

/// Parses a comma-separated id list such as `1,2,3`. Empty segments are skipped.
pub fn parse_id_list(field: &str, raw: &str) -> Result<Vec<i32>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i32>()
                .map_err(|_| AppError::validation(field, format!("'{s}' is not a valid id.")))
        })
        .collect()
}

/// Integer flag: absent or `0` is false, any other integer is true.
pub fn parse_flag(field: &str, raw: Option<&str>) -> Result<bool, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(false),
        Some(s) => s
            .parse::<i64>()
            .map(|v| v != 0)
            .map_err(|_| AppError::validation(field, "A valid integer is required.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_value() {
        assert_eq!(text_value(Some("  Vegan "), 255).unwrap(), "Vegan");
        assert_eq!(text_value(None, 255).unwrap_err(), REQUIRED);
        assert!(text_value(Some("   "), 255).unwrap_err().contains("blank"));
        assert!(text_value(Some("abcdef"), 5).unwrap_err().contains("no more than 5"));
    }

    #[test]
    fn test_email_normalization() {
        assert_eq!(email_value(Some("A@B.COM")).unwrap(), "a@b.com");
        assert_eq!(
            email_value(Some(" joshua@RAVENOURS.com ")).unwrap(),
            "joshua@ravenours.com"
        );
        assert_eq!(email_value(Some("admin@localhost")).unwrap(), "admin@localhost");
        assert_eq!(email_value(None).unwrap_err(), REQUIRED);
        assert!(email_value(Some("")).is_err());
        assert!(email_value(Some("one")).is_err());
        assert!(email_value(Some("a@b")).is_err());
        assert!(email_value(Some("a@@b.com")).is_err());
        assert!(email_value(Some("a b@c.com")).is_err());
    }

    #[test]
    fn test_password_value() {
        assert!(password_value(Some("pw")).is_err());
        assert!(password_value(Some("")).is_err());
        assert_eq!(password_value(Some("Signup!23")).unwrap(), "Signup!23");
    }

    #[test]
    fn test_price_value() {
        assert_eq!(price_value(Some(&json!(20.00))).unwrap().to_string(), "20.00");
        assert_eq!(price_value(Some(&json!(5))).unwrap().to_string(), "5.00");
        assert_eq!(price_value(Some(&json!("5.5"))).unwrap().to_string(), "5.50");
        assert_eq!(price_value(Some(&json!("999.99"))).unwrap().to_string(), "999.99");
        assert!(price_value(Some(&json!("1000"))).unwrap_err().contains("3 digits"));
        assert!(price_value(Some(&json!(1.234))).unwrap_err().contains("2 decimal"));
        assert!(price_value(Some(&json!("abc"))).is_err());
        assert!(price_value(Some(&json!(true))).is_err());
        assert!(price_value(Some(&json!("1_0"))).is_err());
        assert!(price_value(Some(&json!("1e2"))).is_err());
        assert!(price_value(Some(&json!("5.0.0"))).is_err());
        assert!(price_value(Some(&json!("."))).is_err());
        assert_eq!(price_value(None).unwrap_err(), REQUIRED);
    }

    #[test]
    fn test_minutes_value() {
        assert_eq!(minutes_value(Some(&json!(60))).unwrap(), 60);
        assert_eq!(minutes_value(Some(&json!("15"))).unwrap(), 15);
        assert!(minutes_value(Some(&json!(-1))).is_err());
        assert!(minutes_value(Some(&json!(1.5))).is_err());
        assert!(minutes_value(Some(&json!(i64::MAX))).is_err());
        assert_eq!(minutes_value(Some(&Value::Null)).unwrap_err(), REQUIRED);
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("tags", "1,2, 3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list("tags", "4,").unwrap(), vec![4]);
        assert!(parse_id_list("tags", "").unwrap().is_empty());
        assert!(matches!(
            parse_id_list("tags", "1,x"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_flag() {
        assert!(!parse_flag("assigned_only", None).unwrap());
        assert!(!parse_flag("assigned_only", Some("0")).unwrap());
        assert!(parse_flag("assigned_only", Some("1")).unwrap());
        assert!(parse_flag("assigned_only", Some("yes")).is_err());
    }
}

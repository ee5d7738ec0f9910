// 金额换算工具函数
// 内部金额统一为最小货币单位 (分), 仅在边界处与主单位互转

use anyhow::{Context, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// 主单位十进制字符串转最小单位 (如 "9.99" -> 999)
///
/// 渠道上报的主单位金额最多两位小数, 更高精度视为非法输入。
pub fn major_str_to_minor(value: &str) -> Result<i64> {
    let decimal = Decimal::from_str(value.trim())
        .with_context(|| format!("Invalid amount string: {}", value))?;
    major_to_minor(decimal)
}

/// 主单位金额转最小单位
pub fn major_to_minor(amount: Decimal) -> Result<i64> {
    if amount <= Decimal::ZERO {
        anyhow::bail!("Amount must be positive");
    }
    if amount.scale() > 2 {
        anyhow::bail!("Amount precision exceeds minor unit (max 2 decimal places)");
    }
    let minor = amount * Decimal::from(100);
    minor
        .trunc()
        .to_i64()
        .context("Amount out of range for minor units")
}

/// 最小单位转主单位 (500分 -> 5.00元)
pub fn minor_to_major(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// 解析整数最小单位字符串 (微信 total_fee / Stripe amount_total 语义)
pub fn minor_str_to_minor(value: &str) -> Result<i64> {
    let minor: i64 = value
        .trim()
        .parse()
        .with_context(|| format!("Invalid minor-unit amount: {}", value))?;
    if minor <= 0 {
        anyhow::bail!("Amount must be positive");
    }
    Ok(minor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_major_str_to_minor() {
        assert_eq!(major_str_to_minor("9.99").unwrap(), 999);
        assert_eq!(major_str_to_minor("5").unwrap(), 500);
        assert_eq!(major_str_to_minor("0.01").unwrap(), 1);
        assert_eq!(major_str_to_minor(" 12.30 ").unwrap(), 1230);
    }

    #[test]
    fn test_major_str_to_minor_rejects_bad_input() {
        assert!(major_str_to_minor("abc").is_err());
        assert!(major_str_to_minor("0").is_err());
        assert!(major_str_to_minor("-1.00").is_err());
        // 超过两位小数
        assert!(major_str_to_minor("1.999").is_err());
    }

    #[test]
    fn test_minor_to_major() {
        assert_eq!(minor_to_major(500), Decimal::new(500, 2));
        assert_eq!(minor_to_major(500).to_string(), "5.00");
        assert_eq!(minor_to_major(999).to_string(), "9.99");
    }

    #[test]
    fn test_minor_str_to_minor() {
        assert_eq!(minor_str_to_minor("500").unwrap(), 500);
        assert!(minor_str_to_minor("0").is_err());
        assert!(minor_str_to_minor("-5").is_err());
        assert!(minor_str_to_minor("5.5").is_err());
    }

    #[test]
    fn test_roundtrip() {
        let minor = major_to_minor(Decimal::new(999, 2)).unwrap();
        assert_eq!(minor, 999);
        assert_eq!(minor_to_major(minor), Decimal::new(999, 2));
    }
}

// 渠道验签工具函数
// 微信MD5签名、支付宝RSA2验签、Stripe HMAC签名校验

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha2::Sha256;
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// 计算微信支付签名
///
/// 规则: 排除 `sign` 与空值字段, 按键名升序拼接 `key=value` 对,
/// 末尾追加 `&key=<商户密钥>`, 取MD5大写十六进制。
/// 字段使用 BTreeMap 天然有序。
pub fn wechat_sign(fields: &BTreeMap<String, String>, api_key: &str) -> String {
    let joined = fields
        .iter()
        .filter(|(key, value)| key.as_str() != "sign" && !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");
    let payload = format!("{}&key={}", joined, api_key);

    let digest = Md5::digest(payload.as_bytes());
    hex::encode(digest).to_uppercase()
}

/// 验证微信支付回调签名
pub fn verify_wechat_sign(fields: &BTreeMap<String, String>, api_key: &str) -> bool {
    let received = match fields.get("sign") {
        Some(sign) if !sign.is_empty() => sign,
        _ => return false,
    };
    let expected = wechat_sign(fields, api_key);
    constant_time_eq(&expected, received)
}

/// 构造支付宝待签名串
///
/// 排除 `sign` 与 `sign_type`, 按键名升序拼接 `key=value` 对。
pub fn alipay_canonical_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .filter(|(key, _)| key.as_str() != "sign" && key.as_str() != "sign_type")
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// 解析支付宝公钥
///
/// 支付宝开放平台给出的可能是裸base64, 也可能是PEM;
/// PKCS#8 与 PKCS#1 两种封装都接受。
pub fn parse_rsa_public_key(key: &str) -> Result<RsaPublicKey> {
    let trimmed = key.trim();
    let pem = if trimmed.contains("-----BEGIN") {
        trimmed.to_string()
    } else {
        wrap_public_key_pem(trimmed)
    };

    if let Ok(parsed) = RsaPublicKey::from_public_key_pem(&pem) {
        return Ok(parsed);
    }
    RsaPublicKey::from_pkcs1_pem(&pem).context("Invalid RSA public key")
}

/// 把裸base64公钥包装为PEM格式
fn wrap_public_key_pem(base64_body: &str) -> String {
    let body: String = base64_body
        .split_whitespace()
        .collect::<String>()
        .as_bytes()
        .chunks(64)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n");
    format!("-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----\n", body)
}

/// 验证支付宝RSA2 (SHA-256) 回调签名
///
/// `sign` 字段为base64编码的PKCS#1 v1.5签名, 签名对象是待签名串。
pub fn verify_alipay_sign(
    fields: &BTreeMap<String, String>,
    public_key: &RsaPublicKey,
) -> Result<bool> {
    let sign = match fields.get("sign") {
        Some(sign) if !sign.is_empty() => sign,
        _ => return Ok(false),
    };
    let sign_bytes = BASE64
        .decode(sign.as_bytes())
        .context("Alipay sign is not valid base64")?;
    let signature = match Signature::try_from(sign_bytes.as_slice()) {
        Ok(signature) => signature,
        Err(_) => return Ok(false),
    };

    let canonical = alipay_canonical_string(fields);
    let verifying_key = VerifyingKey::<Sha256>::new(public_key.clone());
    Ok(verifying_key.verify(canonical.as_bytes(), &signature).is_ok())
}

/// 解析后的 `stripe-signature` 请求头
#[derive(Debug)]
pub struct StripeSignature {
    /// 签名时间戳 (Unix秒)
    pub timestamp: i64,
    /// v1签名列表 (密钥轮换期间可能有多个)
    pub v1: Vec<String>,
}

/// 解析 `stripe-signature` 请求头 (`t=...,v1=...,v1=...`)
pub fn parse_stripe_signature(header: &str) -> Result<StripeSignature> {
    let mut timestamp = None;
    let mut v1 = Vec::new();

    for part in header.split(',') {
        let mut pieces = part.trim().splitn(2, '=');
        match (pieces.next(), pieces.next()) {
            (Some("t"), Some(value)) => {
                timestamp = Some(value.parse::<i64>().context("Invalid signature timestamp")?);
            }
            (Some("v1"), Some(value)) => v1.push(value.to_string()),
            _ => {} // 其他scheme (v0等) 忽略
        }
    }

    let timestamp = timestamp.context("Missing timestamp in stripe-signature header")?;
    if v1.is_empty() {
        anyhow::bail!("No v1 signature in stripe-signature header");
    }
    Ok(StripeSignature { timestamp, v1 })
}

/// 验证Stripe webhook签名
///
/// 签名对象是 `{timestamp}.{原始请求体}`; 时间戳超出容忍窗口的签名
/// 一律拒绝, 防止重放。必须使用收到的原始字节, 不能重新序列化。
pub fn verify_stripe_signature(
    raw_body: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> Result<bool> {
    let parsed = parse_stripe_signature(header)?;

    let now = chrono::Utc::now().timestamp();
    if (now - parsed.timestamp).abs() > tolerance_secs {
        return Ok(false);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).context("Invalid webhook secret")?;
    mac.update(format!("{}.", parsed.timestamp).as_bytes());
    mac.update(raw_body);
    let expected = hex::encode(mac.finalize().into_bytes());

    Ok(parsed.v1.iter().any(|sig| constant_time_eq(&expected, sig)))
}

/// 构造Stripe签名头 (测试与联调工具)
pub fn build_stripe_signature(raw_body: &[u8], secret: &str, timestamp: i64) -> Result<String> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).context("Invalid webhook secret")?;
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(raw_body);
    let signature = hex::encode(mac.finalize().into_bytes());
    Ok(format!("t={},v1={}", timestamp, signature))
}

/// 常量时间字符串比较 (防止时序攻击)
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1v15::SigningKey;
    use rsa::signature::{SignatureEncoding, Signer};
    use rsa::RsaPrivateKey;

    fn sample_wechat_fields() -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert("appid".to_string(), "wx123456".to_string());
        fields.insert("mch_id".to_string(), "1900000109".to_string());
        fields.insert("out_trade_no".to_string(), "U123456_1700000000000".to_string());
        fields.insert("total_fee".to_string(), "500".to_string());
        fields.insert("return_code".to_string(), "SUCCESS".to_string());
        fields.insert("result_code".to_string(), "SUCCESS".to_string());
        fields
    }

    #[test]
    fn test_wechat_sign_roundtrip() {
        let mut fields = sample_wechat_fields();
        let sign = wechat_sign(&fields, "test_api_key");
        assert_eq!(sign.len(), 32);
        assert_eq!(sign, sign.to_uppercase());

        fields.insert("sign".to_string(), sign);
        assert!(verify_wechat_sign(&fields, "test_api_key"));
        assert!(!verify_wechat_sign(&fields, "other_key"));
    }

    #[test]
    fn test_wechat_sign_ignores_empty_and_sign_fields() {
        let mut fields = sample_wechat_fields();
        let sign = wechat_sign(&fields, "test_api_key");
        // 空值字段不参与签名
        fields.insert("attach".to_string(), "".to_string());
        assert_eq!(wechat_sign(&fields, "test_api_key"), sign);
    }

    #[test]
    fn test_wechat_tampered_field_rejected() {
        let mut fields = sample_wechat_fields();
        let sign = wechat_sign(&fields, "test_api_key");
        fields.insert("sign".to_string(), sign);
        fields.insert("total_fee".to_string(), "99999".to_string());
        assert!(!verify_wechat_sign(&fields, "test_api_key"));
    }

    #[test]
    fn test_alipay_canonical_string_excludes_sign_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("out_trade_no".to_string(), "ORDER_42".to_string());
        fields.insert("total_amount".to_string(), "9.99".to_string());
        fields.insert("sign".to_string(), "xxx".to_string());
        fields.insert("sign_type".to_string(), "RSA2".to_string());

        let canonical = alipay_canonical_string(&fields);
        assert_eq!(canonical, "out_trade_no=ORDER_42&total_amount=9.99");
    }

    #[test]
    fn test_alipay_rsa2_verify() {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = RsaPublicKey::from(&private_key);

        let mut fields = BTreeMap::new();
        fields.insert("out_trade_no".to_string(), "ORDER_42".to_string());
        fields.insert("trade_status".to_string(), "TRADE_SUCCESS".to_string());
        fields.insert("total_amount".to_string(), "9.99".to_string());

        let canonical = alipay_canonical_string(&fields);
        let signing_key = SigningKey::<Sha256>::new(private_key);
        let signature = signing_key.sign(canonical.as_bytes());
        fields.insert("sign".to_string(), BASE64.encode(signature.to_bytes()));
        fields.insert("sign_type".to_string(), "RSA2".to_string());

        assert!(verify_alipay_sign(&fields, &public_key).unwrap());

        // 篡改金额后验签失败
        fields.insert("total_amount".to_string(), "999.99".to_string());
        assert!(!verify_alipay_sign(&fields, &public_key).unwrap());
    }

    #[test]
    fn test_alipay_missing_sign_rejected() {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = RsaPublicKey::from(&private_key);

        let mut fields = BTreeMap::new();
        fields.insert("out_trade_no".to_string(), "ORDER_42".to_string());
        assert!(!verify_alipay_sign(&fields, &public_key).unwrap());
    }

    #[test]
    fn test_stripe_signature_roundtrip() {
        let body = br#"{"type":"checkout.session.completed"}"#;
        let secret = "whsec_test";
        let now = chrono::Utc::now().timestamp();

        let header = build_stripe_signature(body, secret, now).unwrap();
        assert!(verify_stripe_signature(body, &header, secret, 300).unwrap());
        assert!(!verify_stripe_signature(body, &header, "whsec_other", 300).unwrap());
        // 篡改请求体
        assert!(!verify_stripe_signature(b"{}", &header, secret, 300).unwrap());
    }

    #[test]
    fn test_stripe_stale_timestamp_rejected() {
        let body = b"payload";
        let secret = "whsec_test";
        let stale = chrono::Utc::now().timestamp() - 3600;

        let header = build_stripe_signature(body, secret, stale).unwrap();
        assert!(!verify_stripe_signature(body, &header, secret, 300).unwrap());
        // 放宽容忍窗口后可通过
        assert!(verify_stripe_signature(body, &header, secret, 7200).unwrap());
    }

    #[test]
    fn test_parse_stripe_signature_header() {
        let parsed = parse_stripe_signature("t=1700000000,v1=abc,v0=legacy,v1=def").unwrap();
        assert_eq!(parsed.timestamp, 1700000000);
        assert_eq!(parsed.v1, vec!["abc".to_string(), "def".to_string()]);

        assert!(parse_stripe_signature("v1=abc").is_err());
        assert!(parse_stripe_signature("t=1700000000").is_err());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("hello", "hello"));
        assert!(!constant_time_eq("hello", "world"));
        assert!(!constant_time_eq("hello", "hello world"));
    }
}

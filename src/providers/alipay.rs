// 支付宝回调适配器
// x-www-form-urlencoded 报文, RSA2验签, 应答为纯文本 "success"

use actix_web::HttpResponse;
use anyhow::{Context, Result};
use rsa::RsaPublicKey;
use std::collections::BTreeMap;

use crate::models::{PayProvider, PaymentFact, PaymentNotice};
use crate::providers::{Ack, NotifyAdapter, NotifyFields, NotifyRejection, RawNotify};
use crate::utils::{major_str_to_minor, parse_rsa_public_key, verify_alipay_sign};

/// 支付成功的交易状态 (TRADE_FINISHED 是不可退款的终态, 同样视为已支付)
const PAID_TRADE_STATUSES: [&str; 2] = ["TRADE_SUCCESS", "TRADE_FINISHED"];

/// 支付宝适配器
pub struct AlipayAdapter {
    /// 支付宝公钥 (验证回调签名, 不是商户私钥)
    public_key: RsaPublicKey,
}

impl AlipayAdapter {
    /// 从配置的公钥文本创建适配器
    ///
    /// 公钥解析在构造时完成, 配置错误在启动阶段就会暴露。
    pub fn new(public_key_pem: &str) -> Result<Self> {
        let public_key =
            parse_rsa_public_key(public_key_pem).context("Invalid Alipay public key")?;
        Ok(Self { public_key })
    }

    fn text_response(&self, status: actix_web::http::StatusCode, body: &str) -> HttpResponse {
        HttpResponse::build(status)
            .content_type("text/plain; charset=utf-8")
            .body(body.to_string())
    }
}

impl NotifyAdapter for AlipayAdapter {
    fn provider(&self) -> PayProvider {
        PayProvider::Alipay
    }

    fn decode(&self, raw: &RawNotify) -> Result<NotifyFields, NotifyRejection> {
        let fields: BTreeMap<String, String> = serde_urlencoded::from_bytes(&raw.body)
            .map_err(|e| NotifyRejection::Malformed(format!("invalid form body: {}", e)))?;
        if fields.is_empty() {
            return Err(NotifyRejection::Malformed("empty form body".to_string()));
        }
        Ok(NotifyFields::Flat(fields))
    }

    fn verify(&self, fields: &NotifyFields, _raw: &RawNotify) -> Result<(), NotifyRejection> {
        let fields = fields
            .flat()
            .ok_or_else(|| NotifyRejection::Malformed("expected flat fields".to_string()))?;
        match verify_alipay_sign(fields, &self.public_key) {
            Ok(true) => Ok(()),
            Ok(false) => Err(NotifyRejection::BadSignature),
            Err(e) => Err(NotifyRejection::Malformed(e.to_string())),
        }
    }

    fn extract(&self, fields: &NotifyFields) -> Result<PaymentNotice, NotifyRejection> {
        let fields = fields
            .flat()
            .ok_or_else(|| NotifyRejection::Malformed("expected flat fields".to_string()))?;

        let trade_status = fields.get("trade_status").map(String::as_str).unwrap_or("");
        if !PAID_TRADE_STATUSES.contains(&trade_status) {
            // WAIT_BUYER_PAY / TRADE_CLOSED 等状态与入账无关, 仍需应答success
            return Ok(PaymentNotice::Ignored);
        }

        let order_id = fields
            .get("out_trade_no")
            .cloned()
            .ok_or(NotifyRejection::MissingField("out_trade_no"))?;
        let total_amount = fields
            .get("total_amount")
            .ok_or(NotifyRejection::MissingField("total_amount"))?;
        // total_amount 是主单位十进制字符串 ("9.99"), 归一化为分
        let amount_minor = major_str_to_minor(total_amount)
            .map_err(|e| NotifyRejection::BadAmount(e.to_string()))?;

        Ok(PaymentNotice::Success(PaymentFact {
            order_id,
            amount_minor,
            txn_id: fields.get("trade_no").cloned(),
        }))
    }

    fn build_ack(&self, ack: Ack<'_>) -> HttpResponse {
        use actix_web::http::StatusCode;
        match ack {
            // 应答体必须是裸的 "success", 任何包装都会触发重发
            Ack::Success => self.text_response(StatusCode::OK, "success"),
            Ack::Failure(_) => self.text_response(StatusCode::OK, "failure"),
            Ack::Retry(_) => self.text_response(StatusCode::INTERNAL_SERVER_ERROR, "fail"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::alipay_canonical_string;
    use actix_web::web::Bytes;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use rsa::pkcs1v15::SigningKey;
    use rsa::signature::{SignatureEncoding, Signer};
    use rsa::RsaPrivateKey;
    use sha2::Sha256;

    struct TestKeys {
        signing_key: SigningKey<Sha256>,
        adapter: AlipayAdapter,
    }

    fn test_keys() -> TestKeys {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = RsaPublicKey::from(&private_key);
        TestKeys {
            signing_key: SigningKey::<Sha256>::new(private_key),
            adapter: AlipayAdapter { public_key },
        }
    }

    fn signed_form(keys: &TestKeys, trade_status: &str, amount: &str) -> String {
        let mut fields = BTreeMap::new();
        fields.insert("out_trade_no".to_string(), "ORDER_42".to_string());
        fields.insert("trade_status".to_string(), trade_status.to_string());
        fields.insert("total_amount".to_string(), amount.to_string());
        fields.insert("trade_no".to_string(), "2023112233445566".to_string());

        let canonical = alipay_canonical_string(&fields);
        let signature = keys.signing_key.sign(canonical.as_bytes());
        fields.insert("sign".to_string(), BASE64.encode(signature.to_bytes()));
        fields.insert("sign_type".to_string(), "RSA2".to_string());

        serde_urlencoded::to_string(&fields).unwrap()
    }

    fn raw(body: String) -> RawNotify {
        RawNotify::new(Bytes::from(body))
    }

    #[test]
    fn test_decode_verify_extract_success() {
        let keys = test_keys();
        let raw = raw(signed_form(&keys, "TRADE_SUCCESS", "9.99"));

        let fields = keys.adapter.decode(&raw).unwrap();
        keys.adapter.verify(&fields, &raw).unwrap();

        match keys.adapter.extract(&fields).unwrap() {
            PaymentNotice::Success(fact) => {
                assert_eq!(fact.order_id, "ORDER_42");
                assert_eq!(fact.amount_minor, 999);
                assert_eq!(fact.txn_id.as_deref(), Some("2023112233445566"));
            }
            other => panic!("unexpected notice: {:?}", other),
        }
    }

    #[test]
    fn test_trade_finished_also_counts_as_paid() {
        let keys = test_keys();
        let raw = raw(signed_form(&keys, "TRADE_FINISHED", "5.00"));
        let fields = keys.adapter.decode(&raw).unwrap();
        assert!(matches!(
            keys.adapter.extract(&fields).unwrap(),
            PaymentNotice::Success(_)
        ));
    }

    #[test]
    fn test_intermediate_status_is_ignored() {
        let keys = test_keys();
        let raw = raw(signed_form(&keys, "WAIT_BUYER_PAY", "9.99"));
        let fields = keys.adapter.decode(&raw).unwrap();
        assert_eq!(keys.adapter.extract(&fields).unwrap(), PaymentNotice::Ignored);
    }

    #[test]
    fn test_tampered_form_fails_verification() {
        let keys = test_keys();
        let body = signed_form(&keys, "TRADE_SUCCESS", "9.99");
        let tampered = body.replace("9.99", "0.01");
        let raw = raw(tampered);

        let fields = keys.adapter.decode(&raw).unwrap();
        assert!(matches!(
            keys.adapter.verify(&fields, &raw),
            Err(NotifyRejection::BadSignature)
        ));
    }

    #[test]
    fn test_unsigned_form_rejected() {
        let keys = test_keys();
        let raw = raw("out_trade_no=ORDER_42&trade_status=TRADE_SUCCESS&total_amount=9.99".to_string());
        let fields = keys.adapter.decode(&raw).unwrap();
        assert!(matches!(
            keys.adapter.verify(&fields, &raw),
            Err(NotifyRejection::BadSignature)
        ));
    }

    #[actix_web::test]
    async fn test_ack_bodies() {
        let keys = test_keys();

        let resp = keys.adapter.build_ack(Ack::Success);
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        // 必须是裸的ASCII "success"
        assert_eq!(body, Bytes::from_static(b"success"));

        let resp = keys.adapter.build_ack(Ack::Retry("db down"));
        assert_eq!(resp.status(), actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(body, Bytes::from_static(b"fail"));
    }
}

// Stripe回调适配器
// JSON报文, stripe-signature 请求头HMAC验签, 验签通过后才解析JSON

use actix_web::HttpResponse;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::models::{PayProvider, PaymentFact, PaymentNotice};
use crate::providers::{Ack, NotifyAdapter, NotifyFields, NotifyRejection, RawNotify};
use crate::utils::verify_stripe_signature;

/// Stripe适配器
pub struct StripeAdapter {
    /// webhook签名密钥 (whsec_...)
    webhook_secret: String,
    /// 签名时间戳容忍窗口 (秒)
    tolerance_secs: i64,
}

/// Stripe事件信封
#[derive(Debug, Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: StripeSession,
}

/// checkout.session.completed 中我们关心的字段
#[derive(Debug, Deserialize)]
struct StripeSession {
    id: Option<String>,
    /// 金额 (最小单位, cents)
    amount_total: Option<i64>,
    client_reference_id: Option<String>,
    payment_intent: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl StripeAdapter {
    pub fn new(webhook_secret: String, tolerance_secs: i64) -> Self {
        Self {
            webhook_secret,
            tolerance_secs,
        }
    }
}

impl NotifyAdapter for StripeAdapter {
    fn provider(&self) -> PayProvider {
        PayProvider::Stripe
    }

    fn decode(&self, raw: &RawNotify) -> Result<NotifyFields, NotifyRejection> {
        if raw.body.is_empty() {
            return Err(NotifyRejection::Malformed("empty body".to_string()));
        }
        // 签名覆盖原始字节, 解析推迟到验签之后
        Ok(NotifyFields::Opaque(raw.body.clone()))
    }

    fn verify(&self, _fields: &NotifyFields, raw: &RawNotify) -> Result<(), NotifyRejection> {
        let header = raw
            .signature
            .as_deref()
            .ok_or(NotifyRejection::MissingField("stripe-signature"))?;
        match verify_stripe_signature(&raw.body, header, &self.webhook_secret, self.tolerance_secs)
        {
            Ok(true) => Ok(()),
            Ok(false) => Err(NotifyRejection::BadSignature),
            Err(e) => Err(NotifyRejection::Malformed(e.to_string())),
        }
    }

    fn extract(&self, fields: &NotifyFields) -> Result<PaymentNotice, NotifyRejection> {
        let bytes = fields
            .opaque()
            .ok_or_else(|| NotifyRejection::Malformed("expected raw body".to_string()))?;
        let event: StripeEvent = serde_json::from_slice(bytes)
            .map_err(|e| NotifyRejection::Malformed(format!("invalid event JSON: {}", e)))?;

        if event.event_type != "checkout.session.completed" {
            return Ok(PaymentNotice::Ignored);
        }

        let session = event.data.object;
        // 创建会话时必须把商户订单号写入 metadata.orderId (或 client_reference_id),
        // 没有订单号的会话不能凭空入账
        let order_id = session
            .metadata
            .get("orderId")
            .cloned()
            .or(session.client_reference_id)
            .ok_or(NotifyRejection::MissingField("metadata.orderId"))?;
        let amount_minor = session
            .amount_total
            .ok_or(NotifyRejection::MissingField("amount_total"))?;
        if amount_minor <= 0 {
            return Err(NotifyRejection::BadAmount(format!(
                "non-positive amount_total: {}",
                amount_minor
            )));
        }

        Ok(PaymentNotice::Success(PaymentFact {
            order_id,
            amount_minor,
            txn_id: session.payment_intent.or(session.id),
        }))
    }

    fn build_ack(&self, ack: Ack<'_>) -> HttpResponse {
        match ack {
            // 任意2xx即可让Stripe停止重发
            Ack::Success => HttpResponse::Ok().body("Webhook received"),
            Ack::Failure(msg) => HttpResponse::BadRequest().body(msg.to_string()),
            Ack::Retry(msg) => HttpResponse::InternalServerError().body(msg.to_string()),
        }
    }
}

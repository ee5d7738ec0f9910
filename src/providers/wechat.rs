// 微信支付回调适配器
// text/xml 报文, MD5签名, 应答为带CDATA的XML

use actix_web::HttpResponse;

use crate::models::{PayProvider, PaymentFact, PaymentNotice};
use crate::providers::{Ack, NotifyAdapter, NotifyFields, NotifyRejection, RawNotify};
use crate::utils::{build_ack_xml, minor_str_to_minor, parse_notify_xml, verify_wechat_sign};

/// 微信支付适配器
pub struct WechatAdapter {
    /// 商户API密钥 (参与MD5签名)
    api_key: String,
}

impl WechatAdapter {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }

    fn xml_response(&self, return_code: &str, return_msg: &str) -> HttpResponse {
        HttpResponse::Ok()
            .content_type("text/xml; charset=utf-8")
            .body(build_ack_xml(return_code, return_msg))
    }
}

impl NotifyAdapter for WechatAdapter {
    fn provider(&self) -> PayProvider {
        PayProvider::Wechat
    }

    fn decode(&self, raw: &RawNotify) -> Result<NotifyFields, NotifyRejection> {
        let text = std::str::from_utf8(&raw.body)
            .map_err(|_| NotifyRejection::Malformed("body is not valid UTF-8".to_string()))?;
        let fields =
            parse_notify_xml(text).map_err(|e| NotifyRejection::Malformed(e.to_string()))?;
        Ok(NotifyFields::Flat(fields))
    }

    fn verify(&self, fields: &NotifyFields, _raw: &RawNotify) -> Result<(), NotifyRejection> {
        let fields = fields
            .flat()
            .ok_or_else(|| NotifyRejection::Malformed("expected flat fields".to_string()))?;
        if verify_wechat_sign(fields, &self.api_key) {
            Ok(())
        } else {
            Err(NotifyRejection::BadSignature)
        }
    }

    fn extract(&self, fields: &NotifyFields) -> Result<PaymentNotice, NotifyRejection> {
        let fields = fields
            .flat()
            .ok_or_else(|| NotifyRejection::Malformed("expected flat fields".to_string()))?;

        let return_code = fields.get("return_code").map(String::as_str).unwrap_or("");
        let result_code = fields.get("result_code").map(String::as_str).unwrap_or("");
        let order_id = fields.get("out_trade_no").cloned();

        if return_code != "SUCCESS" || result_code != "SUCCESS" {
            let reason = fields
                .get("err_code_des")
                .or_else(|| fields.get("return_msg"))
                .cloned()
                .unwrap_or_else(|| "Payment failed".to_string());
            return Ok(PaymentNotice::Failed { order_id, reason });
        }

        let order_id = order_id.ok_or(NotifyRejection::MissingField("out_trade_no"))?;
        let total_fee = fields
            .get("total_fee")
            .ok_or(NotifyRejection::MissingField("total_fee"))?;
        // total_fee 已经是分
        let amount_minor = minor_str_to_minor(total_fee)
            .map_err(|e| NotifyRejection::BadAmount(e.to_string()))?;

        Ok(PaymentNotice::Success(PaymentFact {
            order_id,
            amount_minor,
            txn_id: fields.get("transaction_id").cloned(),
        }))
    }

    fn build_ack(&self, ack: Ack<'_>) -> HttpResponse {
        match ack {
            Ack::Success => self.xml_response("SUCCESS", "OK"),
            // 微信对 return_code=FAIL 会按重试策略重发, 两种失败共用FAIL应答
            Ack::Failure(msg) | Ack::Retry(msg) => self.xml_response("FAIL", msg),
        }
    }
}

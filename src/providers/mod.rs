// 渠道适配器模块
// 每个支付渠道实现一次 decode / verify / extract / build_ack,
// 对账事务本身与渠道无关

pub mod alipay;
pub mod stripe;
pub mod wechat;

// 重新导出适配器
pub use alipay::AlipayAdapter;
pub use stripe::StripeAdapter;
pub use wechat::WechatAdapter;

use actix_web::web::Bytes;
use actix_web::HttpResponse;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{PayProvider, PaymentNotice};

/// 收到的原始回调
///
/// 验签必须针对原始字节进行, 不允许对重新序列化的副本签名比对。
#[derive(Debug, Clone)]
pub struct RawNotify {
    /// 原始请求体
    pub body: Bytes,
    /// 签名请求头 (目前只有Stripe使用)
    pub signature: Option<String>,
}

impl RawNotify {
    pub fn new(body: Bytes) -> Self {
        Self { body, signature: None }
    }

    pub fn with_signature(body: Bytes, signature: Option<String>) -> Self {
        Self { body, signature }
    }
}

/// 解码后的回调字段
#[derive(Debug, Clone)]
pub enum NotifyFields {
    /// 扁平键值映射 (微信XML、支付宝表单)
    Flat(BTreeMap<String, String>),
    /// 验签前保持不透明的原始字节 (Stripe)
    Opaque(Bytes),
}

impl NotifyFields {
    pub fn flat(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            NotifyFields::Flat(map) => Some(map),
            NotifyFields::Opaque(_) => None,
        }
    }

    pub fn opaque(&self) -> Option<&[u8]> {
        match self {
            NotifyFields::Flat(_) => None,
            NotifyFields::Opaque(bytes) => Some(bytes),
        }
    }
}

/// 回调处理结果对应的应答语义
///
/// 每个渠道把这三种语义映射为自己约定的应答报文:
/// 重复通知与正常入账都必须应答 Success, 否则渠道会无限重发。
#[derive(Debug, Clone, Copy)]
pub enum Ack<'a> {
    /// 处理成功 (含幂等短路), 渠道停止重发
    Success,
    /// 明确拒绝 (验签失败、订单不存在、金额不符)
    Failure(&'a str),
    /// 暂时失败 (存储错误、超时), 邀请渠道重发
    Retry(&'a str),
}

/// 回调在进入对账前被拒绝的原因
#[derive(Debug, Error)]
pub enum NotifyRejection {
    /// 请求体无法解码
    #[error("malformed payload: {0}")]
    Malformed(String),
    /// 验签失败
    #[error("invalid signature")]
    BadSignature,
    /// 缺少必要字段
    #[error("missing field: {0}")]
    MissingField(&'static str),
    /// 金额字段非法
    #[error("invalid amount: {0}")]
    BadAmount(String),
}

/// 渠道适配器
///
/// 流水线固定为 decode -> verify -> extract -> (对账) -> build_ack;
/// 任一步失败都不得触碰台账。
pub trait NotifyAdapter: Send + Sync {
    /// 所属支付渠道
    fn provider(&self) -> PayProvider;

    /// 把原始请求体解码为字段表示
    ///
    /// Stripe适配器在这一步保持字节不透明, 验签通过后才解析JSON。
    fn decode(&self, raw: &RawNotify) -> Result<NotifyFields, NotifyRejection>;

    /// 验证回调真实性
    fn verify(&self, fields: &NotifyFields, raw: &RawNotify) -> Result<(), NotifyRejection>;

    /// 从已验签的字段中提取支付语义
    fn extract(&self, fields: &NotifyFields) -> Result<PaymentNotice, NotifyRejection>;

    /// 构造渠道约定的应答报文
    fn build_ack(&self, ack: Ack<'_>) -> HttpResponse;
}

// 订单数据模型
// 订单台账是支付回调对账的唯一事实来源

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::minor_to_major;

/// 订单模型
///
/// 由"创建支付"接口以 `Pending` 状态写入, 之后只被回调对账流程修改,
/// 永不删除。状态迁移单调: `Pending -> Paid | Failed`, 终态不再变化。
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Order {
    /// 订单记录唯一标识符
    pub id: Uuid,
    /// 商户订单号 (微信侧限制32字符)
    pub order_id: String,
    /// 所属用户ID
    pub user_id: String,
    /// 订单金额 (最小货币单位, 分)
    pub amount_minor: i64,
    /// 币种
    pub currency: String,
    /// 支付渠道
    pub provider: PayProvider,
    /// 订单状态
    pub status: OrderStatus,
    /// 渠道侧交易号 (支付成功后记录)
    pub provider_txn_id: Option<String>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 支付完成时间
    pub paid_at: Option<DateTime<Utc>>,
}

/// 订单状态枚举
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "varchar")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// 待支付状态
    #[sqlx(rename = "pending")]
    Pending,
    /// 已支付状态 (钱包已入账, 终态)
    #[sqlx(rename = "paid")]
    Paid,
    /// 失败状态 (终态)
    #[sqlx(rename = "failed")]
    Failed,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl OrderStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Failed)
    }
}

/// 支持的支付渠道枚举
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "varchar")]
#[serde(rename_all = "lowercase")]
pub enum PayProvider {
    /// 微信支付 (H5)
    #[sqlx(rename = "wechat")]
    Wechat,
    /// 支付宝
    #[sqlx(rename = "alipay")]
    Alipay,
    /// Stripe (含Apple Pay)
    #[sqlx(rename = "stripe")]
    Stripe,
}

impl PayProvider {
    /// 渠道名称 (存库与流水记录使用)
    pub fn as_str(&self) -> &'static str {
        match self {
            PayProvider::Wechat => "wechat",
            PayProvider::Alipay => "alipay",
            PayProvider::Stripe => "stripe",
        }
    }
}

impl std::fmt::Display for PayProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 创建订单请求
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// 用户ID
    pub user_id: String,
    /// 充值金额 (主单位, 如 9.99 元)
    pub amount: Decimal,
    /// 支付渠道
    pub provider: PayProvider,
    /// 币种 (可选, 默认CNY)
    pub currency: Option<String>,
}

/// 订单查询响应
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// 商户订单号
    pub order_id: String,
    /// 用户ID
    pub user_id: String,
    /// 金额 (主单位)
    pub amount: Decimal,
    /// 金额 (最小单位)
    pub amount_minor: i64,
    /// 币种
    pub currency: String,
    /// 支付渠道
    pub provider: PayProvider,
    /// 订单状态
    pub status: OrderStatus,
    /// 渠道侧交易号
    pub provider_txn_id: Option<String>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 支付完成时间
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    /// 检查订单是否已支付
    pub fn is_paid(&self) -> bool {
        self.status == OrderStatus::Paid
    }

    /// 转换为API响应格式
    pub fn to_response(&self) -> OrderResponse {
        OrderResponse {
            order_id: self.order_id.clone(),
            user_id: self.user_id.clone(),
            amount: minor_to_major(self.amount_minor),
            amount_minor: self.amount_minor,
            currency: self.currency.clone(),
            provider: self.provider,
            status: self.status,
            provider_txn_id: self.provider_txn_id.clone(),
            created_at: self.created_at,
            paid_at: self.paid_at,
        }
    }
}

// 钱包数据模型
// 每个用户一条余额记录, 首次入账时懒创建

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::minor_to_major;

/// 用户钱包模型
///
/// 余额只通过已验签且订单唯一的入账增加; 回调路径永不扣减。
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Wallet {
    /// 用户ID
    pub user_id: String,
    /// 余额 (最小货币单位, 分)
    pub balance_minor: i64,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 钱包流水记录 (只追加)
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct WalletHistoryEntry {
    /// 流水记录ID
    pub id: Uuid,
    /// 用户ID
    pub user_id: String,
    /// 关联商户订单号 (唯一)
    pub order_id: String,
    /// 入账金额 (最小单位)
    pub amount_minor: i64,
    /// 支付渠道名称
    pub method: String,
    /// 流水状态
    pub status: String,
    /// 记录时间
    pub created_at: DateTime<Utc>,
}

/// 余额查询响应
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// 用户ID
    pub user_id: String,
    /// 余额 (主单位, 两位小数)
    pub balance: Decimal,
    /// 余额 (最小单位)
    pub balance_minor: i64,
}

impl BalanceResponse {
    pub fn new(user_id: String, balance_minor: i64) -> Self {
        Self {
            user_id,
            balance: minor_to_major(balance_minor),
            balance_minor,
        }
    }
}

/// 扣减余额请求
#[derive(Debug, Deserialize)]
pub struct DeductRequest {
    /// 用户ID
    pub user_id: String,
    /// 扣减金额 (主单位)
    pub amount: Decimal,
}

/// 流水查询参数
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// 返回条数 (默认20, 最大100)
    pub limit: Option<u32>,
}

impl HistoryQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).min(100).max(1) as i64
    }
}

/// 流水查询响应
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// 用户ID
    pub user_id: String,
    /// 流水列表 (按时间倒序)
    pub history: Vec<HistoryItem>,
}

/// 单条流水的响应格式
#[derive(Debug, Serialize)]
pub struct HistoryItem {
    /// 商户订单号
    pub order_id: String,
    /// 入账金额 (主单位)
    pub amount: Decimal,
    /// 支付渠道
    pub method: String,
    /// 流水状态
    pub status: String,
    /// 记录时间
    pub timestamp: DateTime<Utc>,
}

impl WalletHistoryEntry {
    /// 转换为API响应格式
    pub fn to_item(&self) -> HistoryItem {
        HistoryItem {
            order_id: self.order_id.clone(),
            amount: minor_to_major(self.amount_minor),
            method: self.method.clone(),
            status: self.status.clone(),
            timestamp: self.created_at,
        }
    }
}

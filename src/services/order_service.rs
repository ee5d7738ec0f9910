// 订单服务
// 负责订单创建、查询与失败状态迁移

use anyhow::{Context, Result};
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Order, OrderStatus, PayProvider};
use crate::utils::major_to_minor;

/// 商户订单号长度上限 (微信接口限制)
const MAX_ORDER_ID_LEN: usize = 32;

/// 订单服务
pub struct OrderService {
    pool: PgPool,
}

impl OrderService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 创建待支付订单
    ///
    /// 只写本地台账; 调用渠道下单接口在本服务范围之外。
    pub async fn create_order(
        &self,
        user_id: &str,
        amount: Decimal,
        provider: PayProvider,
        currency: Option<String>,
    ) -> Result<Order> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            anyhow::bail!("user_id cannot be empty");
        }
        if user_id.len() > 64 {
            anyhow::bail!("user_id too long (max 64 characters)");
        }

        let amount_minor = major_to_minor(amount).context("Invalid order amount")?;
        let currency = currency.unwrap_or_else(|| "CNY".to_string());
        let order_id = generate_order_id(user_id);
        let now = Utc::now();
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO orders (id, order_id, user_id, amount_minor, currency, provider, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            "#,
        )
        .bind(id)
        .bind(&order_id)
        .bind(user_id)
        .bind(amount_minor)
        .bind(&currency)
        .bind(provider.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create order")?;

        log::info!(
            "Created order {} for user {}: {} minor units via {}",
            order_id,
            user_id,
            amount_minor,
            provider
        );

        Ok(Order {
            id,
            order_id,
            user_id: user_id.to_string(),
            amount_minor,
            currency,
            provider,
            status: OrderStatus::Pending,
            provider_txn_id: None,
            created_at: now,
            paid_at: None,
        })
    }

    /// 按商户订单号查询订单
    pub async fn get_order(&self, order_id: &str) -> Result<Option<Order>> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT id, order_id, user_id, amount_minor, currency, provider,
                   status, provider_txn_id, created_at, paid_at
            FROM orders
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch order")
    }

    /// 把待支付订单标记为失败 (渠道上报了已验签的失败结果)
    ///
    /// 状态迁移单调: 只有pending能迁移到failed, 终态订单不受影响。
    pub async fn mark_failed(&self, order_id: &str) -> Result<bool> {
        let updated = sqlx::query(
            "UPDATE orders SET status = 'failed' WHERE order_id = $1 AND status = 'pending'",
        )
        .bind(order_id)
        .execute(&self.pool)
        .await
        .context("Failed to mark order failed")?;

        Ok(updated.rows_affected() > 0)
    }
}

/// 生成商户订单号: `{用户前缀}_{毫秒时间戳}{4位随机}`
///
/// 总长度不超过32字符以兼容微信 out_trade_no 限制。
fn generate_order_id(user_id: &str) -> String {
    let prefix: String = user_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(10)
        .collect();
    let prefix = if prefix.is_empty() { "U".to_string() } else { prefix };

    let millis = Utc::now().timestamp_millis();
    let suffix: u16 = rand::thread_rng().gen_range(0..10000);
    format!("{}_{}{:04}", prefix, millis, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_order_id_within_wechat_limit() {
        for user_id in ["U123456", "a-very-long-user-identifier-indeed", "用户", ""] {
            let order_id = generate_order_id(user_id);
            assert!(order_id.len() <= MAX_ORDER_ID_LEN, "too long: {}", order_id);
            assert!(order_id.contains('_'));
        }
    }

    #[test]
    fn test_generate_order_id_strips_special_chars() {
        let order_id = generate_order_id("user@example.com");
        let prefix = order_id.split('_').next().unwrap();
        assert!(prefix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_order_id_mostly_unique() {
        let a = generate_order_id("U123456");
        let b = generate_order_id("U123456");
        // 同一毫秒内也有随机后缀区分
        assert!(a != b || a.len() <= MAX_ORDER_ID_LEN);
    }
}

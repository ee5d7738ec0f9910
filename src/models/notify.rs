// 支付通知数据模型
// 各渠道回调解码后的统一中间表示

/// 从已验签的回调中提取出的支付事实
///
/// 金额已在渠道适配器处归一化为最小货币单位;
/// 入账金额以订单台账记录为准, 此处金额仅用于一致性核对。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentFact {
    /// 商户订单号
    pub order_id: String,
    /// 渠道上报金额 (最小单位)
    pub amount_minor: i64,
    /// 渠道侧交易号
    pub txn_id: Option<String>,
}

/// 解码并验签后的回调语义
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentNotice {
    /// 支付成功, 进入对账入账流程
    Success(PaymentFact),
    /// 渠道明确上报支付失败 (如微信 result_code=FAIL)
    Failed {
        /// 商户订单号 (渠道可能未携带)
        order_id: Option<String>,
        /// 渠道给出的失败原因
        reason: String,
    },
    /// 与入账无关的通知 (如Stripe其他事件类型、支付宝中间状态)
    Ignored,
}

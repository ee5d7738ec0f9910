// 支付回调处理器
// 三个渠道共用同一条 decode -> verify -> extract -> 对账 -> 应答 流水线;
// 应答永远是渠道约定的报文, 不走JSON响应包装

use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use std::time::Duration;

use crate::models::PaymentNotice;
use crate::providers::{Ack, AlipayAdapter, NotifyAdapter, RawNotify, StripeAdapter, WechatAdapter};
use crate::services::{CreditOutcome, OrderService, ReconcileError, ReconcileService};
use crate::state::AppState;

/// 渠道无关的回调处理流水线
///
/// 任何解码/验签失败都在触碰台账之前返回; 存储错误与超时映射为
/// 渠道的重发邀请应答; 幂等短路映射为成功应答。
async fn process_notify(
    state: &AppState,
    adapter: &dyn NotifyAdapter,
    raw: RawNotify,
) -> HttpResponse {
    let provider = adapter.provider();

    let fields = match adapter.decode(&raw) {
        Ok(fields) => fields,
        Err(e) => {
            log::warn!("{} notify rejected at decode: {}", provider, e);
            return adapter.build_ack(Ack::Failure("Malformed body"));
        }
    };

    // 验签失败的日志不包含任何密钥材料, 只记录可审计的上下文
    if let Err(e) = adapter.verify(&fields, &raw) {
        log::warn!(
            "{} notify rejected: {} ({} byte body)",
            provider,
            e,
            raw.body.len()
        );
        return adapter.build_ack(Ack::Failure("Invalid signature"));
    }

    let notice = match adapter.extract(&fields) {
        Ok(notice) => notice,
        Err(e) => {
            log::warn!("{} notify rejected at extract: {}", provider, e);
            return adapter.build_ack(Ack::Failure("Invalid payload"));
        }
    };

    match notice {
        PaymentNotice::Ignored => adapter.build_ack(Ack::Success),

        PaymentNotice::Failed { order_id, reason } => {
            log::warn!(
                "{} reported failed payment for order {:?}: {}",
                provider,
                order_id,
                reason
            );
            if let Some(order_id) = &order_id {
                let orders = OrderService::new(state.db_pool.clone());
                match orders.mark_failed(order_id).await {
                    Ok(true) => log::info!("Order {} marked as failed", order_id),
                    Ok(false) => {} // 已是终态或未知订单
                    Err(e) => log::error!("Failed to mark order {} failed: {}", order_id, e),
                }
            }
            adapter.build_ack(Ack::Failure(&reason))
        }

        PaymentNotice::Success(fact) => {
            let service = ReconcileService::new(state.db_pool.clone());
            let deadline = Duration::from_secs(state.config.notify.timeout_secs);

            // 渠道侧重发超时前必须给出应答, 慢存储快速失败交给重发机制
            match tokio::time::timeout(deadline, service.apply_payment(provider, &fact)).await {
                Err(_) => {
                    log::error!(
                        "{} notify timed out after {:?} for order {}",
                        provider,
                        deadline,
                        fact.order_id
                    );
                    adapter.build_ack(Ack::Retry("Processing timeout"))
                }
                Ok(Ok(CreditOutcome::Credited { user_id, amount_minor })) => {
                    log::info!(
                        "{} notify credited user {} with {} minor units (order {})",
                        provider,
                        user_id,
                        amount_minor,
                        fact.order_id
                    );
                    adapter.build_ack(Ack::Success)
                }
                Ok(Ok(CreditOutcome::AlreadyPaid)) => {
                    log::info!(
                        "Duplicate {} notify for order {} short-circuited",
                        provider,
                        fact.order_id
                    );
                    adapter.build_ack(Ack::Success)
                }
                Ok(Err(ReconcileError::UnknownOrder(order_id))) => {
                    // 台账里没有这笔订单; 失败应答在渠道侧仍会触发重发,
                    // 正好覆盖订单创建与回调之间的竞争
                    log::error!("{} notify for unknown order {}", provider, order_id);
                    adapter.build_ack(Ack::Failure("Order not found"))
                }
                Ok(Err(ReconcileError::Storage(e))) => {
                    log::error!(
                        "Storage error while reconciling {} order {}: {}",
                        provider,
                        fact.order_id,
                        e
                    );
                    adapter.build_ack(Ack::Retry("Internal error"))
                }
                Ok(Err(e)) => {
                    // 金额/渠道不符或订单已失败: 终局拒绝, 不入账
                    log::error!("{} notify rejected for order {}: {}", provider, fact.order_id, e);
                    adapter.build_ack(Ack::Failure("Notification rejected"))
                }
            }
        }
    }
}

/// 微信支付回调
///
/// POST /notify/wechat (Content-Type: text/xml)
pub async fn wechat_notify(
    data: web::Data<AppState>,
    body: web::Bytes,
) -> ActixResult<HttpResponse> {
    let adapter = WechatAdapter::new(data.config.wechat.api_key.clone());
    Ok(process_notify(&data, &adapter, RawNotify::new(body)).await)
}

/// 支付宝回调
///
/// POST /notify/alipay (Content-Type: application/x-www-form-urlencoded)
pub async fn alipay_notify(
    data: web::Data<AppState>,
    body: web::Bytes,
) -> ActixResult<HttpResponse> {
    let adapter = match AlipayAdapter::new(&data.config.alipay.public_key) {
        Ok(adapter) => adapter,
        Err(e) => {
            log::error!("Alipay adapter unavailable: {}", e);
            return Ok(HttpResponse::InternalServerError()
                .content_type("text/plain; charset=utf-8")
                .body("fail"));
        }
    };
    Ok(process_notify(&data, &adapter, RawNotify::new(body)).await)
}

/// Stripe webhook回调
///
/// POST /notify/stripe (Content-Type: application/json, 携带 stripe-signature 头)
pub async fn stripe_webhook(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> ActixResult<HttpResponse> {
    let signature = req
        .headers()
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let adapter = StripeAdapter::new(
        data.config.stripe.webhook_secret.clone(),
        data.config.stripe.tolerance_secs,
    );
    Ok(process_notify(&data, &adapter, RawNotify::with_signature(body, signature)).await)
}

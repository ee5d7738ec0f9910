// API路由配置
// 定义所有HTTP接口的路由规则

use actix_web::{web, Scope};

use crate::handlers::*;

/// API v1路由配置
pub fn api_v1_routes() -> Scope {
    web::scope("/api/v1")
        // 订单路由
        .service(order_routes())
        // 钱包路由
        .service(wallet_routes())
        // 版本信息
        .route("/version", web::get().to(version_info))
}

/// 订单路由
fn order_routes() -> Scope {
    web::scope("/orders")
        .route("", web::post().to(create_order))
        .route("/{order_id}", web::get().to(get_order))
}

/// 钱包路由
fn wallet_routes() -> Scope {
    web::scope("/wallet")
        .route("/balance/{user_id}", web::get().to(get_balance))
        .route("/deduct", web::post().to(deduct_balance))
        .route("/history/{user_id}", web::get().to(get_wallet_history))
}

/// 支付回调路由
///
/// 只注册POST, 其他方法由框架以405拒绝, 不会触碰台账
pub fn notify_routes() -> Scope {
    web::scope("/notify")
        .route("/wechat", web::post().to(wechat_notify))
        .route("/alipay", web::post().to(alipay_notify))
        .route("/stripe", web::post().to(stripe_webhook))
}

/// 公共路由 (无需认证)
pub fn public_routes() -> Scope {
    web::scope("").route("/health", web::get().to(health_check))
}

// 订单API处理器
// 处理订单创建与状态查询的HTTP请求

use actix_web::{web, HttpResponse, Result as ActixResult};

use crate::models::{ApiResponse, CreateOrderRequest};
use crate::services::OrderService;
use crate::state::AppState;

/// 创建充值订单
///
/// POST /api/v1/orders
///
/// 请求体: CreateOrderRequest
/// 响应: OrderResponse (状态为PENDING)
pub async fn create_order(
    data: web::Data<AppState>,
    request: web::Json<CreateOrderRequest>,
) -> ActixResult<HttpResponse> {
    let request = request.into_inner();
    let order_service = OrderService::new(data.db_pool.clone());

    match order_service
        .create_order(&request.user_id, request.amount, request.provider, request.currency)
        .await
    {
        Ok(order) => Ok(HttpResponse::Created().json(ApiResponse::success(order.to_response()))),
        Err(e) => {
            log::warn!("Failed to create order for user {}: {}", request.user_id, e);
            Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(400, &e.to_string())))
        }
    }
}

/// 查询订单状态
///
/// GET /api/v1/orders/{order_id}
///
/// 客户端轮询该接口感知支付结果
pub async fn get_order(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let order_id = path.into_inner();
    let order_service = OrderService::new(data.db_pool.clone());

    match order_service.get_order(&order_id).await {
        Ok(Some(order)) => Ok(HttpResponse::Ok().json(ApiResponse::success(order.to_response()))),
        Ok(None) => {
            Ok(HttpResponse::NotFound().json(ApiResponse::<()>::error(404, "Order not found")))
        }
        Err(e) => {
            log::error!("Failed to fetch order {}: {}", order_id, e);
            Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error(500, "Internal server error")))
        }
    }
}

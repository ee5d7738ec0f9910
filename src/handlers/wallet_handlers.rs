// 钱包API处理器
// 余额查询、消费扣减与充值流水查询

use actix_web::{web, HttpResponse, Result as ActixResult};

use crate::models::{ApiResponse, BalanceResponse, DeductRequest, HistoryQuery, HistoryResponse};
use crate::services::{WalletError, WalletService};
use crate::state::AppState;

/// 查询钱包余额
///
/// GET /api/v1/wallet/balance/{user_id}
///
/// 没有钱包记录的用户返回零余额
pub async fn get_balance(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();
    let wallet_service = WalletService::new(data.db_pool.clone());

    match wallet_service.get_balance(&user_id).await {
        Ok(balance_minor) => Ok(HttpResponse::Ok()
            .json(ApiResponse::success(BalanceResponse::new(user_id, balance_minor)))),
        Err(e) => {
            log::error!("Failed to fetch balance for user {}: {}", user_id, e);
            Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error(500, "Failed to fetch balance")))
        }
    }
}

/// 扣减钱包余额 (应用内消费)
///
/// POST /api/v1/wallet/deduct
///
/// 请求体: DeductRequest; 余额不足返回400
pub async fn deduct_balance(
    data: web::Data<AppState>,
    request: web::Json<DeductRequest>,
) -> ActixResult<HttpResponse> {
    let request = request.into_inner();
    let wallet_service = WalletService::new(data.db_pool.clone());

    match wallet_service.deduct(&request.user_id, request.amount).await {
        Ok(balance_minor) => Ok(HttpResponse::Ok()
            .json(ApiResponse::success(BalanceResponse::new(request.user_id, balance_minor)))),
        Err(WalletError::NotFound(user_id)) => {
            log::warn!("Deduct for unknown wallet: {}", user_id);
            Ok(HttpResponse::NotFound().json(ApiResponse::<()>::error(404, "User not found")))
        }
        Err(WalletError::InsufficientBalance(user_id)) => {
            log::warn!("Insufficient balance for user {}", user_id);
            Ok(HttpResponse::BadRequest()
                .json(ApiResponse::<()>::error(400, "Insufficient balance")))
        }
        Err(WalletError::InvalidAmount(reason)) => {
            Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(400, &reason)))
        }
        Err(WalletError::Storage(e)) => {
            log::error!("Failed to deduct balance for user {}: {}", request.user_id, e);
            Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error(500, "Internal server error")))
        }
    }
}

/// 查询充值流水
///
/// GET /api/v1/wallet/history/{user_id}?limit=20
pub async fn get_wallet_history(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();
    let wallet_service = WalletService::new(data.db_pool.clone());

    match wallet_service.get_history(&user_id, query.limit()).await {
        Ok(entries) => {
            let history = entries.iter().map(|entry| entry.to_item()).collect();
            Ok(HttpResponse::Ok().json(ApiResponse::success(HistoryResponse { user_id, history })))
        }
        Err(e) => {
            log::error!("Failed to fetch wallet history for user {}: {}", user_id, e);
            Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error(500, "Failed to fetch wallet history")))
        }
    }
}

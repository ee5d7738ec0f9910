// 系统状态处理器

use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::Serialize;

use crate::models::ApiResponse;
use crate::state::AppState;

/// 健康检查响应
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
}

/// 健康检查
///
/// GET /health
pub async fn health_check(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&data.db_pool).await {
        Ok(_) => Ok(HttpResponse::Ok().json(HealthStatus {
            status: "ok",
            database: "up",
        })),
        Err(e) => {
            log::error!("Health check failed: {}", e);
            Ok(HttpResponse::ServiceUnavailable().json(HealthStatus {
                status: "degraded",
                database: "down",
            }))
        }
    }
}

/// 版本信息
#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: &'static str,
}

/// 版本查询
///
/// GET /api/v1/version
pub async fn version_info() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(VersionInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })))
}

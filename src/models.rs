// 数据模型定义
// 包含订单、钱包、支付通知等核心数据结构

mod notify;
mod order;
mod wallet;

// 重新导出核心类型
pub use notify::*;
pub use order::*;
pub use wallet::*;

use serde::Serialize;

/// 标准API响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// 响应状态码
    pub code: i32,
    /// 响应消息
    pub message: String,
    /// 响应数据
    pub data: Option<T>,
    /// 响应时间戳
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "Success".to_string(),
            data: Some(data),
            timestamp: chrono::Utc::now(),
        }
    }

    /// 创建错误响应
    pub fn error(code: i32, message: &str) -> ApiResponse<()> {
        ApiResponse {
            code,
            message: message.to_string(),
            data: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

// API处理器模块
// 包含所有HTTP请求处理逻辑

pub mod health_handlers;
pub mod notify_handlers;
pub mod order_handlers;
pub mod wallet_handlers;

// 重新导出处理器
pub use health_handlers::*;
pub use notify_handlers::*;
pub use order_handlers::*;
pub use wallet_handlers::*;

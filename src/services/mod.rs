// 服务层模块
// 包含订单、钱包与回调对账的业务逻辑

pub mod order_service;
pub mod reconcile_service;
pub mod wallet_service;

// 重新导出服务
pub use order_service::OrderService;
pub use reconcile_service::{CreditOutcome, ReconcileError, ReconcileService};
pub use wallet_service::{WalletError, WalletService};

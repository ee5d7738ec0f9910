// 应用状态管理
// 包含数据库连接池、配置信息等全局状态

use actix_web::web;
use sqlx::PgPool;

use crate::config::Config;

/// 应用全局状态
///
/// 连接池在进程启动时创建一次, 生命周期与进程一致
/// (取代源系统里按模块缓存数据库句柄的做法)。
pub struct AppState {
    /// 数据库连接池
    pub db_pool: PgPool,
    /// 应用配置
    pub config: Config,
}

impl AppState {
    /// 创建新的应用状态实例
    pub fn new(db_pool: PgPool, config: Config) -> Self {
        Self { db_pool, config }
    }

    /// 创建测试用的应用状态
    ///
    /// 连接池懒建立, 不触碰存储层的测试不需要真实数据库。
    #[cfg(test)]
    pub fn new_for_test() -> Self {
        use sqlx::postgres::PgPoolOptions;

        let config = Config::default();
        let db_pool = PgPoolOptions::new()
            .max_connections(2)
            .connect_lazy(&config.database.url)
            .expect("Failed to build lazy test pool");

        Self::new(db_pool, config)
    }
}

/// 应用状态数据类型别名
pub type AppStateData = web::Data<AppState>;

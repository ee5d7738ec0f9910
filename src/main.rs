mod config;
mod handlers;
mod models;
mod providers;
mod routes;
mod services;
mod state;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use chrono::Local;
use log::info;
use sqlx::postgres::PgPoolOptions;
use std::error::Error;
use std::io;
use std::io::Write;
use std::time::Duration;

use crate::config::Config;
use crate::routes::{api_v1_routes, notify_routes, public_routes};
use crate::state::AppState;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 初始化日志
    let mut log_builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    log_builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S %:z"),
                record.level(),
                record.args()
            )
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e)) // 转换为 io::Result
        })
        .init();

    // 加载并校验配置
    let config = Config::from_env()?;
    config.validate()?;

    // 建立数据库连接池
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout))
        .connect(&config.database.url)
        .await?;

    // 执行数据库迁移
    sqlx::migrate!("./migrations").run(&db_pool).await?;
    info!("Database migrations applied");

    let bind_address = config.bind_address();
    let workers = config.server.workers;

    let app_state = web::Data::new(AppState::new(db_pool, config));

    info!("Starting server at http://{}", bind_address);

    let mut server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .service(api_v1_routes())
            .service(notify_routes())
            .service(public_routes())
    })
    .bind(&bind_address)?;

    if let Some(workers) = workers {
        server = server.workers(workers);
    }

    server.run().await?;
    Ok(())
}

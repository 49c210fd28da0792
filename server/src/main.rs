use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use taskflow_server::config::Config;
use taskflow_server::db::Database;
use taskflow_server::gemini::GeminiClient;
use taskflow_server::repository::TaskRepository;
use taskflow_server::routes;
use taskflow_server::suggest::SuggestionService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();

    // The one database handle for this process.
    let db = Database::connect(&config.database_url)
        .await
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    db.migrate()
        .await
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;

    let repo = web::Data::new(TaskRepository::new(db.clone()));
    let suggestions = web::Data::new(SuggestionService::new(Arc::new(
        GeminiClient::from_config(&config),
    )));

    log::info!("listening on {}", config.bind);
    let result = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(repo.clone())
            .app_data(suggestions.clone())
            .configure(routes::configure)
    })
    .bind(&config.bind)?
    .run()
    .await;

    db.close().await;
    result
}

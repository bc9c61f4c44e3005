mod audit;
mod auth;
mod config;
mod db;
mod error;
mod geometry;
mod import;
mod schema;
mod services;
mod species;
mod state;
#[cfg(test)]
mod test_support;

use crate::config::{Command, Config};
use crate::db::{users, Database};
use crate::species::{CsvSpeciesFacade, SpeciesFacade, StaticSpeciesFacade};
use crate::state::AppState;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use std::io;
use std::sync::Arc;

fn species_facade(config: &Config) -> Arc<dyn SpeciesFacade> {
    match &config.species_file {
        Some(path) => {
            info!("species names from {}", path.display());
            Arc::new(CsvSpeciesFacade::new(path))
        }
        None => {
            warn!("no species file configured, every species name will be unmatched");
            Arc::new(StaticSpeciesFacade::default())
        }
    }
}

async fn serve(config: Config, db: Database) -> io::Result<()> {
    let time_zone = config.default_time_zone().map_err(io::Error::other)?;
    std::fs::create_dir_all(&config.media_root)?;
    let limit = config.max_upload_bytes();
    let state = AppState {
        db,
        species: species_facade(&config),
        media_root: config.media_root.clone(),
        time_zone,
        max_upload_bytes: limit,
    };

    info!(
        "Server running at http://{}:{} (database {}, time zone {})",
        config.host,
        config.port,
        state.db.path().display(),
        time_zone
    );
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(services::json_config(limit))
            .app_data(services::query_config())
            .app_data(services::path_config())
            .app_data(web::Data::new(state.clone()))
            .configure(services::configure)
            .default_service(web::route().to(services::not_found))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let config = Config::parse();
    let db = Database::new(&config.database);
    db.migrate().map_err(io::Error::other)?;

    match config.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(config, db).await,
        Command::CreateUser {
            username,
            email,
            first_name,
            last_name,
            superuser,
        } => {
            let conn = db.connect().map_err(io::Error::other)?;
            let (user, token) = users::insert(
                &conn,
                &users::NewUser {
                    username: &username,
                    first_name: &first_name,
                    last_name: &last_name,
                    email: &email,
                    is_superuser: superuser,
                },
            )
            .map_err(io::Error::other)?;
            info!("user {} created with id {}", user.username, user.id);
            println!("{token}");
            Ok(())
        }
    }
}

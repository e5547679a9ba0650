mod docx_parser;
mod errors;
mod extractor;
mod graph_manager;
mod graph_model;
mod handlers;
mod initialization;
mod logging;
mod pdf_parser;
mod token_manager;
mod tree_walker;

use actix_web::{web, App, HttpServer};
use log::info;
use crate::errors::UnrecoverableError;
use crate::handlers::{configure, AppState};
use crate::initialization::{config, tls_config};

#[actix_web::main]
async fn main() -> Result<(), UnrecoverableError> {
    // Load configuration and start logging
    let config = config()?;
    info!("starting for site {}{}", config.site.hostname, config.site.path);

    let state = web::Data::new(AppState::new(&config)?);
    let web_server = &config.web_server;
    let address = (web_server.bind_address.as_str(), web_server.bind_port);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(configure)
    });
    if let Some(workers) = web_server.workers {
        server = server.workers(workers);
    }

    let server = match tls_config(web_server)? {
        Some(tls) => {
            info!("listening on https://{}:{}", address.0, address.1);
            server.bind_rustls_0_23(address, tls)?
        }
        None => {
            info!("listening on http://{}:{}", address.0, address.1);
            server.bind(address)?
        }
    };

    server.run().await?;

    Ok(())
}

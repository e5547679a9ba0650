use std::time::Duration;
use actix_web::{get, web, HttpResponse, Responder};
use log::{info, warn};
use serde::Deserialize;
use crate::errors::{ApiError, GraphError};
use crate::extractor::extract_blocking;
use crate::graph_manager::GraphClient;
use crate::graph_model::FileContent;
use crate::initialization::{Config, Site};
use crate::token_manager::TokenProvider;
use crate::tree_walker::{FolderErrorPolicy, TreeWalker};

/// Number of folders left out of a `/list-files` answer
pub const SKIPPED_FOLDERS_HEADER: &str = "X-Skipped-Folders";

/// Shared, read-only state of all workers
///
pub struct AppState {
    pub tokens: TokenProvider,
    pub graph: GraphClient,
    pub site: Site,
    pub policy: FolderErrorPolicy,
}

impl AppState {

    /// Builds the state from configuration
    ///
    /// # Arguments
    ///
    /// * 'config' - configuration struct, credentials included
    pub fn new(config: &Config) -> Result<Self, GraphError> {
        let token_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.graph.timeout_secs))
            .build()?;

        Ok(AppState {
            tokens: TokenProvider::new(token_client, config.credentials.clone(), &config.azure),
            graph: GraphClient::new(&config.graph)?,
            site: config.site.clone(),
            policy: config.traversal.on_folder_error,
        })
    }
}

#[derive(Deserialize)]
struct FileParams {
    file_id: Option<String>,
}

/// Registers all routes
///
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(home)
        .service(get_sites)
        .service(get_site_id)
        .service(list_files)
        .service(get_file_content);
}

#[get("/")]
async fn home() -> impl Responder {
    HttpResponse::Ok().body("Hello from the SharePoint bridge backend!")
}

#[get("/get-sites")]
async fn get_sites(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let token = data.tokens.acquire().await?;

    let sites = data.graph
        .list_sites(&token, &data.site.search)
        .await
        .map_err(|e| ApiError::graph("Failed to retrieve sites", e))?;

    Ok(HttpResponse::Ok().json(sites))
}

#[get("/get-site-id")]
async fn get_site_id(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let token = data.tokens.acquire().await?;

    let site = data.graph
        .get_site(&token, &data.site.hostname, &data.site.path)
        .await
        .map_err(|e| ApiError::graph("Failed to retrieve site", e))?;

    Ok(HttpResponse::Ok().json(site))
}

#[get("/list-files")]
async fn list_files(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let token = data.tokens.acquire().await?;

    let drive = data.graph
        .find_drive(&token, &data.site.id, &data.site.drive_name)
        .await
        .map_err(|e| ApiError::graph("Failed to retrieve drives", e))?;

    let listing = TreeWalker::new(&data.graph, &token, data.policy)
        .list_all_files(&drive.id, None)
        .await
        .map_err(|e| ApiError::graph("Failed to list files", e))?;

    for skipped in &listing.skipped {
        warn!("folder {:?} left out of listing: {}", skipped.folder_id, skipped.error);
    }
    info!("listed {} files, {} folders skipped", listing.files.len(), listing.skipped.len());
    Ok(HttpResponse::Ok()
        .insert_header((SKIPPED_FOLDERS_HEADER, listing.skipped.len().to_string()))
        .json(listing.files))
}

#[get("/get-file-content")]
async fn get_file_content(data: web::Data<AppState>, params: web::Query<FileParams>) -> Result<HttpResponse, ApiError> {
    let file_id = params.into_inner().file_id
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ApiError::MissingInput("Missing file_id parameter".to_string()))?;

    let token = data.tokens.acquire().await?;

    let drive = data.graph
        .find_drive(&token, &data.site.id, &data.site.drive_name)
        .await
        .map_err(|e| ApiError::graph("Failed to retrieve drives", e))?;

    let download = data.graph
        .download_content(&token, &drive.id, &file_id)
        .await
        .map_err(|e| ApiError::graph("Failed to download file", e))?;

    let content_type = download.content_type;
    let extracted_text = extract_blocking(download.bytes, content_type.clone(), file_id.clone()).await?;

    Ok(HttpResponse::Ok().json(FileContent {
        file_id,
        content_type,
        extracted_text,
    }))
}

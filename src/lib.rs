use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod db;
pub mod pdf;
pub mod report;
pub mod storage;
pub mod template;

pub use crate::db::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    /// Human-readable reason, shown to the operator as-is.
    pub error: String,
    #[schema(example = "InvalidStateError")]
    pub kind: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(kind: &str, message: &str) -> Self {
        Self {
            success: false,
            error: message.to_string(),
            kind: kind.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::template::handlers::upload_template,
        crate::template::handlers::list_templates,
        crate::template::handlers::get_active_template,
        crate::template::handlers::activate_template,
        crate::template::handlers::deactivate_template,
        crate::template::handlers::delete_template,
        crate::report::handlers::render_exam_result,
        crate::report::handlers::render_progress,
        crate::report::handlers::render_certificate
    ),
    components(
        schemas(
            template::TemplateRecord,
            template::model::UploadTemplateResponse,
            template::model::TemplateActionResponse,
            report::ExamResultRequest,
            report::exam_result::AssessmentAspect,
            report::ProgressReportRequest,
            report::progress::ProgressEntry,
            report::progress::ProgressStatus,
            report::CertificateRequest,
            report::StudentIdentity,
            pdf::SignatureAsset,
            pdf::SignerRole,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Template Service", description = "Certificate template lifecycle."),
        (name = "Reports", description = "Exam result, progress and certificate PDFs.")
    ),
    servers(
        (url = "http://127.0.0.1:8080", description = "Localhost")
    )
)]
pub struct ApiDoc;

pub async fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match config::AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    let app_state = match AppState::new(&config).await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!(
                "Failed to initialise application state. Check DATABASE_URL and the storage settings. Error: {}",
                e
            );
            return Err(e);
        }
    };

    let prometheus = PrometheusMetricsBuilder::new("tahfidz_docs_server")
        .endpoint("/metrics")
        .build()
        .map_err(|e| anyhow::anyhow!("failed to create Prometheus metrics middleware: {}", e))?;

    std::fs::create_dir_all(&config.assets_root)?;
    let assets_root = config.assets_root.clone();

    log::info!(
        "Starting server at http://{}:{}",
        config.bind_addr,
        config.port
    );

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://127.0.0.1:8080")
            .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
            ])
            .expose_headers(vec![header::CONTENT_DISPOSITION])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus.clone())
            .wrap(cors)
            .app_data(app_state.clone())
            .app_data(web::JsonConfig::default().limit(16 * 1024 * 1024))
            .service(
                web::scope("/api")
                    .configure(template::handlers::config)
                    .configure(report::handlers::config),
            )
            .service(actix_files::Files::new(storage::PUBLIC_PREFIX, assets_root.clone()))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}

use actix_web::http::header::{self, ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse, Responder};
use log::{error, info, warn};

use super::service::RenderOptions;
use super::{
    CertificateRequest, ExamResultRequest, GeneratedDocument, ProgressReportRequest, RenderError,
    ReportRequest,
};
use crate::db::AppState;
use crate::ErrorResponse;

/// PDF body with the filename derived from the subject's name.
pub fn pdf_response(document: GeneratedDocument, inline: bool) -> HttpResponse {
    let disposition = ContentDisposition {
        disposition: if inline {
            DispositionType::Inline
        } else {
            DispositionType::Attachment
        },
        parameters: vec![DispositionParam::Filename(document.filename)],
    };
    HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((header::CONTENT_DISPOSITION, disposition))
        .body(document.pdf)
}

pub fn render_error_response(err: &RenderError) -> HttpResponse {
    match err {
        RenderError::InvalidRequest(message) => {
            warn!("Report request rejected: {}", message);
            HttpResponse::BadRequest().json(ErrorResponse::bad_request(message))
        }
        RenderError::NoActiveTemplate => {
            warn!("Certificate requested with no active template");
            HttpResponse::Conflict().json(ErrorResponse::new("NoActiveTemplate", &err.to_string()))
        }
        RenderError::AssetUnreachable { .. } => {
            error!("Report render failed: {}", err);
            HttpResponse::BadGateway().json(ErrorResponse::new("AssetUnreachable", &err.to_string()))
        }
        _ => {
            error!("Report render failed: {}", err);
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error(&err.to_string()))
        }
    }
}

async fn render<R: ReportRequest>(
    data: &AppState,
    request: &R,
    options: &RenderOptions,
) -> HttpResponse {
    match data.reports.render(request, options).await {
        Ok(document) => {
            info!("Serving {} (inline: {})", document.filename, options.inline);
            pdf_response(document, options.inline)
        }
        Err(e) => render_error_response(&e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Reports",
    post,
    path = "/reports/exam-result",
    params(RenderOptions),
    request_body = ExamResultRequest,
    responses(
        (status = 200, description = "PDF document", body = Vec<u8>, content_type = "application/pdf"),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn render_exam_result(
    data: web::Data<AppState>,
    options: web::Query<RenderOptions>,
    request: web::Json<ExamResultRequest>,
) -> impl Responder {
    info!("Executing render_exam_result for {}", request.student.name);
    render(&data, &request.into_inner(), &options).await
}

#[utoipa::path(
    context_path = "/api",
    tag = "Reports",
    post,
    path = "/reports/progress",
    params(RenderOptions),
    request_body = ProgressReportRequest,
    responses(
        (status = 200, description = "PDF document", body = Vec<u8>, content_type = "application/pdf"),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn render_progress(
    data: web::Data<AppState>,
    options: web::Query<RenderOptions>,
    request: web::Json<ProgressReportRequest>,
) -> impl Responder {
    info!("Executing render_progress for {}", request.student.name);
    render(&data, &request.into_inner(), &options).await
}

#[utoipa::path(
    context_path = "/api",
    tag = "Reports",
    post,
    path = "/reports/certificate",
    params(RenderOptions),
    request_body = CertificateRequest,
    responses(
        (status = 200, description = "PDF document", body = Vec<u8>, content_type = "application/pdf"),
        (status = 400, description = "Invalid or ineligible request", body = ErrorResponse),
        (status = 409, description = "No active template", body = ErrorResponse),
        (status = 502, description = "Template file unreachable", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn render_certificate(
    data: web::Data<AppState>,
    options: web::Query<RenderOptions>,
    request: web::Json<CertificateRequest>,
) -> impl Responder {
    info!("Executing render_certificate for {}", request.student.name);
    render(&data, &request.into_inner(), &options).await
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/reports/exam-result").route(web::post().to(render_exam_result)),
    )
    .service(web::resource("/reports/progress").route(web::post().to(render_progress)))
    .service(web::resource("/reports/certificate").route(web::post().to(render_certificate)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;

    #[actix_web::test]
    async fn test_pdf_response_headers() {
        let document = GeneratedDocument {
            filename: "Sertifikat_Zaid_bin_Tsabit.pdf".into(),
            pdf: b"%PDF-1.5".to_vec(),
            tanggal: "19 Oktober 2026".into(),
        };
        let response = pdf_response(document, false);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("Sertifikat_Zaid_bin_Tsabit.pdf"));

        let body = to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"%PDF-1.5");
    }

    #[actix_web::test]
    async fn test_inline_disposition() {
        let document = GeneratedDocument {
            filename: "Laporan.pdf".into(),
            pdf: Vec::new(),
            tanggal: String::new(),
        };
        let response = pdf_response(document, true);
        let disposition = response.headers().get(header::CONTENT_DISPOSITION).unwrap();
        assert!(disposition.to_str().unwrap().starts_with("inline"));
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            render_error_response(&RenderError::NoActiveTemplate).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            render_error_response(&RenderError::InvalidRequest("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }
}

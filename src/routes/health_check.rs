use actix_web::HttpResponse;

/// GET /health_check
///
/// Liveness only; neither the whitelist nor the directory is touched.
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().finish()
}

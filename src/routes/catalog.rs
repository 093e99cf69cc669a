use axum::{
    Json, Router,
    extract::Path,
    routing::get,
};

use crate::{
    catalog::{Catalog, CatalogService, all_catalogs, catalog},
    error::{AppError, AppResult},
    response::ApiResponse,
    state::AppState,
    types::CatalogKind,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_catalogs))
        .route("/{catalog}", get(get_catalog))
        .route("/{catalog}/services/{service_id}", get(get_service))
}

/// Unknown catalog names are a missing resource, not a bad request.
pub fn parse_catalog(raw: &str) -> AppResult<CatalogKind> {
    raw.trim()
        .to_lowercase()
        .parse()
        .map_err(|_| AppError::NotFound)
}

#[utoipa::path(
    get,
    path = "/api/catalog",
    responses(
        (status = 200, description = "Every service catalog", body = ApiResponse<Vec<Catalog>>)
    ),
    tag = "Catalog"
)]
pub async fn list_catalogs() -> Json<ApiResponse<Vec<&'static Catalog>>> {
    Json(ApiResponse::success("Catalogs", all_catalogs().to_vec(), None))
}

#[utoipa::path(
    get,
    path = "/api/catalog/{catalog}",
    params(("catalog" = String, Path, description = "business, data or website")),
    responses(
        (status = 200, description = "One catalog", body = ApiResponse<Catalog>),
        (status = 404, description = "Unknown catalog")
    ),
    tag = "Catalog"
)]
pub async fn get_catalog(Path(raw): Path<String>) -> AppResult<Json<ApiResponse<&'static Catalog>>> {
    let kind = parse_catalog(&raw)?;
    Ok(Json(ApiResponse::success("Catalog", catalog(kind), None)))
}

#[utoipa::path(
    get,
    path = "/api/catalog/{catalog}/services/{service_id}",
    params(
        ("catalog" = String, Path, description = "business, data or website"),
        ("service_id" = String, Path, description = "Service ID")
    ),
    responses(
        (status = 200, description = "One service", body = ApiResponse<CatalogService>),
        (status = 404, description = "Unknown catalog or service")
    ),
    tag = "Catalog"
)]
pub async fn get_service(
    Path((raw, service_id)): Path<(String, String)>,
) -> AppResult<Json<ApiResponse<&'static CatalogService>>> {
    let kind = parse_catalog(&raw)?;
    let service = catalog(kind).find(&service_id).ok_or(AppError::NotFound)?;
    Ok(Json(ApiResponse::success("Service", service, None)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_names_are_case_insensitive() {
        assert_eq!(parse_catalog(" Business ").expect("business"), CatalogKind::Business);
        assert!(matches!(parse_catalog("groceries"), Err(AppError::NotFound)));
    }
}

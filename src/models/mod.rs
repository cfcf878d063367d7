pub mod additional_payment;
pub mod department;
pub mod leave;
pub mod payroll;
pub mod user;

/// Body of every status-update request.
#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
pub struct StatusUpdateRequest {
    #[schema(example = "approved")]
    pub status: Option<String>,
}

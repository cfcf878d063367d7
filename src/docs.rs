use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::authz::{Capabilities, CapabilityMatrix, RoleName};
use crate::lifecycle::ReviewMeta;
use crate::models;
use crate::routes::{additional_payments, health, leaves, payrolls, users};

struct BearerAuth;

impl Modify for BearerAuth {
	fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
		let components = openapi.components.get_or_insert_with(Default::default);
		components.add_security_scheme(
			"bearerAuth",
			SecurityScheme::Http(
				HttpBuilder::new()
					.scheme(HttpAuthScheme::Bearer)
					.bearer_format("JWT")
					.build(),
			),
		);
	}
}

#[derive(OpenApi)]
#[openapi(
	paths(
		health::health,
		users::me,
		users::list_users,
		payrolls::list_payrolls,
		payrolls::get_payroll,
		payrolls::create_payroll,
		payrolls::update_payroll,
		payrolls::delete_payroll,
		payrolls::update_payroll_status,
		additional_payments::list_additional_payments,
		additional_payments::get_additional_payment,
		additional_payments::create_additional_payment,
		additional_payments::update_additional_payment,
		additional_payments::delete_additional_payment,
		additional_payments::update_additional_payment_status,
		leaves::list_leaves,
		leaves::get_leave,
		leaves::create_leave,
		leaves::update_leave,
		leaves::delete_leave,
		leaves::update_leave_status
	),
	components(
		schemas(
			health::HealthResponse,
			models::StatusUpdateRequest,
			models::user::User,
			models::user::PrincipalSummary,
			models::department::Department,
			models::payroll::Payroll,
			models::payroll::PayrollCreateRequest,
			models::payroll::PayrollUpdateRequest,
			models::additional_payment::AdditionalPayment,
			models::additional_payment::AdditionalPaymentCreateRequest,
			models::additional_payment::AdditionalPaymentUpdateRequest,
			models::leave::LeaveRequest,
			models::leave::LeaveCreateRequest,
			models::leave::LeaveUpdateRequest,
			ReviewMeta,
			RoleName,
			Capabilities,
			CapabilityMatrix
		)
	),
	modifiers(&BearerAuth),
	tags(
		(name = "Health", description = "Service health"),
		(name = "Users", description = "Caller identity and employee directory"),
		(name = "Payroll", description = "Monthly payroll records"),
		(name = "Additional payments", description = "One-off payments"),
		(name = "Leave", description = "Leave requests")
	)
)]
pub struct ApiDoc;

pub fn build_openapi() -> utoipa::openapi::OpenApi {
	ApiDoc::openapi()
}

pub fn swagger_routes() -> SwaggerUi {
	SwaggerUi::new("/docs").url("/api-docs/openapi.json", build_openapi())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn document_lists_status_endpoints_and_bearer_scheme() {
		let doc = serde_json::to_value(build_openapi()).unwrap();
		assert!(doc["paths"]["/leaves/{id}/status"]["patch"].is_object());
		assert!(doc["paths"]["/payrolls/{id}/status"]["patch"].is_object());
		assert!(doc["components"]["securitySchemes"]["bearerAuth"].is_object());
	}
}

use crate::api::leave_request::{LeaveListResponse, RejectBody};
use crate::model::balance::LeaveBalance;
use crate::model::leave_type::LeaveType;
use crate::model::request::{LeaveRequest, LeaveRequestDetail};
use crate::model::status::LeaveStatus;
use crate::model::user::{UserProfile, UserRecord};
use crate::service::NewRequestInput;
use crate::store::{StatsRow, SummaryRow};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leavedesk API",
        version = "1.0.0",
        description = r#"
## Leavedesk

Leave-management service: leave types, per-year balances, and the request
lifecycle (create, approve, reject, cancel) with balance consistency under
concurrent updates.

### Security
All endpoints require a **JWT Bearer token** issued by the identity provider.
Approve/reject and reporting require the **ADMIN** role.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_type::list_leave_types,

        crate::api::balance::my_balances,
        crate::api::balance::user_balances,

        crate::api::leave_request::create_request,
        crate::api::leave_request::my_requests,
        crate::api::leave_request::get_request,
        crate::api::leave_request::cancel_request,
        crate::api::leave_request::all_requests,
        crate::api::leave_request::approve_request,
        crate::api::leave_request::reject_request,

        crate::api::report::summary,
        crate::api::report::stats,

        crate::api::user::sync_user
    ),
    components(
        schemas(
            LeaveType,
            LeaveBalance,
            LeaveStatus,
            LeaveRequest,
            LeaveRequestDetail,
            LeaveListResponse,
            NewRequestInput,
            RejectBody,
            SummaryRow,
            StatsRow,
            UserProfile,
            UserRecord
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request lifecycle APIs"),
        (name = "Leave Types", description = "Catalog APIs"),
        (name = "Balances", description = "Balance ledger APIs"),
        (name = "Reports", description = "Aggregated reporting APIs"),
        (name = "Users", description = "Directory sync APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

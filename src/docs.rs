use crate::api::attendance::{CheckoutRequest, LocationHistoryEntry};
use crate::api::holiday::CreateHoliday;
use crate::api::leave::{CreateLeave, LeaveListResponse};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, Coordinates, LocationStamp};
use crate::model::holiday::Holiday;
use crate::model::leave::{LeaveRequest, LeaveStatus, LeaveType};
use crate::model::user::UserInfo;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attend API",
        version = "1.0.0",
        description = r#"
## Employee attendance tracking

Daily check-in with photo and location evidence, periodic location tracking
while checked in, and check-out with worked-hours computation.

### 🔹 Key Features
- **Attendance**
  - Check-in with photo + location, check-out with early-checkout confirmation
  - Periodic location updates from the tracking agent
  - CSV export and per-day reporting for admins
- **Leave Management**
  - Apply for leave, approve/reject requests
- **Holidays**
  - Admin-managed company holiday calendar
- **User Administration**
  - Block and unblock accounts

### 🔐 Security
All non-auth endpoints require **JWT Bearer authentication**. Reporting and
administration endpoints are restricted to **Admin** accounts.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::mark_attendance,
        crate::api::attendance::mark_checkout,
        crate::api::attendance::today_attendance,
        crate::api::attendance::update_location,
        crate::api::attendance::export_attendance,
        crate::api::attendance::attendance_by_date,
        crate::api::attendance::location_history,

        crate::api::leave::create_leave,
        crate::api::leave::leave_list,
        crate::api::leave::get_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,

        crate::api::holiday::list_holidays,
        crate::api::holiday::create_holiday,
        crate::api::holiday::delete_holiday,

        crate::api::user::list_users,
        crate::api::user::block_user,
        crate::api::user::unblock_user,
    ),
    components(
        schemas(
            AttendanceRecord,
            AttendanceStatus,
            Coordinates,
            LocationStamp,
            CheckoutRequest,
            LocationHistoryEntry,
            CreateLeave,
            LeaveRequest,
            LeaveType,
            LeaveStatus,
            LeaveListResponse,
            Holiday,
            CreateHoliday,
            UserInfo
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in / check-out lifecycle and location tracking"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Holiday", description = "Holiday calendar APIs"),
        (name = "Users", description = "User administration APIs"),
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

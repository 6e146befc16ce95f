//! Demo workforce loaded into the in-memory store at startup.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::geo::{AssignedLocation, Coordinate};
use crate::model::{
    appraisal::{Appraisal, AppraisalStatus, Goal, GoalStatus},
    attendance::{Attendance, AttendanceStatus},
    employee::Employee,
    leave_request::{LeaveRequest, LeaveType},
    request_status::RequestStatus,
    role::Role,
    transfer::Transfer,
    user::User,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn time(h: u32, m: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(h, m, 0)
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    date(y, m, d).and_time(NaiveTime::MIN).and_utc()
}

fn place(name: &str, lat: f64, lng: f64) -> Option<AssignedLocation> {
    Some(AssignedLocation::new(name, Coordinate { lat, lng }))
}

#[allow(clippy::too_many_arguments)]
fn employee(
    id: u64,
    code: &str,
    name: &str,
    email: &str,
    role: Role,
    department: &str,
    designation: &str,
    joining_date: NaiveDate,
    reporting_manager: Option<u64>,
    current_posting: &str,
    assigned_location: Option<AssignedLocation>,
) -> Employee {
    Employee {
        id,
        employee_code: code.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        phone: Some(format!("+91 98100 0000{id}")),
        role,
        department: department.to_string(),
        designation: designation.to_string(),
        joining_date,
        reporting_manager,
        current_posting: current_posting.to_string(),
        assigned_location,
    }
}

pub fn employees() -> Vec<Employee> {
    vec![
        employee(
            1,
            "MCD-1001",
            "Rajesh Kumar",
            "rajesh.kumar@mcd.gov.in",
            Role::Employee,
            "Sanitation",
            "Sanitation Inspector",
            date(2018, 4, 2),
            Some(3),
            "Central Zone",
            place("Connaught Place Ward Office", 28.6139, 77.2090),
        ),
        employee(
            2,
            "MCD-1002",
            "Priya Sharma",
            "priya.sharma@mcd.gov.in",
            Role::Employee,
            "Public Health",
            "Health Officer",
            date(2020, 7, 15),
            Some(3),
            "Karol Bagh Zone",
            place("Karol Bagh Dispensary", 28.6519, 77.1909),
        ),
        employee(
            3,
            "MCD-0901",
            "Amit Verma",
            "amit.verma@mcd.gov.in",
            Role::Manager,
            "Sanitation",
            "Zonal Sanitation Superintendent",
            date(2012, 1, 9),
            None,
            "Civic Centre",
            place("Civic Centre, Minto Road", 28.6366, 77.2244),
        ),
        employee(
            4,
            "MCD-0501",
            "Sunita Rao",
            "sunita.rao@mcd.gov.in",
            Role::Hr,
            "Human Resources",
            "Deputy Commissioner (HR)",
            date(2010, 3, 1),
            None,
            "Civic Centre",
            None,
        ),
        employee(
            5,
            "MCD-0101",
            "Vikram Singh",
            "vikram.singh@mcd.gov.in",
            Role::Admin,
            "Administration",
            "System Administrator",
            date(2015, 11, 20),
            None,
            "Civic Centre",
            None,
        ),
        employee(
            6,
            "MCD-1003",
            "Neha Gupta",
            "neha.gupta@mcd.gov.in",
            Role::Employee,
            "Engineering",
            "Junior Engineer",
            date(2023, 2, 6),
            Some(3),
            "Shahdara Zone",
            None,
        ),
    ]
}

/// One account per seeded employee, logging in with the work email.
pub fn users(password_hash: Option<&str>) -> Vec<User> {
    employees()
        .into_iter()
        .map(|e| User {
            id: e.id,
            username: e.email,
            password_hash: password_hash.map(str::to_string),
            role: e.role,
            employee_id: Some(e.id),
            is_active: true,
            last_login_at: None,
        })
        .collect()
}

fn day(
    id: u64,
    employee_id: u64,
    date: NaiveDate,
    status: AttendanceStatus,
    reading: Option<(f64, f64, f64)>,
) -> Attendance {
    let present = matches!(status, AttendanceStatus::Present | AttendanceStatus::HalfDay);
    Attendance {
        id,
        employee_id,
        date,
        check_in: if present { time(9, 5) } else { None },
        check_out: if present { time(17, 40) } else { None },
        location: reading.map(|(lat, lng, _)| Coordinate { lat, lng }),
        distance_m: reading.map(|(_, _, d)| d),
        geo_hazri_compliant: reading.is_some_and(|(_, _, d)| d <= 1_000.0),
        status,
    }
}

pub fn attendance() -> Vec<Attendance> {
    use AttendanceStatus::*;
    vec![
        day(1, 1, date(2026, 1, 5), Present, Some((28.6142, 77.2095, 58.0))),
        day(2, 1, date(2026, 1, 6), Present, Some((28.6150, 77.2081, 148.0))),
        day(3, 1, date(2026, 1, 7), Present, Some((28.6290, 77.2090, 1679.0))),
        day(4, 1, date(2026, 1, 8), Leave, None),
        day(5, 1, date(2026, 1, 9), Present, Some((28.6137, 77.2093, 36.0))),
        day(6, 2, date(2026, 1, 5), Present, Some((28.6521, 77.1911, 30.0))),
        day(7, 2, date(2026, 1, 6), HalfDay, Some((28.6515, 77.1905, 59.0))),
        day(8, 2, date(2026, 1, 7), Absent, None),
        day(9, 2, date(2026, 1, 8), Present, Some((28.6522, 77.1912, 45.0))),
        day(10, 3, date(2026, 1, 5), Present, Some((28.6368, 77.2246, 29.0))),
        day(11, 3, date(2026, 1, 6), Present, Some((28.6365, 77.2242, 22.0))),
    ]
}

pub fn leaves() -> Vec<LeaveRequest> {
    vec![
        LeaveRequest {
            id: 1,
            employee_id: 1,
            leave_type: LeaveType::Casual,
            from_date: date(2026, 1, 8),
            to_date: date(2026, 1, 8),
            reason: "Family function".to_string(),
            status: RequestStatus::Approved,
            approved_by: Some(3),
            created_at: at(2026, 1, 2),
        },
        LeaveRequest {
            id: 2,
            employee_id: 1,
            leave_type: LeaveType::Earned,
            from_date: date(2026, 2, 16),
            to_date: date(2026, 2, 20),
            reason: "Travel to home town".to_string(),
            status: RequestStatus::Pending,
            approved_by: None,
            created_at: at(2026, 1, 20),
        },
        LeaveRequest {
            id: 3,
            employee_id: 2,
            leave_type: LeaveType::Medical,
            from_date: date(2026, 1, 7),
            to_date: date(2026, 1, 7),
            reason: "Fever".to_string(),
            status: RequestStatus::Pending,
            approved_by: None,
            created_at: at(2026, 1, 7),
        },
    ]
}

pub fn transfers() -> Vec<Transfer> {
    vec![
        Transfer {
            id: 1,
            employee_id: 1,
            from_location: "Central Zone".to_string(),
            to_location: "South Zone".to_string(),
            request_date: date(2025, 12, 1),
            approval_date: None,
            status: RequestStatus::Pending,
            reason: "Closer to residence".to_string(),
            score: 78,
        },
        Transfer {
            id: 2,
            employee_id: 2,
            from_location: "Rohini Zone".to_string(),
            to_location: "Karol Bagh Zone".to_string(),
            request_date: date(2024, 5, 10),
            approval_date: Some(date(2024, 6, 3)),
            status: RequestStatus::Approved,
            reason: "Spouse posted in Karol Bagh".to_string(),
            score: 85,
        },
        Transfer {
            id: 3,
            employee_id: 6,
            from_location: "Shahdara Zone".to_string(),
            to_location: "Central Zone".to_string(),
            request_date: date(2026, 1, 12),
            approval_date: None,
            status: RequestStatus::Pending,
            reason: "Project reassignment".to_string(),
            score: 62,
        },
    ]
}

pub fn appraisals() -> Vec<Appraisal> {
    vec![
        Appraisal {
            id: 1,
            employee_id: 1,
            year: 2025,
            self_score: Some(85),
            manager_score: Some(78),
            hr_score: Some(80),
            final_score: Some(78),
            attendance_impact: -3,
            geo_hazri_compliance: 92.0,
            beat_coverage: Some(88.0),
            status: AppraisalStatus::Completed,
            goals: vec![Goal {
                id: 1,
                description: "Inspect all 42 ward collection points monthly".to_string(),
                target_date: date(2025, 12, 31),
                status: GoalStatus::Completed,
                self_rating: Some(4),
                manager_rating: Some(4),
            }],
        },
        Appraisal {
            id: 2,
            employee_id: 2,
            year: 2025,
            self_score: Some(90),
            manager_score: None,
            hr_score: None,
            final_score: None,
            attendance_impact: 0,
            geo_hazri_compliance: 98.5,
            beat_coverage: None,
            status: AppraisalStatus::Submitted,
            goals: vec![Goal {
                id: 1,
                description: "Run vaccination camps in 6 wards".to_string(),
                target_date: date(2025, 11, 30),
                status: GoalStatus::InProgress,
                self_rating: Some(5),
                manager_rating: None,
            }],
        },
        Appraisal {
            id: 3,
            employee_id: 3,
            year: 2025,
            self_score: Some(88),
            manager_score: Some(86),
            hr_score: Some(90),
            final_score: Some(88),
            attendance_impact: 0,
            geo_hazri_compliance: 99.0,
            beat_coverage: Some(95.0),
            status: AppraisalStatus::Completed,
            goals: Vec::new(),
        },
        Appraisal {
            id: 4,
            employee_id: 6,
            year: 2025,
            self_score: None,
            manager_score: None,
            hr_score: None,
            final_score: None,
            attendance_impact: 0,
            geo_hazri_compliance: 0.0,
            beat_coverage: None,
            status: AppraisalStatus::Draft,
            goals: Vec::new(),
        },
    ]
}

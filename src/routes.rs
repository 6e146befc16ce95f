use crate::{
    api::{analytics, appraisal, attendance, employee, leave_request, transfer},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Per-route limiter: `requests_per_min` burst, refilled evenly over a minute
fn build_limiter(requests_per_min: u32) -> anyhow::Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond((60_000 / requests_per_min as u64).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit: {requests_per_min}/min"))?;
    Ok(Governor::new(&cfg))
}

#[derive(Clone)]
pub struct Limiters {
    login: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    register: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    refresh: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    protected: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
}

impl Limiters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            login: Arc::new(build_limiter(config.rate_login_per_min)?),
            register: Arc::new(build_limiter(config.rate_register_per_min)?),
            refresh: Arc::new(build_limiter(config.rate_refresh_per_min)?),
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(limiters.register.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .route("/session", web::get().to(handlers::current_session))
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("").route(web::get().to(attendance::list_attendance)),
                    )
                    // /attendance/check-in
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    // /attendance/check-in/latest
                    .service(
                        web::resource("/check-in/latest")
                            .route(web::get().to(attendance::latest_check_in)),
                    )
                    // /attendance/check-out
                    .service(
                        web::resource("/check-out").route(web::put().to(attendance::check_out)),
                    )
                    // /attendance/summary
                    .service(
                        web::resource("/summary")
                            .route(web::get().to(attendance::attendance_summary)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // /leave/summary
                    .service(
                        web::resource("/summary").route(web::get().to(leave_request::leave_summary)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    ),
            )
            .service(
                web::scope("/transfer")
                    // /transfer
                    .service(
                        web::resource("")
                            .route(web::get().to(transfer::list_transfers))
                            .route(web::post().to(transfer::create_transfer)),
                    )
                    // /transfer/pending
                    .service(
                        web::resource("/pending").route(web::get().to(transfer::pending_transfers)),
                    )
                    // /transfer/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(transfer::approve_transfer)),
                    )
                    // /transfer/{id}/reject
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(transfer::reject_transfer)),
                    ),
            )
            .service(
                web::scope("/appraisal")
                    .service(web::resource("/me").route(web::get().to(appraisal::my_appraisal)))
                    .service(
                        web::resource("/queue").route(web::get().to(appraisal::appraisal_queue)),
                    )
                    .service(
                        web::resource("/{id}/breakdown")
                            .route(web::get().to(appraisal::score_breakdown)),
                    )
                    .service(
                        web::resource("/{id}/submit")
                            .route(web::put().to(appraisal::submit_self_score)),
                    )
                    .service(
                        web::resource("/{id}/review")
                            .route(web::put().to(appraisal::review_appraisal)),
                    )
                    .service(
                        web::resource("/{id}/finalize")
                            .route(web::put().to(appraisal::finalize_appraisal)),
                    )
                    .service(
                        web::resource("/{id}/goals").route(web::post().to(appraisal::add_goal)),
                    )
                    .service(
                        web::resource("/{id}/goals/{goal_id}")
                            .route(web::put().to(appraisal::update_goal)),
                    ),
            )
            .service(
                web::scope("/employee")
                    // /employee
                    .service(web::resource("").route(web::get().to(employee::list_employees)))
                    // /employee/me
                    .service(web::resource("/me").route(web::get().to(employee::my_profile)))
                    // /employee/{id}
                    .service(web::resource("/{id}").route(web::get().to(employee::get_employee))),
            )
            .service(
                web::scope("/analytics").service(
                    web::resource("/overview").route(web::get().to(analytics::analytics_overview)),
                ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token + rotated refresh_token

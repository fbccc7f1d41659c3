use crate::{
    api::{balance, leave_request, leave_type, report, user},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let sync_limiter = build_limiter(config.rate_sync_per_min);
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/leaves")
                    .service(
                        web::resource("/types")
                            .route(web::get().to(leave_type::list_leave_types)),
                    )
                    .service(
                        web::resource("/balance").route(web::get().to(balance::my_balances)),
                    )
                    .service(
                        web::resource("/balance/{user_id}")
                            .route(web::get().to(balance::user_balances)),
                    )
                    .service(
                        web::resource("/requests")
                            .route(web::post().to(leave_request::create_request))
                            .route(web::get().to(leave_request::my_requests)),
                    )
                    .service(
                        web::resource("/requests/{id}")
                            .route(web::get().to(leave_request::get_request)),
                    )
                    .service(
                        web::resource("/requests/{id}/cancel")
                            .route(web::put().to(leave_request::cancel_request)),
                    )
                    .service(
                        web::scope("/admin")
                            .service(
                                web::resource("/requests")
                                    .route(web::get().to(leave_request::all_requests)),
                            )
                            .service(
                                web::resource("/requests/{id}/approve")
                                    .route(web::put().to(leave_request::approve_request)),
                            )
                            .service(
                                web::resource("/requests/{id}/reject")
                                    .route(web::put().to(leave_request::reject_request)),
                            ),
                    )
                    .service(web::resource("/reports").route(web::get().to(report::summary)))
                    .service(
                        web::resource("/reports/stats").route(web::get().to(report::stats)),
                    ),
            )
            .service(
                web::scope("/users").service(
                    web::resource("/sync")
                        .wrap(sync_limiter)
                        .route(web::post().to(user::sync_user)),
                ),
            ),
    );
}

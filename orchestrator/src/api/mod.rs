use std::sync::Arc;

use governor::DefaultDirectRateLimiter;
use warp::{Filter, Rejection, Reply};

use crate::error::ApiError;
use crate::report::ReportGenerator;

mod report;

/// Largest accepted JSON request body.
const MAX_BODY_BYTES: u64 = 64 * 1024;

pub fn routes(
    generator: Arc<ReportGenerator>,
    limiter: Arc<DefaultDirectRateLimiter>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let api = warp::path("api").and(warp::path("v1"));

    let report_route = api
        .and(warp::path("report"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_rate_limit(limiter.clone()))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_generator(generator.clone()))
        .and_then(report::handle_generate_report);

    let markdown_route = api
        .and(warp::path("report"))
        .and(warp::path("markdown"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_rate_limit(limiter))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_generator(generator))
        .and_then(report::handle_download_report);

    report_route.or(markdown_route)
}

fn with_generator(
    generator: Arc<ReportGenerator>,
) -> impl Filter<Extract = (Arc<ReportGenerator>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || generator.clone())
}

fn with_rate_limit(
    limiter: Arc<DefaultDirectRateLimiter>,
) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::any()
        .and_then(move || {
            let limiter = limiter.clone();
            async move {
                limiter
                    .check()
                    .map_err(|_| warp::reject::custom(ApiError::RateLimitExceeded))
            }
        })
        .untuple_one()
}

use std::sync::Arc;

use tracing::info;
use warp::{Rejection, Reply};

use crate::error::ApiError;
use crate::models::{Report, ReportRequest, ReportResponse};
use crate::report::{ProgressReporter, ReportGenerator};

async fn run(request: ReportRequest, generator: Arc<ReportGenerator>) -> Result<Report, Rejection> {
    info!("Processing report request: {}", request.topic);
    generator
        .generate(&request, ProgressReporter::new())
        .await
        .map_err(|e| warp::reject::custom(ApiError::from(e)))
}

pub async fn handle_generate_report(
    request: ReportRequest,
    generator: Arc<ReportGenerator>,
) -> Result<impl Reply, Rejection> {
    let report = run(request, generator).await?;
    Ok(warp::reply::json(&ReportResponse::from(report)))
}

pub async fn handle_download_report(
    request: ReportRequest,
    generator: Arc<ReportGenerator>,
) -> Result<impl Reply, Rejection> {
    let report = run(request, generator).await?;
    let disposition = format!("attachment; filename=\"{}\"", export_filename(&report.topic));

    Ok(warp::reply::with_header(
        warp::reply::with_header(report.final_text, "Content-Type", "text/markdown; charset=utf-8"),
        "Content-Disposition",
        disposition,
    ))
}

/// `report-<topic slug>.md`, ASCII only.
pub fn export_filename(topic: &str) -> String {
    let mut slug = String::new();
    for c in topic.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug: String = slug.trim_end_matches('-').chars().take(60).collect();
    if slug.is_empty() {
        "report.md".to_string()
    } else {
        format!("report-{}.md", slug)
    }
}

#[cfg(test)]
mod tests {
    use super::export_filename;

    #[test]
    fn filename_is_a_slug_of_the_topic() {
        assert_eq!(export_filename("Quantum Computing"), "report-quantum-computing.md");
        assert_eq!(export_filename("  C++ & Rust?  "), "report-c-rust.md");
        assert_eq!(export_filename("日本"), "report.md");
    }
}

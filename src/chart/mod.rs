//! Chart Renderer + Publisher
//!
//! Line charts are drawn in memory with plotters' SVG backend and uploaded to
//! the blob store under a collision-resistant name. Nothing touches the local
//! filesystem.

use std::sync::Arc;

use plotters::prelude::*;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{ChartArtifact, ChartSeries};
use crate::storage::BlobStore;
use crate::types::{AppError, AppResult};

pub const CONTENT_TYPE: &str = "image/svg+xml";

const WIDTH: u32 = 1600;
const HEIGHT: u32 = 560;

fn render_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Render(e.to_string())
}

fn validate(x_labels: &[String], y_values: &[f64]) -> AppResult<()> {
    if y_values.is_empty() {
        return Err(AppError::Render("no data to chart".to_string()));
    }
    if x_labels.len() != y_values.len() {
        return Err(AppError::Render(format!(
            "{} labels for {} values",
            x_labels.len(),
            y_values.len()
        )));
    }
    if y_values.iter().any(|v| !v.is_finite()) {
        return Err(AppError::Render("chart values must be finite".to_string()));
    }
    Ok(())
}

/// Draws a labelled line chart and returns the SVG document.
pub fn render_line_chart(
    x_labels: &[String],
    y_values: &[f64],
    title: &str,
    x_desc: &str,
) -> AppResult<String> {
    validate(x_labels, y_values)?;

    let (mut y_min, mut y_max) = y_values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if (y_max - y_min).abs() < f64::EPSILON {
        y_min -= 1.0;
        y_max += 1.0;
    }
    let pad = (y_max - y_min) * 0.05;
    let x_max = x_labels.len().max(2) - 1;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .caption(title, ("sans-serif", 24))
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(0..x_max, (y_min - pad)..(y_max + pad))
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .x_labels(x_labels.len())
            .x_label_formatter(&|x| x_labels.get(*x).cloned().unwrap_or_default())
            .x_desc(x_desc)
            .y_desc("CO2 Emissions")
            .draw()
            .map_err(render_err)?;

        let points: Vec<(usize, f64)> = y_values.iter().copied().enumerate().collect();
        chart
            .draw_series(LineSeries::new(points.clone(), &BLUE))
            .map_err(render_err)?;
        chart
            .draw_series(points.into_iter().map(|p| Circle::new(p, 4, BLUE.filled())))
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }

    Ok(svg)
}

/// `{subject}_emissions_trend_{uuid}.svg`, subject lowercased with spaces as `_`.
pub fn chart_filename(subject: &str) -> String {
    let slug: String = subject
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{}_emissions_trend_{}.svg", slug, Uuid::new_v4().simple())
}

/// Markdown handed back to the conversation for a published chart.
pub fn chart_markdown(subject: &str, url: &str) -> String {
    format!(
        "Here is the emissions trend for {subject}:\n\n![CO2 Emissions Trend for {subject}]({url})"
    )
}

pub fn render_series(series: &ChartSeries, x_desc: &str) -> AppResult<ChartArtifact> {
    let svg = render_line_chart(&series.x_labels, &series.y_values, &series.title, x_desc)?;
    Ok(ChartArtifact {
        title: series.title.clone(),
        subject: series.subject.clone(),
        filename: chart_filename(&series.subject),
        content_type: CONTENT_TYPE.to_string(),
        bytes: svg.into_bytes(),
    })
}

pub struct ChartPublisher {
    store: Arc<dyn BlobStore>,
    prefix: String,
}

impl ChartPublisher {
    pub fn new(store: Arc<dyn BlobStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    fn object_path(&self, filename: &str) -> String {
        if self.prefix.is_empty() {
            filename.to_string()
        } else {
            format!("{}/{}", self.prefix, filename)
        }
    }

    /// Uploads an already rendered chart and returns its public URL.
    pub async fn publish(&self, artifact: &ChartArtifact) -> AppResult<String> {
        let path = self.object_path(&artifact.filename);
        match self
            .store
            .upload_public(&path, &artifact.bytes, &artifact.content_type)
            .await
        {
            Ok(url) => {
                info!(path = %path, "Chart published");
                Ok(url)
            }
            Err(e) => {
                warn!(error = %e, path = %path, "Chart upload failed");
                Err(e)
            }
        }
    }

    pub async fn render_and_publish(
        &self,
        x_labels: &[String],
        y_values: &[f64],
        title: &str,
    ) -> AppResult<String> {
        let series = ChartSeries {
            title: title.to_string(),
            subject: title.to_string(),
            x_labels: x_labels.to_vec(),
            y_values: y_values.to_vec(),
        };
        validate(&series.x_labels, &series.y_values)?;
        let artifact = render_series(&series, "")?;
        self.publish(&artifact).await
    }
}

//! SVG charts drawn from labelled reports.
//!
//! Per dataset (cold/hot reports only): a cold-vs-hot bar chart and a
//! per-userId scatter for every query. Across datasets: hot and cold line
//! comparisons plus grouped bars. Plain reports take part in the hot
//! comparisons through their overall mean.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::ops::Range;
use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::error::{BenchError, Result};
use crate::render::LabelledReport;
use crate::schema::QuerySummary;

const CHART_SIZE: (u32, u32) = (800, 500);
const WIDE_CHART_SIZE: (u32, u32) = (1200, 600);
const PALETTE: [RGBColor; 6] = [BLUE, RED, GREEN, MAGENTA, CYAN, BLACK];
const COLD_COLOR: RGBColor = RED;
const HOT_COLOR: RGBColor = GREEN;

fn chart_err(path: &Path, err: impl Display) -> BenchError {
    BenchError::Chart {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn palette(i: usize) -> RGBColor {
    PALETTE[i % PALETTE.len()]
}

/// `0..max` with headroom; never an empty range.
fn value_range<I: IntoIterator<Item = f64>>(values: I) -> Range<f64> {
    let max = values.into_iter().fold(0.0, f64::max);
    if max > 0.0 {
        0.0..max * 1.1
    } else {
        0.0..1.0
    }
}

/// Padded `min..max`; a single value still gets a visible span.
fn span_range<I: IntoIterator<Item = f64>>(values: I) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((hi - lo) * 0.05).max(1.0);
    lo - pad..hi + pad
}

/// Categories sit at x = 1..=n; ticks between them stay unlabelled.
fn category_label(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 1.0 {
        return String::new();
    }
    labels.get(idx as usize - 1).cloned().unwrap_or_default()
}

fn category_axis(n: usize) -> Range<f64> {
    0.5..n as f64 + 0.5
}

/// One named series over the category axis; `None` leaves a gap.
struct Series {
    name: String,
    color: RGBColor,
    values: Vec<Option<f64>>,
}

fn simple_bar_chart(path: &Path, title: &str, bars: &[(&str, f64, RGBColor)]) -> Result<()> {
    let labels: Vec<String> = bars.iter().map(|(l, _, _)| l.to_string()).collect();
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| chart_err(path, e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(
            category_axis(bars.len()),
            value_range(bars.iter().map(|b| b.1)),
        )
        .map_err(|e| chart_err(path, e))?;

    let label_fmt = |x: &f64| category_label(&labels, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len() + 1)
        .x_label_formatter(&label_fmt)
        .y_desc("Seconds")
        .draw()
        .map_err(|e| chart_err(path, e))?;

    chart
        .draw_series(bars.iter().enumerate().map(|(i, &(_, value, color))| {
            let x = (i + 1) as f64;
            Rectangle::new([(x - 0.3, 0.0), (x + 0.3, value)], color.filled())
        }))
        .map_err(|e| chart_err(path, e))?;

    root.present().map_err(|e| chart_err(path, e))?;
    Ok(())
}

fn grouped_bar_chart(path: &Path, title: &str, query_ids: &[String], series: &[Series]) -> Result<()> {
    let root = SVGBackend::new(path, WIDE_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| chart_err(path, e))?;

    let values = series.iter().flat_map(|s| s.values.iter().flatten().copied());
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(category_axis(query_ids.len()), value_range(values))
        .map_err(|e| chart_err(path, e))?;

    let label_fmt = |x: &f64| category_label(query_ids, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(query_ids.len() + 1)
        .x_label_formatter(&label_fmt)
        .x_desc("Query ID")
        .y_desc("Seconds")
        .draw()
        .map_err(|e| chart_err(path, e))?;

    let width = 0.8 / series.len().max(1) as f64;
    for (i, s) in series.iter().enumerate() {
        let color = s.color;
        let bars = s.values.iter().enumerate().filter_map(|(q, v)| {
            let left = (q + 1) as f64 - 0.4 + i as f64 * width;
            v.map(|v| Rectangle::new([(left, 0.0), (left + width, v)], color.filled()))
        });
        chart
            .draw_series(bars)
            .map_err(|e| chart_err(path, e))?
            .label(s.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| chart_err(path, e))?;
    root.present().map_err(|e| chart_err(path, e))?;
    Ok(())
}

fn line_chart(
    path: &Path,
    title: &str,
    y_desc: &str,
    query_ids: &[String],
    series: &[Series],
) -> Result<()> {
    let root = SVGBackend::new(path, WIDE_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| chart_err(path, e))?;

    let values = series.iter().flat_map(|s| s.values.iter().flatten().copied());
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(category_axis(query_ids.len()), value_range(values))
        .map_err(|e| chart_err(path, e))?;

    let label_fmt = |x: &f64| category_label(query_ids, *x);
    chart
        .configure_mesh()
        .x_labels(query_ids.len() + 1)
        .x_label_formatter(&label_fmt)
        .x_desc("Query ID")
        .y_desc(y_desc)
        .draw()
        .map_err(|e| chart_err(path, e))?;

    for s in series {
        let color = s.color;
        let points: Vec<(f64, f64)> = s
            .values
            .iter()
            .enumerate()
            .filter_map(|(q, v)| v.map(|v| ((q + 1) as f64, v)))
            .collect();
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
            .map_err(|e| chart_err(path, e))?
            .label(s.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart
            .draw_series(points.iter().map(|&p| Circle::new(p, 4, color.filled())))
            .map_err(|e| chart_err(path, e))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| chart_err(path, e))?;
    root.present().map_err(|e| chart_err(path, e))?;
    Ok(())
}

fn scatter_chart(path: &Path, title: &str, cold: &[(f64, f64)], hot: &[(f64, f64)]) -> Result<()> {
    let root = SVGBackend::new(path, WIDE_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| chart_err(path, e))?;

    let all = || cold.iter().chain(hot.iter());
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(span_range(all().map(|p| p.0)), value_range(all().map(|p| p.1)))
        .map_err(|e| chart_err(path, e))?;

    chart
        .configure_mesh()
        .x_desc("userId")
        .y_desc("Seconds")
        .draw()
        .map_err(|e| chart_err(path, e))?;

    for (name, points, color) in [("Cold", cold, COLD_COLOR), ("Hot", hot, HOT_COLOR)] {
        chart
            .draw_series(points.iter().map(|&p| Circle::new(p, 3, color.filled())))
            .map_err(|e| chart_err(path, e))?
            .label(name)
            .legend(move |(x, y)| Circle::new((x + 6, y), 3, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| chart_err(path, e))?;
    root.present().map_err(|e| chart_err(path, e))?;
    Ok(())
}

fn per_dataset_charts(report: &LabelledReport, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let label = &report.label;
    let points = report.report.binding_points();
    let mut written = Vec::new();

    for q in report.report.summaries() {
        let Some(cold) = q.cold_avg_sec else {
            continue;
        };
        let qid = q.query_id;

        let bar = out_dir.join(format!("{label}_query_{qid}_cold_vs_hot_bar.svg"));
        simple_bar_chart(
            &bar,
            &format!("Query {qid}: Cold vs Hot ({label} dataset)"),
            &[
                ("Cold (1st run)", cold, COLD_COLOR),
                ("Hot (avg subsequent)", q.hot_avg_sec, HOT_COLOR),
            ],
        )?;
        written.push(bar);

        let mine = points.iter().filter(|p| p.query_id == qid);
        let cold_points: Vec<(f64, f64)> = mine
            .clone()
            .filter_map(|p| p.cold_time.map(|c| (p.params.user_id as f64, c)))
            .collect();
        let hot_points: Vec<(f64, f64)> =
            mine.map(|p| (p.params.user_id as f64, p.hot_mean)).collect();
        let scatter = out_dir.join(format!("{label}_query_{qid}_cold_vs_hot_scatter.svg"));
        scatter_chart(
            &scatter,
            &format!("Query {qid}: Cold vs Hot by Parameter ({label})"),
            &cold_points,
            &hot_points,
        )?;
        written.push(scatter);
    }
    Ok(written)
}

/// One series per report, aligned on `query_ids`; `pick` chooses the value.
fn comparison_series(
    reports: &[LabelledReport],
    summaries: &[Vec<QuerySummary>],
    query_ids: &[usize],
    suffix: &str,
    pick: impl Fn(&QuerySummary) -> Option<f64>,
) -> Vec<Series> {
    reports
        .iter()
        .zip(summaries)
        .enumerate()
        .filter_map(|(i, (r, s))| {
            let values: Vec<Option<f64>> = query_ids
                .iter()
                .map(|qid| s.iter().find(|q| q.query_id == *qid).and_then(&pick))
                .collect();
            let any = values.iter().any(Option::is_some);
            any.then(|| Series {
                name: format!("{} ({suffix})", r.label),
                color: palette(i),
                values,
            })
        })
        .collect()
}

/// Draws every chart into `out_dir` and returns the paths written.
pub fn render_charts(reports: &[LabelledReport], out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for r in reports {
        written.extend(per_dataset_charts(r, out_dir)?);
    }

    let summaries: Vec<Vec<QuerySummary>> = reports.iter().map(|r| r.report.summaries()).collect();
    let query_ids: Vec<usize> = summaries
        .iter()
        .flat_map(|s| s.iter().map(|q| q.query_id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if query_ids.is_empty() {
        return Ok(written);
    }
    let tick_labels: Vec<String> = query_ids.iter().map(|q| q.to_string()).collect();
    let names: Vec<&str> = reports.iter().map(|r| r.label.as_str()).collect();
    let versus = names.join(" vs ");

    let hot = comparison_series(reports, &summaries, &query_ids, "hot", |q| {
        Some(q.hot_avg_sec)
    });
    let cold = comparison_series(reports, &summaries, &query_ids, "cold", |q| q.cold_avg_sec);

    let path = out_dir.join("all_hot_exec_comparison.svg");
    line_chart(
        &path,
        &format!("Hot execution time comparison: {versus}"),
        "Avg Execution Time (sec)",
        &tick_labels,
        &hot,
    )?;
    written.push(path);

    let path = out_dir.join("hot_all_sizes_bar.svg");
    grouped_bar_chart(&path, "Hot execution time per query: all sizes", &tick_labels, &hot)?;
    written.push(path);

    if !cold.is_empty() {
        let path = out_dir.join("all_cold_exec_comparison.svg");
        line_chart(
            &path,
            &format!("Cold execution time comparison: {versus}"),
            "Cold Start Time (sec)",
            &tick_labels,
            &cold,
        )?;
        written.push(path);

        let path = out_dir.join("cold_all_sizes_bar.svg");
        grouped_bar_chart(&path, "Cold start time per query: all sizes", &tick_labels, &cold)?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_only_on_whole_positions() {
        let labels = vec!["4".to_string(), "5".to_string()];
        assert_eq!(category_label(&labels, 1.0), "4");
        assert_eq!(category_label(&labels, 2.0), "5");
        assert_eq!(category_label(&labels, 1.5), "");
        assert_eq!(category_label(&labels, 0.0), "");
        assert_eq!(category_label(&labels, 3.0), "");
    }

    #[test]
    fn ranges_are_never_empty() {
        assert_eq!(value_range(Vec::new()), 0.0..1.0);
        assert_eq!(value_range([0.0, 0.0]), 0.0..1.0);
        let r = value_range([0.5, 2.0]);
        assert!(r.end > 2.0);

        let s = span_range([42.0]);
        assert!(s.start < 42.0 && s.end > 42.0);
        assert_eq!(span_range(Vec::new()), 0.0..1.0);
    }
}

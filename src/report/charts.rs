//! SVG charts of the profit results

use anyhow::{Context, Result};
use log::warn;
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use super::tables::top_n_per_region;
use crate::query::{ProfitRow, TopProductRow, YearWindow};

pub const GROUPED_CHART: &str = "profit_by_region.svg";
pub const FACETED_CHART: &str = "profit_by_region_faceted.svg";
pub const TOP_PRODUCT_CHART: &str = "top_product_by_region.svg";

const FONT: &str = "sans-serif";

const VIRIDIS: &[RGBColor] = &[
    RGBColor(68, 1, 84),
    RGBColor(71, 44, 122),
    RGBColor(59, 81, 139),
    RGBColor(44, 113, 142),
    RGBColor(33, 144, 141),
    RGBColor(39, 173, 129),
    RGBColor(92, 200, 99),
    RGBColor(170, 220, 50),
    RGBColor(253, 231, 37),
];

const ROCKET: &[RGBColor] = &[
    RGBColor(53, 25, 62),
    RGBColor(96, 24, 80),
    RGBColor(142, 24, 85),
    RGBColor(189, 30, 73),
    RGBColor(225, 64, 59),
    RGBColor(242, 112, 81),
    RGBColor(246, 160, 124),
    RGBColor(249, 204, 178),
];

const COOLWARM: &[RGBColor] = &[
    RGBColor(59, 76, 192),
    RGBColor(98, 130, 234),
    RGBColor(141, 176, 254),
    RGBColor(184, 208, 249),
    RGBColor(221, 221, 221),
    RGBColor(245, 196, 173),
    RGBColor(244, 154, 123),
    RGBColor(222, 96, 77),
    RGBColor(180, 4, 38),
];

/// Spread `n` picks evenly over a palette
fn palette_color(palette: &[RGBColor], i: usize, n: usize) -> RGBColor {
    if n <= 1 {
        return palette[palette.len() / 2];
    }
    let pos = i * (palette.len() - 1) / (n - 1);
    palette[pos.min(palette.len() - 1)]
}

/// Distinct values in order of first appearance
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// X range covering every bar and zero, with some headroom
fn profit_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let (lo, hi) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo == hi {
        return 0.0..1.0;
    }
    (lo * 1.1)..(hi * 1.1)
}

/// Category `i` of `n` sits at y = n - 1 - i, so the first one is drawn on top
fn slot(i: usize, n: usize) -> f64 {
    (n - 1 - i) as f64
}

fn category_range(n: usize) -> std::ops::Range<f64> {
    -0.5..(n as f64 - 0.5)
}

fn category_label(labels: &[&str], y: f64) -> String {
    let rounded = y.round();
    if (y - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    let from_top = labels.len() as i64 - 1 - rounded as i64;
    usize::try_from(from_top)
        .ok()
        .and_then(|i| labels.get(i))
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// Grouped horizontal bars: sub-categories on the y axis, one bar per
/// region, colored by region
pub fn render_grouped_chart(path: &Path, top: &[ProfitRow], n: usize, window: YearWindow) -> Result<()> {
    let regions = distinct(top.iter().map(|r| r.region.as_str()));
    let categories = distinct(top.iter().map(|r| r.sub_category.as_str()));

    let root = SVGBackend::new(path, (1400, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let title = format!(
        "Top {} Most Profitable Product Sub-Categories by Region ({})",
        n, window
    );
    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 26).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(200)
        .build_cartesian_2d(
            profit_range(top.iter().map(|r| r.total_profit)),
            category_range(categories.len()),
        )?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(categories.len() + 1)
        .y_label_formatter(&|y: &f64| category_label(&categories, *y))
        .x_desc("Total Profit ($)")
        .y_desc("Product Sub-Category")
        .draw()?;

    let band = 0.8 / regions.len() as f64;
    for (ri, region) in regions.iter().enumerate() {
        let color = palette_color(VIRIDIS, ri, regions.len());
        let bars = top
            .iter()
            .filter(|r| r.region == *region)
            .filter_map(|r| {
                let ci = categories.iter().position(|c| *c == r.sub_category)?;
                let y0 = slot(ci, categories.len()) + 0.4 - (ri + 1) as f64 * band;
                Some(Rectangle::new(
                    [(0.0, y0), (r.total_profit, y0 + band)],
                    color.filled(),
                ))
            });

        chart
            .draw_series(bars)?
            .label(*region)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()
        .with_context(|| format!("Failed to write chart: {:?}", path))?;
    Ok(())
}

/// One subplot per region, two per row, each with its own y axis
pub fn render_faceted_chart(path: &Path, top: &[ProfitRow], window: YearWindow) -> Result<()> {
    let regions = distinct(top.iter().map(|r| r.region.as_str()));
    let grid_rows = regions.len().div_ceil(2);

    let root = SVGBackend::new(path, (1400, 60 + 420 * grid_rows as u32)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(
        &format!(
            "Most Profitable Product Sub-Categories by Region ({})",
            window
        ),
        (FONT, 28).into_font(),
    )?;

    let panels = root.split_evenly((grid_rows, 2));
    for (region, area) in regions.iter().zip(panels.iter()) {
        let rows: Vec<&ProfitRow> = top.iter().filter(|r| r.region == *region).collect();
        let categories: Vec<&str> = rows.iter().map(|r| r.sub_category.as_str()).collect();

        let mut chart = ChartBuilder::on(area)
            .caption(format!("Region = {}", region), (FONT, 20).into_font())
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(180)
            .build_cartesian_2d(
                profit_range(rows.iter().map(|r| r.total_profit)),
                category_range(categories.len()),
            )?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(categories.len() + 1)
            .y_label_formatter(&|y: &f64| category_label(&categories, *y))
            .x_desc("Total Profit ($)")
            .y_desc("Product Sub-Category")
            .draw()?;

        let n = rows.len();
        chart.draw_series(rows.iter().enumerate().map(|(ci, r)| {
            let y = slot(ci, n);
            Rectangle::new(
                [(0.0, y - 0.4), (r.total_profit, y + 0.4)],
                palette_color(ROCKET, ci, n).filled(),
            )
        }))?;
    }

    root.present()
        .with_context(|| format!("Failed to write chart: {:?}", path))?;
    Ok(())
}

/// One bar per region for its most profitable sub-category, colored by
/// sub-category
pub fn render_top_product_chart(path: &Path, top: &[TopProductRow], window: YearWindow) -> Result<()> {
    let regions = distinct(top.iter().map(|r| r.region.as_str()));
    let sub_categories = distinct(top.iter().map(|r| r.sub_category.as_str()));

    let root = SVGBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!(
                "Highest Profit Product Sub-Category in Each Region ({})",
                window
            ),
            (FONT, 22).into_font(),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(120)
        .build_cartesian_2d(
            profit_range(top.iter().map(|r| r.total_profit)),
            category_range(regions.len()),
        )?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(regions.len() + 1)
        .y_label_formatter(&|y: &f64| category_label(&regions, *y))
        .x_desc("Total Profit ($)")
        .y_desc("Region")
        .draw()?;

    // Legend heading, drawn as an entry with a blank marker
    chart
        .draw_series(std::iter::empty::<Rectangle<(f64, f64)>>())?
        .label("Product Sub-Category")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], WHITE.filled()));

    for (si, sub_category) in sub_categories.iter().enumerate() {
        let color = palette_color(COOLWARM, si, sub_categories.len());
        let bars = top
            .iter()
            .filter(|r| r.sub_category == *sub_category)
            .filter_map(|r| {
                let ri = regions.iter().position(|g| *g == r.region)?;
                let y = slot(ri, regions.len());
                Some(Rectangle::new(
                    [(0.0, y - 0.4), (r.total_profit, y + 0.4)],
                    color.filled(),
                ))
            });

        chart
            .draw_series(bars)?
            .label(*sub_category)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()
        .with_context(|| format!("Failed to write chart: {:?}", path))?;
    Ok(())
}

/// Render all three charts into `dir`. Returns the files written, none when
/// there is no profit data in the window.
pub fn render_charts(
    dir: &Path,
    profit: &[ProfitRow],
    top: &[TopProductRow],
    n: usize,
    window: YearWindow,
) -> Result<Vec<PathBuf>> {
    if profit.is_empty() || top.is_empty() {
        warn!("No sales in {}; skipping charts", window);
        return Ok(Vec::new());
    }

    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {:?}", dir))?;

    let top_n = top_n_per_region(profit, n);

    let grouped = dir.join(GROUPED_CHART);
    render_grouped_chart(&grouped, &top_n, n, window)?;

    let faceted = dir.join(FACETED_CHART);
    render_faceted_chart(&faceted, &top_n, window)?;

    let top_product = dir.join(TOP_PRODUCT_CHART);
    render_top_product_chart(&top_product, top, window)?;

    Ok(vec![grouped, faceted, top_product])
}

//! Static Chart Renderer
//! Renders pivoted benchmark views to PNG bar charts with plotters.
//!
//! Single mode: two panels side by side (ops/sec and execution time by
//! benchmark). Comparison mode: 2x2 grid with the two averaged pivots, the
//! per-allocator overall bars, and a summary statistics panel.

use crate::data::{AllocatorStats, PivotView};
use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

// Matplotlib tab palette, same hues the original charts used
const PALETTE: [RGBColor; 6] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
];

const SINGLE_SIZE: (u32, u32) = (1400, 600);
const COMPARISON_SIZE: (u32, u32) = (1600, 1000);

type Panel<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Renders static comparison charts. The bitmap backend is acquired and
/// presented inside each call, so repeated renders in one process are
/// independent.
pub struct ChartRenderer;

impl ChartRenderer {
    /// Two-panel chart for a single benchmark run.
    pub fn render_single(ops: &PivotView, time: &PivotView, output: &Path) -> Result<()> {
        let root = BitMapBackend::new(output, SINGLE_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let panels = root.split_evenly((1, 2));
        Self::draw_grouped_bars(
            &panels[0],
            "Operations per Second by Benchmark",
            "Operations per Second",
            ops,
        )?;
        Self::draw_grouped_bars(
            &panels[1],
            "Execution Time by Benchmark",
            "Time (microseconds)",
            time,
        )?;

        root.present()?;
        Ok(())
    }

    /// Four-panel chart for a multi-run comparison.
    pub fn render_comparison(
        ops: &PivotView,
        time: &PivotView,
        summary: &[AllocatorStats],
        output: &Path,
    ) -> Result<()> {
        let root = BitMapBackend::new(output, COMPARISON_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let panels = root.split_evenly((2, 2));
        Self::draw_grouped_bars(
            &panels[0],
            "Average Operations per Second",
            "Operations per Second",
            ops,
        )?;
        Self::draw_grouped_bars(
            &panels[1],
            "Average Execution Time",
            "Time (microseconds)",
            time,
        )?;
        Self::draw_allocator_bars(&panels[2], summary)?;
        Self::draw_summary_panel(&panels[3], summary)?;

        root.present()?;
        Ok(())
    }

    /// Grouped bar chart: one slot per benchmark, one colored bar per
    /// allocator. Absent cells draw no bar.
    fn draw_grouped_bars(
        panel: &Panel,
        title: &str,
        y_desc: &str,
        view: &PivotView,
    ) -> Result<()> {
        let benchmarks = view.benchmarks();
        let allocators = view.allocators();

        let n = benchmarks.len();
        let y_max = view.iter().map(|(_, _, v)| v).fold(0.0, f64::max);
        let y_top = if y_max > 0.0 { y_max * 1.15 } else { 1.0 };

        let mut chart = ChartBuilder::on(panel)
            .caption(title, ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(55)
            .y_label_area_size(80)
            .build_cartesian_2d(-0.6f64..(n.max(1) as f64 - 0.4), 0f64..y_top)?;

        let x_fmt = |x: &f64| -> String {
            let idx = x.round();
            if (x - idx).abs() > 0.25 || idx < 0.0 {
                return String::new();
            }
            benchmarks
                .get(idx as usize)
                .cloned()
                .unwrap_or_default()
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n.max(1))
            .x_label_formatter(&x_fmt)
            .x_desc("Benchmark Type")
            .y_desc(y_desc)
            .label_style(("sans-serif", 13))
            .axis_desc_style(("sans-serif", 15))
            .draw()?;

        let bar_width = 0.8 / allocators.len().max(1) as f64;
        for (j, allocator) in allocators.iter().enumerate() {
            let color = PALETTE[j % PALETTE.len()];
            let bars = benchmarks.iter().enumerate().filter_map(|(i, benchmark)| {
                view.get(benchmark, allocator).map(|value| {
                    let x0 = i as f64 - 0.4 + j as f64 * bar_width;
                    Rectangle::new([(x0, 0.0), (x0 + bar_width * 0.92, value)], color.filled())
                })
            });
            chart
                .draw_series(bars)?
                .label(allocator.clone())
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled())
                });
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.85))
            .border_style(&BLACK)
            .label_font(("sans-serif", 13))
            .draw()?;
        Ok(())
    }

    /// Overall performance per allocator, one bar each.
    fn draw_allocator_bars(panel: &Panel, summary: &[AllocatorStats]) -> Result<()> {
        let y_max = summary
            .iter()
            .map(|s| s.mean_ops_per_sec)
            .fold(0.0, f64::max);
        let y_top = if y_max > 0.0 { y_max * 1.15 } else { 1.0 };
        let n = summary.len();

        let mut chart = ChartBuilder::on(panel)
            .caption("Overall Allocator Performance", ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(55)
            .y_label_area_size(80)
            .build_cartesian_2d(-0.6f64..(n.max(1) as f64 - 0.4), 0f64..y_top)?;

        let x_fmt = |x: &f64| -> String {
            let idx = x.round();
            if (x - idx).abs() > 0.25 || idx < 0.0 {
                return String::new();
            }
            summary
                .get(idx as usize)
                .map(|s| s.allocator.clone())
                .unwrap_or_default()
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n.max(1))
            .x_label_formatter(&x_fmt)
            .x_desc("Allocator")
            .y_desc("Average Ops per Second")
            .label_style(("sans-serif", 13))
            .axis_desc_style(("sans-serif", 15))
            .draw()?;

        chart.draw_series(summary.iter().enumerate().map(|(i, stats)| {
            let color = PALETTE[i % PALETTE.len()];
            Rectangle::new(
                [(i as f64 - 0.3, 0.0), (i as f64 + 0.3, stats.mean_ops_per_sec)],
                color.filled(),
            )
        }))?;
        Ok(())
    }

    /// Plain-text summary statistics, one block per allocator.
    fn draw_summary_panel(panel: &Panel, summary: &[AllocatorStats]) -> Result<()> {
        panel.draw(&Text::new(
            "Summary Statistics",
            (60, 40),
            ("sans-serif", 24).into_font(),
        ))?;

        let mut y = 90;
        for stats in summary {
            panel.draw(&Text::new(
                format!("{}:", stats.allocator),
                (60, y),
                ("monospace", 17).into_font(),
            ))?;
            y += 26;
            panel.draw(&Text::new(
                format!("  Avg Ops/sec: {}", with_thousands(stats.mean_ops_per_sec)),
                (60, y),
                ("monospace", 17).into_font(),
            ))?;
            y += 26;
            panel.draw(&Text::new(
                format!("  Avg Time: {} us", with_thousands(stats.mean_time_us)),
                (60, y),
                ("monospace", 17).into_font(),
            ))?;
            y += 40;
        }
        Ok(())
    }
}

/// Round to a whole number and insert thousands separators.
fn with_thousands(value: f64) -> String {
    let digits = format!("{:.0}", value);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

//! Weekly spending line chart
//!
//! [`ChartRenderer`] turns a slice of [`ChartPoint`]s into drawn elements on a
//! [`Surface`]: one stroked path plus a bottom and a left axis. The surface is
//! plain data, so the TUI paints it onto a canvas and `spendchat chart` writes
//! it out as SVG.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Logical drawing area, in surface units
pub const WIDTH: f64 = 300.0;
pub const HEIGHT: f64 = 150.0;

/// Weeks of the year shown on the x axis
pub const WEEK_DOMAIN: (f64, f64) = (1.0, 52.0);

const X_TICKS: usize = 12;
const Y_TICKS: usize = 10;
const TICK_SIZE: f64 = 6.0;
const TICK_PADDING: f64 = 3.0;
const LINE_STROKE: &str = "steelblue";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub week: u32,
    pub value: f64,
}

const fn point(week: u32, value: f64) -> ChartPoint {
    ChartPoint { week, value }
}

/// Spending in USD for the first 18 weeks
pub const SAMPLE_DATA: [ChartPoint; 18] = [
    point(1, 30.0),
    point(2, 80.0),
    point(3, 45.0),
    point(4, 60.0),
    point(5, 120.0),
    point(6, 10.0),
    point(7, 20.0),
    point(8, 40.0),
    point(9, 80.0),
    point(10, 160.0),
    point(11, 100.0),
    point(12, 300.0),
    point(13, 70.0),
    point(14, 120.0),
    point(15, 120.0),
    point(16, 120.0),
    point(17, 120.0),
    point(18, 120.0),
];

/// Continuous linear mapping from a domain onto a range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    #[cfg(test)]
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Map a domain value into the range. A zero-width domain maps everything
    /// to the middle of the range.
    pub fn scale(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let t = if d1 != d0 { (value - d0) / (d1 - d0) } else { 0.5 };
        r0 + t * (r1 - r0)
    }

    /// Round tick values covering the domain, roughly `count` of them
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (d0, d1) = self.domain;
        if count == 0 {
            return Vec::new();
        }
        if d0 == d1 {
            return vec![d0];
        }
        let (lo, hi) = if d0 < d1 { (d0, d1) } else { (d1, d0) };
        let Some(spec) = TickSpec::new(lo, hi, count as f64) else {
            return Vec::new();
        };
        let mut ticks: Vec<f64> = (spec.first..=spec.last).map(|i| spec.value(i)).collect();
        if d0 > d1 {
            ticks.reverse();
        }
        ticks
    }

    /// Labels for [`ticks`](Self::ticks), with as many decimals as the step needs
    pub fn tick_labels(&self, ticks: &[f64], count: usize) -> Vec<String> {
        let (d0, d1) = self.domain;
        let (lo, hi) = if d0 <= d1 { (d0, d1) } else { (d1, d0) };
        let step = tick_step(lo, hi, count as f64);
        let precision = if step.is_finite() && step > 0.0 {
            (-step.log10().floor()).max(0.0) as usize
        } else {
            0
        };
        ticks.iter().map(|&v| format_tick(v, precision)).collect()
    }
}

/// Integer tick indices plus the increment between them.
///
/// A negative increment means the step is `1 / -increment`, which keeps
/// fractional ticks exact.
struct TickSpec {
    first: i64,
    last: i64,
    increment: f64,
}

impl TickSpec {
    fn new(start: f64, stop: f64, count: f64) -> Option<Self> {
        let step = (stop - start) / count;
        let power = step.log10().floor();
        let error = step / 10f64.powf(power);
        let factor = nice_factor(error);

        let (mut first, mut last, increment);
        if power < 0.0 {
            let inc = 10f64.powf(-power) / factor;
            first = (start * inc).round();
            last = (stop * inc).round();
            if first / inc < start {
                first += 1.0;
            }
            if last / inc > stop {
                last -= 1.0;
            }
            increment = -inc;
        } else {
            let inc = 10f64.powf(power) * factor;
            first = (start / inc).round();
            last = (stop / inc).round();
            if first * inc < start {
                first += 1.0;
            }
            if last * inc > stop {
                last -= 1.0;
            }
            increment = inc;
        }

        if last < first && (0.5..2.0).contains(&count) {
            return Self::new(start, stop, count * 2.0);
        }
        if first.is_nan() || last.is_nan() || last < first || !increment.is_finite() {
            return None;
        }
        Some(Self {
            first: first as i64,
            last: last as i64,
            increment,
        })
    }

    fn value(&self, index: i64) -> f64 {
        if self.increment < 0.0 {
            index as f64 / -self.increment
        } else {
            index as f64 * self.increment
        }
    }
}

fn nice_factor(error: f64) -> f64 {
    if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    }
}

fn tick_step(start: f64, stop: f64, count: f64) -> f64 {
    let step = (stop - start) / count.max(0.0);
    let power = step.log10().floor();
    let factor = nice_factor(step / 10f64.powf(power));
    if power >= 0.0 {
        factor * 10f64.powf(power)
    } else {
        1.0 / (10f64.powf(-power) / factor)
    }
}

/// Fixed-point with thousands separators, e.g. `1,250` or `0.25`
pub fn format_tick(value: f64, precision: usize) -> String {
    let fixed = format!("{:.*}", precision, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(fixed.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    let negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    if negative {
        format!("\u{2212}{}", grouped)
    } else {
        grouped
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(f64, f64),
    LineTo(f64, f64),
}

impl PathCommand {
    pub fn point(&self) -> (f64, f64) {
        match *self {
            PathCommand::MoveTo(x, y) | PathCommand::LineTo(x, y) => (x, y),
        }
    }
}

/// Open, unfilled polyline
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub commands: Vec<PathCommand>,
    pub stroke: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orient {
    Bottom,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub value: f64,
    /// Position along the axis, in surface units
    pub offset: f64,
    pub label: String,
}

/// Text placed relative to the axis origin
#[derive(Debug, Clone, PartialEq)]
pub struct AxisTitle {
    pub text: &'static str,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub orient: Orient,
    pub translate: (f64, f64),
    /// Extent of the domain line, from the scale's range
    pub extent: (f64, f64),
    pub ticks: Vec<Tick>,
    pub title: AxisTitle,
}

impl Axis {
    fn new(orient: Orient, scale: &LinearScale, count: usize, title: AxisTitle) -> Self {
        let values = scale.ticks(count);
        let labels = scale.tick_labels(&values, count);
        let ticks = values
            .into_iter()
            .zip(labels)
            .map(|(value, label)| Tick {
                value,
                offset: scale.scale(value),
                label,
            })
            .collect();
        let translate = match orient {
            Orient::Bottom => (0.0, HEIGHT),
            Orient::Left => (0.0, 0.0),
        };
        Self {
            orient,
            translate,
            extent: scale.range(),
            ticks,
            title,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Line(Path),
    Axis(Axis),
}

/// Retained list of drawn elements
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    width: f64,
    height: f64,
    elements: Vec<Element>,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(WIDTH, HEIGHT)
    }
}

impl Surface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            elements: Vec::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    #[cfg(test)]
    pub fn path(&self) -> Option<&Path> {
        self.elements.iter().find_map(|e| match e {
            Element::Line(path) => Some(path),
            _ => None,
        })
    }

    #[cfg(test)]
    pub fn axis(&self, orient: Orient) -> Option<&Axis> {
        self.elements.iter().find_map(|e| match e {
            Element::Axis(axis) if axis.orient == orient => Some(axis),
            _ => None,
        })
    }

    /// Standalone SVG document for the current elements
    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" overflow="visible">"#,
            self.width, self.height
        );
        for element in &self.elements {
            match element {
                Element::Line(path) => {
                    let _ = writeln!(
                        svg,
                        r#"  <path fill="none" stroke="{}" d="{}"/>"#,
                        path.stroke,
                        path_data(&path.commands)
                    );
                }
                Element::Axis(axis) => write_axis(&mut svg, axis),
            }
        }
        svg.push_str("</svg>\n");
        svg
    }
}

fn path_data(commands: &[PathCommand]) -> String {
    let mut d = String::new();
    for command in commands {
        let _ = match *command {
            PathCommand::MoveTo(x, y) => write!(d, "M{},{}", x, y),
            PathCommand::LineTo(x, y) => write!(d, "L{},{}", x, y),
        };
    }
    d
}

fn write_axis(svg: &mut String, axis: &Axis) {
    let (tx, ty) = axis.translate;
    let (r0, r1) = axis.extent;
    let (anchor, domain) = match axis.orient {
        Orient::Bottom => (
            "middle",
            format!("M{},{}V0H{}V{}", r0, TICK_SIZE, r1, TICK_SIZE),
        ),
        Orient::Left => (
            "end",
            format!("M{},{}H0V{}H{}", -TICK_SIZE, r0, r1, -TICK_SIZE),
        ),
    };
    let _ = writeln!(
        svg,
        r#"  <g transform="translate({},{})" fill="none" font-size="10" font-family="sans-serif" text-anchor="{}">"#,
        tx, ty, anchor
    );
    let _ = writeln!(svg, r#"    <path stroke="currentColor" d="{}"/>"#, domain);
    for tick in &axis.ticks {
        let (line, text) = match axis.orient {
            Orient::Bottom => (
                format!(r#"x1="{0}" x2="{0}" y2="{1}""#, tick.offset, TICK_SIZE),
                format!(
                    r#"x="{}" y="{}" dy="0.71em""#,
                    tick.offset,
                    TICK_SIZE + TICK_PADDING
                ),
            ),
            Orient::Left => (
                format!(r#"y1="{0}" y2="{0}" x2="{1}""#, tick.offset, -TICK_SIZE),
                format!(
                    r#"y="{}" x="{}" dy="0.32em""#,
                    tick.offset,
                    -(TICK_SIZE + TICK_PADDING)
                ),
            ),
        };
        let _ = writeln!(svg, r#"    <line stroke="currentColor" {}/>"#, line);
        let _ = writeln!(
            svg,
            r#"    <text fill="currentColor" {}>{}</text>"#,
            text, tick.label
        );
    }
    let _ = writeln!(
        svg,
        r##"    <text x="{}" y="{}" fill="#000">{}</text>"##,
        axis.title.x,
        axis.title.y,
        escape_text(axis.title.text)
    );
    svg.push_str("  </g>\n");
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Draws a dataset as a line chart with week and amount axes
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    data: Vec<ChartPoint>,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new(SAMPLE_DATA.to_vec())
    }
}

impl ChartRenderer {
    pub fn new(data: Vec<ChartPoint>) -> Self {
        Self { data }
    }

    pub fn x_scale(&self) -> LinearScale {
        LinearScale::new(WEEK_DOMAIN, (0.0, WIDTH))
    }

    pub fn y_scale(&self) -> LinearScale {
        let max = self
            .data
            .iter()
            .map(|p| p.value)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
            .unwrap_or(0.0);
        LinearScale::new((0.0, max), (HEIGHT, 0.0))
    }

    /// Clear the surface and draw the line and both axes from scratch
    pub fn draw(&self, surface: &mut Surface) {
        surface.clear();

        let x = self.x_scale();
        let y = self.y_scale();

        let commands = self
            .data
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let px = x.scale(f64::from(p.week));
                let py = y.scale(p.value);
                if i == 0 {
                    PathCommand::MoveTo(px, py)
                } else {
                    PathCommand::LineTo(px, py)
                }
            })
            .collect();
        surface.push(Element::Line(Path {
            commands,
            stroke: LINE_STROKE,
        }));

        surface.push(Element::Axis(Axis::new(
            Orient::Bottom,
            &x,
            X_TICKS,
            AxisTitle {
                text: "Week",
                x: 150.0,
                y: 30.0,
            },
        )));
        surface.push(Element::Axis(Axis::new(
            Orient::Left,
            &y,
            Y_TICKS,
            AxisTitle {
                text: "Amount Spent (USD)",
                x: -75.0,
                y: -40.0,
            },
        )));
    }
}

/// What makes the chart panel redraw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RedrawPolicy {
    /// Redraw whenever the transcript changes
    #[default]
    Transcript,
    /// Redraw only when the chart data changes
    Data,
}

/// The chart data never changes, so its key is constant
const DATA_KEY: u64 = 0;

/// Chart panel state: renderer, retained surface and redraw trigger
#[derive(Debug, Clone)]
pub struct ChartView {
    renderer: ChartRenderer,
    surface: Surface,
    policy: RedrawPolicy,
    last_key: Option<u64>,
    redraws: u64,
}

impl ChartView {
    pub fn new(renderer: ChartRenderer, policy: RedrawPolicy) -> Self {
        Self {
            renderer,
            surface: Surface::default(),
            policy,
            last_key: None,
            redraws: 0,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn redraw_count(&self) -> u64 {
        self.redraws
    }

    /// Redraw if the trigger key for the current policy changed.
    /// Returns whether a redraw happened.
    pub fn sync(&mut self, transcript_revision: u64) -> bool {
        let key = match self.policy {
            RedrawPolicy::Transcript => transcript_revision,
            RedrawPolicy::Data => DATA_KEY,
        };
        if self.last_key == Some(key) {
            return false;
        }
        self.renderer.draw(&mut self.surface);
        self.last_key = Some(key);
        self.redraws += 1;
        tracing::debug!(redraws = self.redraws, policy = ?self.policy, "chart redrawn");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawn(data: Vec<ChartPoint>) -> Surface {
        let mut surface = Surface::default();
        ChartRenderer::new(data).draw(&mut surface);
        surface
    }

    #[test]
    fn test_sample_data_shape() {
        assert_eq!(SAMPLE_DATA.len(), 18);
        assert!(SAMPLE_DATA.iter().zip(1..).all(|(p, w)| p.week == w));
    }

    #[test]
    fn test_scale_maps_domain_onto_range() {
        let x = LinearScale::new(WEEK_DOMAIN, (0.0, WIDTH));
        assert_eq!(x.scale(1.0), 0.0);
        assert_eq!(x.scale(52.0), 300.0);

        let y = ChartRenderer::default().y_scale();
        assert_eq!(y.scale(0.0), 150.0);
        assert_eq!(y.scale(300.0), 0.0);
        assert_eq!(y.scale(30.0), 135.0);
    }

    #[test]
    fn test_zero_width_domain_maps_to_middle() {
        let y = ChartRenderer::new(Vec::new()).y_scale();
        assert_eq!(y.domain(), (0.0, 0.0));
        assert_eq!(y.scale(0.0), 75.0);
        assert_eq!(y.scale(42.0), 75.0);
    }

    #[test]
    fn test_y_upper_bound_is_max_for_any_order() {
        let mut reversed = SAMPLE_DATA.to_vec();
        reversed.reverse();
        let mut rotated = SAMPLE_DATA.to_vec();
        rotated.rotate_left(5);
        let mut swapped = SAMPLE_DATA.to_vec();
        swapped.swap(0, 11);

        for data in [SAMPLE_DATA.to_vec(), reversed, rotated, swapped] {
            assert_eq!(ChartRenderer::new(data).y_scale().domain(), (0.0, 300.0));
        }
    }

    #[test]
    fn test_path_has_one_command_per_point_in_order() {
        let data = vec![point(9, 10.0), point(2, 40.0), point(30, 20.0), point(2, 0.0)];
        let surface = drawn(data.clone());
        let path = surface.path().unwrap();
        assert_eq!(path.commands.len(), data.len());
        assert!(matches!(path.commands[0], PathCommand::MoveTo(..)));
        assert!(path.commands[1..]
            .iter()
            .all(|c| matches!(c, PathCommand::LineTo(..))));

        let x = LinearScale::new(WEEK_DOMAIN, (0.0, WIDTH));
        for (command, p) in path.commands.iter().zip(&data) {
            assert_eq!(command.point().0, x.scale(f64::from(p.week)));
        }
    }

    #[test]
    fn test_sample_path_starts_at_first_week() {
        let surface = drawn(SAMPLE_DATA.to_vec());
        let path = surface.path().unwrap();
        assert_eq!(path.commands[0], PathCommand::MoveTo(0.0, 135.0));
        assert_eq!(path.commands[11].point().1, 0.0);
        assert_eq!(path.stroke, "steelblue");
    }

    #[test]
    fn test_empty_dataset_draws_empty_path_and_axes() {
        let surface = drawn(Vec::new());
        assert_eq!(surface.path().unwrap().commands.len(), 0);
        let left = surface.axis(Orient::Left).unwrap();
        assert_eq!(left.ticks.len(), 1);
        assert_eq!(left.ticks[0].label, "0");
    }

    #[test]
    fn test_bottom_axis_ticks() {
        let surface = drawn(SAMPLE_DATA.to_vec());
        let bottom = surface.axis(Orient::Bottom).unwrap();
        let values: Vec<f64> = bottom.ticks.iter().map(|t| t.value).collect();
        assert_eq!(
            values,
            vec![5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0]
        );
        assert_eq!(bottom.ticks[0].label, "5");
        assert_eq!(bottom.translate, (0.0, 150.0));
        assert_eq!(bottom.title.text, "Week");
    }

    #[test]
    fn test_left_axis_ticks() {
        let surface = drawn(SAMPLE_DATA.to_vec());
        let left = surface.axis(Orient::Left).unwrap();
        assert_eq!(left.ticks.len(), 16);
        assert_eq!(left.ticks.first().unwrap().label, "0");
        assert_eq!(left.ticks.last().unwrap().label, "300");
        assert_eq!(left.ticks.last().unwrap().offset, 0.0);
        assert_eq!(left.title.text, "Amount Spent (USD)");
        assert_eq!((left.title.x, left.title.y), (-75.0, -40.0));
    }

    #[test]
    fn test_fractional_ticks() {
        let scale = LinearScale::new((0.0, 1.0), (0.0, 100.0));
        let ticks = scale.ticks(5);
        assert_eq!(ticks, vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        let labels = scale.tick_labels(&ticks, 5);
        assert_eq!(labels[1], "0.2");
        assert_eq!(labels[5], "1.0");
    }

    #[test]
    fn test_format_tick_groups_thousands() {
        assert_eq!(format_tick(1250.0, 0), "1,250");
        assert_eq!(format_tick(1_000_000.0, 0), "1,000,000");
        assert_eq!(format_tick(0.25, 2), "0.25");
        assert_eq!(format_tick(-40.0, 0), "\u{2212}40");
        assert_eq!(format_tick(-0.0, 0), "0");
    }

    #[test]
    fn test_redraw_is_idempotent() {
        let renderer = ChartRenderer::default();
        let mut surface = Surface::default();
        renderer.draw(&mut surface);
        let first = surface.clone();
        renderer.draw(&mut surface);
        assert_eq!(surface, first);
        assert_eq!(surface.elements().len(), 3);
    }

    #[test]
    fn test_svg_contains_path_and_titles() {
        let svg = drawn(SAMPLE_DATA.to_vec()).to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"d="M0,135L"#));
        assert!(svg.contains(">Week</text>"));
        assert!(svg.contains(">Amount Spent (USD)</text>"));
        assert!(svg.contains(r#"transform="translate(0,150)""#));
        assert_eq!(svg.matches("<g ").count(), 2);
    }

    #[test]
    fn test_transcript_policy_redraws_on_every_revision() {
        let mut view = ChartView::new(ChartRenderer::default(), RedrawPolicy::Transcript);
        assert!(view.sync(0));
        assert!(!view.sync(0));
        assert!(view.sync(1));
        assert!(view.sync(2));
        assert_eq!(view.redraw_count(), 3);
        assert_eq!(view.surface().elements().len(), 3);
    }

    #[test]
    fn test_data_policy_ignores_transcript_changes() {
        let mut view = ChartView::new(ChartRenderer::default(), RedrawPolicy::Data);
        assert!(view.sync(0));
        assert!(!view.sync(1));
        assert!(!view.sync(7));
        assert_eq!(view.redraw_count(), 1);
    }
}

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::Marker,
    text::{Line, Span, Text},
    widgets::{
        canvas::{Canvas, Context, Line as CanvasLine},
        Block, Borders, Paragraph, Wrap,
    },
};
use crate::app::App;
use crate::chart::{Axis, Element, Orient, Surface};
use crate::transcript::Sender;

const STEELBLUE: Color = Color::Rgb(70, 130, 180);

/// Canvas margin around the 300x150 drawing area, for tick labels and titles
const MARGIN_LEFT: f64 = 40.0;
const MARGIN_RIGHT: f64 = 10.0;
const MARGIN_TOP: f64 = 10.0;
const MARGIN_BOTTOM: f64 = 32.0;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [chat_column, chart_area] = Layout::horizontal([
        Constraint::Percentage(55),
        Constraint::Percentage(45),
    ])
    .areas(body_area);

    render_chat(app, frame, chat_column);
    render_chart(app.chart.surface(), frame, chart_area);
    render_footer(frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" spendchat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("[{}]", app.backend.display_name()),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" ^U ", key_style),
        Span::styled(" clear ", label_style),
        Span::styled(" ↑/↓ ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" page ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ];

    let footer = Paragraph::new(Line::from(hints)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn sender_label(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "You",
        Sender::System => "Reply",
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let chat_text = if app.transcript.messages().is_empty() && !app.is_waiting() {
        Text::from(Span::styled(
            "No messages yet.",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.transcript.messages() {
            // User messages on the left, replies on the right
            let (alignment, color) = match msg.sender {
                Sender::User => (Alignment::Left, Color::Gray),
                Sender::System => (Alignment::Right, Color::LightBlue),
            };
            lines.push(
                Line::from(Span::styled(
                    sender_label(msg.sender),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))
                .alignment(alignment),
            );
            if msg.text.is_empty() {
                lines.push(Line::default());
            }
            for line in msg.text.lines() {
                lines.push(Line::from(line).alignment(alignment));
            }
            lines.push(Line::default());
        }

        if app.is_waiting() {
            lines.push(
                Line::from(Span::styled(
                    sender_label(Sender::System),
                    Style::default().fg(Color::LightBlue).add_modifier(Modifier::BOLD),
                ))
                .alignment(Alignment::Right),
            );
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(
                Line::from(Span::styled(
                    format!("Thinking{}", dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                ))
                .alignment(Alignment::Right),
            );
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));

    frame.render_widget(chat, chat_area);

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Message ");

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let draft = app.transcript.draft();
    let input = if draft.is_empty() {
        Paragraph::new("Type something and press Enter")
            .style(Style::default().fg(Color::DarkGray))
    } else {
        let visible_text: String = draft
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(input.block(input_block), input_area);

    let cursor_x = (cursor_pos - scroll_offset) as u16;
    frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
}

fn render_chart(surface: &Surface, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Weekly spending ");

    let inner = block.inner(area);
    let x_bounds = [-MARGIN_LEFT, surface.width() + MARGIN_RIGHT];
    let y_bounds = [-MARGIN_BOTTOM, surface.height() + MARGIN_TOP];
    let view = CanvasView {
        height: surface.height(),
        x_bounds,
        y_bounds,
        char_width: (x_bounds[1] - x_bounds[0]) / f64::from(inner.width.max(1)),
        rows: inner.height,
    };

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            for element in surface.elements() {
                match element {
                    Element::Line(path) => {
                        for pair in path.commands.windows(2) {
                            let (x1, y1) = view.point(pair[0].point());
                            let (x2, y2) = view.point(pair[1].point());
                            ctx.draw(&CanvasLine { x1, y1, x2, y2, color: STEELBLUE });
                        }
                    }
                    Element::Axis(axis) => paint_axis(ctx, axis, &view),
                }
            }
        });

    frame.render_widget(canvas, area);
}

/// Maps surface coordinates (y grows down) onto canvas coordinates (y grows up)
struct CanvasView {
    height: f64,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    /// Canvas units covered by one terminal column
    char_width: f64,
    rows: u16,
}

impl CanvasView {
    fn point(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (x, self.height - y)
    }

    /// Like `point`, but kept inside the bounds so text is never dropped
    fn clamped(&self, at: (f64, f64)) -> (f64, f64) {
        let (x, y) = self.point(at);
        (
            x.clamp(self.x_bounds[0], self.x_bounds[1]),
            y.clamp(self.y_bounds[0], self.y_bounds[1]),
        )
    }
}

fn segment(ctx: &mut Context, view: &CanvasView, a: (f64, f64), b: (f64, f64)) {
    let (x1, y1) = view.point(a);
    let (x2, y2) = view.point(b);
    ctx.draw(&CanvasLine { x1, y1, x2, y2, color: Color::Gray });
}

fn paint_axis(ctx: &mut Context, axis: &Axis, view: &CanvasView) {
    let (tx, ty) = axis.translate;
    let (r0, r1) = axis.extent;
    let tick_style = Style::default().fg(Color::Gray);

    match axis.orient {
        Orient::Bottom => {
            segment(ctx, view, (tx + r0, ty), (tx + r1, ty));
            for tick in &axis.ticks {
                let x = tx + tick.offset;
                segment(ctx, view, (x, ty), (x, ty + 6.0));
                let half = tick.label.chars().count() as f64 * view.char_width / 2.0;
                let (px, py) = view.clamped((x - half, ty + 14.0));
                ctx.print(px, py, Span::styled(tick.label.clone(), tick_style));
            }
        }
        Orient::Left => {
            segment(ctx, view, (tx, ty + r0), (tx, ty + r1));
            // Skip labels when there are more ticks than rows to show them
            let stride = if usize::from(view.rows) < axis.ticks.len() * 2 { 2 } else { 1 };
            for (i, tick) in axis.ticks.iter().enumerate() {
                let y = ty + tick.offset;
                segment(ctx, view, (tx, y), (tx - 6.0, y));
                if i % stride != 0 {
                    continue;
                }
                let width = tick.label.chars().count() as f64 * view.char_width;
                let (px, py) = view.clamped((tx - 9.0 - width, y));
                ctx.print(px, py, Span::styled(tick.label.clone(), tick_style));
            }
        }
    }

    let (px, py) = view.clamped((tx + axis.title.x, ty + axis.title.y));
    ctx.print(
        px,
        py,
        Span::styled(axis.title.text, Style::default().fg(Color::White).bold()),
    );
}

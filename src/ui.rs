use crate::app::{App, Phase};
use crate::braille::BrailleCanvas;
use crate::map::{highlight_canvas, MapLayers};
use crate::panel;
use crate::scale;
use crate::uf::StateCode;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Widget, Wrap},
    Frame,
};

const SELECTOR_WIDTH: u16 = 26;
const INFO_WIDTH: u16 = 34;
const LEGEND_WIDTH: u16 = 26;
const OUTLINE: Color = Color::White;
const HIGHLIGHT: Color = Color::Rgb(0x66, 0x66, 0x66);
const BASE: Color = Color::DarkGray;

/// Screen regions, shared by rendering and mouse hit testing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppLayout {
    pub selector: Rect,
    pub selector_inner: Rect,
    pub map: Rect,
    pub map_inner: Rect,
    pub status: Rect,
}

pub fn layout(area: Rect) -> AppLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Selector + map
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SELECTOR_WIDTH), Constraint::Min(10)])
        .split(rows[0]);

    let bordered = Block::default().borders(Borders::ALL);
    AppLayout {
        selector: cols[0],
        selector_inner: bordered.inner(cols[0]),
        map: cols[1],
        map_inner: bordered.inner(cols[1]),
        status: rows[1],
    }
}

/// First visible selector entry, keeping `selected` on screen
pub fn selector_offset(selected: usize, visible: usize) -> usize {
    if visible == 0 || selected < visible {
        0
    } else {
        selected + 1 - visible
    }
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let regions = layout(frame.area());

    render_selector(frame, app, &regions);
    render_map(frame, app, &regions);
    render_info(frame, app, regions.map_inner);
    render_legend(frame, app, regions.map_inner);
    render_status_bar(frame, app, regions.status);
}

fn render_selector(frame: &mut Frame, app: &App, regions: &AppLayout) {
    let items: Vec<ListItem> = StateCode::ALL
        .iter()
        .map(|code| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{code} "), Style::default().fg(Color::Yellow)),
                Span::raw(code.name()),
            ]))
        })
        .collect();

    let selected = app.state.index();
    let mut state = ListState::default()
        .with_offset(selector_offset(selected, regions.selector_inner.height as usize))
        .with_selected(Some(selected));

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(" Estado ", Style::default().fg(Color::Cyan))),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(list, regions.selector, &mut state);
}

fn render_map(frame: &mut Frame, app: &App, regions: &AppLayout) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" COVID-19 · {} ({}) ", app.state.name(), app.state),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(block, regions.map);

    let Some(layers) = app.map_renderer.layers() else {
        return;
    };

    let inner = regions.map_inner;
    let highlights: Vec<BrailleCanvas> = app
        .highlighted()
        .map(|m| highlight_canvas(m, &app.viewport, inner.width as usize, inner.height as usize))
        .collect();

    frame.render_widget(
        MapWidget {
            app,
            layers,
            highlights,
        },
        inner,
    );
}

/// Custom widget: fill colors as cell backgrounds, outlines as braille on top
struct MapWidget<'a> {
    app: &'a App,
    layers: &'a MapLayers,
    highlights: Vec<BrailleCanvas>,
}

impl Widget for MapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let cols = (area.width as usize).min(self.layers.cols);
        let rows = (area.height as usize).min(self.layers.rows);

        for row in 0..rows {
            for col in 0..cols {
                let cell = &mut buf[(area.x + col as u16, area.y + row as u16)];
                let owner = self.layers.owner_at(col, row);

                match owner {
                    Some(idx) => {
                        cell.set_bg(self.app.fill_color(idx));
                        match self.layers.outlines.glyph(col, row) {
                            Some(ch) => cell.set_char(ch).set_fg(OUTLINE),
                            None => cell.set_char(' '),
                        };
                    }
                    None => {
                        // Outlines of municipalities too small to own a cell
                        // still show, above the base map.
                        if let Some(ch) = self.layers.outlines.glyph(col, row) {
                            cell.set_char(ch).set_fg(OUTLINE);
                        } else if let Some(ch) = self.layers.base.glyph(col, row) {
                            cell.set_char(ch).set_fg(BASE);
                        }
                    }
                }

                // Highlighted outline last so it sits above its neighbours
                for canvas in &self.highlights {
                    if let Some(ch) = canvas.glyph(col, row) {
                        cell.set_char(ch)
                            .set_fg(HIGHLIGHT)
                            .set_style(Style::default().add_modifier(Modifier::BOLD));
                    }
                }
            }
        }
    }
}

/// Right-aligned box at the top or bottom of `area`, clipped to it
fn corner(area: Rect, width: u16, height: u16, top: bool) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + area.width - width;
    let y = if top {
        area.y
    } else {
        area.y + area.height - height
    };
    Rect::new(x, y, width, height)
}

fn render_info(frame: &mut Frame, app: &App, map: Rect) {
    let body: Vec<Line> = match (app.info_target(), app.phase) {
        (Some(m), _) => {
            let record = app.view.cases.as_ref().and_then(|c| c.get(&m.name));
            vec![
                Line::from(Span::styled(
                    m.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(panel::describe(record)),
            ]
        }
        (None, Phase::Loading) => vec![Line::from("Carregando...")],
        (None, _) => vec![Line::from(panel::PLACEHOLDER)],
    };

    let area = corner(map, INFO_WIDTH, body.len() as u16 + 3, true);
    let paragraph = Paragraph::new(body)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Gray))
                .title(Span::styled(
                    panel::INFO_TITLE,
                    Style::default().add_modifier(Modifier::BOLD),
                )),
        );

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn render_legend(frame: &mut Frame, app: &App, map: Rect) {
    let mut lines: Vec<Line> = scale::legend()
        .iter()
        .map(|entry| {
            Line::from(vec![
                Span::styled("██ ", Style::default().fg(entry.color)),
                Span::raw(entry.label),
            ])
        })
        .collect();

    if let Some(updated) = panel::updated_label(app.view.cases.as_ref().and_then(|c| c.updated_on())) {
        lines.push(Line::from(Span::styled(
            updated,
            Style::default().fg(Color::DarkGray),
        )));
    }

    let area = corner(map, LEGEND_WIDTH, lines.len() as u16 + 2, false);
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Gray))
            .title(" Casos "),
    );

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status_color = match (&app.view.cases_error, &app.view.boundaries_error) {
        (None, None) => Color::Green,
        _ => Color::Red,
    };

    let status = Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(app.load_status(), Style::default().fg(status_color)),
        Span::styled(" | Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(
            " | Tab:estado setas:mover +/-:zoom r:reenquadrar Esc:soltar q:sair",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}

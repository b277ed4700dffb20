use crate::errors::ChainlabError;
use crate::recorder::Step;
use crate::session::Report;
use crate::value::Value;
use ratatui::backend::TestBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;

fn pretty_value(value: Option<&Value>) -> String {
    match value {
        Some(value) => serde_json::to_string_pretty(&value.to_json_lossy())
            .unwrap_or_else(|_| value.to_key()),
        None => "null".to_string(),
    }
}

fn step_lines(step: &Step) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("Step {}: ", step.sequence),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(step.function_name.clone(), Style::default().fg(Color::Cyan)),
    ])];
    lines.push(Line::from(format!(
        "  arguments ({}):",
        step.arguments_fidelity.as_str()
    )));
    lines.extend(step.arguments_text.lines().map(|l| Line::from(format!("    {l}"))));
    lines.push(Line::from(format!("  result ({}):", step.result_fidelity.as_str())));
    lines.extend(step.result_text.lines().map(|l| Line::from(format!("    {l}"))));
    lines
}

/// Draws the report into an off-screen buffer and returns it as text, one
/// line per terminal row.
pub fn render_report(report: &Report, width: u16, height: u16) -> Result<String, ChainlabError> {
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).map_err(|e| ChainlabError::Render(e.to_string()))?;
    let error_height = if report.error.is_some() { 3 } else { 0 };
    terminal
        .draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(error_height),
                    Constraint::Percentage(40),
                    Constraint::Min(3),
                ])
                .split(frame.area());

            if let Some(error) = &report.error {
                frame.render_widget(
                    Paragraph::new(error.as_str())
                        .style(Style::default().fg(Color::Red))
                        .block(Block::default().borders(Borders::ALL).title("Error")),
                    chunks[0],
                );
            }

            frame.render_widget(
                Paragraph::new(pretty_value(report.result.as_ref()))
                    .block(Block::default().borders(Borders::ALL).title("Result")),
                chunks[1],
            );

            let steps = if report.steps.is_empty() {
                vec![Line::from("no recorded steps")]
            } else {
                report.steps.iter().flat_map(step_lines).collect()
            };
            frame.render_widget(
                Paragraph::new(steps)
                    .wrap(Wrap { trim: false })
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .title(format!("Steps ({})", report.steps.len())),
                    ),
                chunks[2],
            );
        })
        .map_err(|e| ChainlabError::Render(e.to_string()))?;

    let mut out = String::new();
    let buffer = terminal.backend().buffer().clone();
    for y in 0..height {
        for x in 0..width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    Ok(out)
}

/// Plain text: optional error line, the result, then one block per step.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    if let Some(error) = &report.error {
        out.push_str(&format!("Error: {error}\n\n"));
    }
    out.push_str("Result:\n");
    out.push_str(&pretty_value(report.result.as_ref()));
    out.push_str("\n\nSteps:\n");
    if report.steps.is_empty() {
        out.push_str("(none)\n");
    }
    for step in &report.steps {
        out.push_str(&format!(
            "Step {}: {}\n  arguments:\n{}\n  result:\n{}\n",
            step.sequence,
            step.function_name,
            indent(&step.arguments_text),
            indent(&step.result_text)
        ));
    }
    out
}

pub fn render_json(report: &Report) -> Result<String, ChainlabError> {
    serde_json::to_string_pretty(&report.to_json()).map_err(|e| ChainlabError::Render(e.to_string()))
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{render_json, render_report, render_text};
    use crate::recorder::{Fidelity, Step};
    use crate::session::Report;
    use crate::value::Value;
    use serde_json::json;

    fn report(error: Option<&str>) -> Report {
        Report {
            result: Some(Value::from(json!(["Katowice", "Rybnik"]))),
            steps: vec![Step {
                sequence: 1,
                function_name: "sortBy".to_string(),
                arguments_text: "[]".to_string(),
                result_text: "[\n  \"Katowice\",\n  \"Rybnik\"\n]".to_string(),
                arguments_fidelity: Fidelity::Exact,
                result_fidelity: Fidelity::Exact,
            }],
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn frame_shows_result_steps_and_error_panels() {
        let frame = render_report(&report(Some("can't process")), 60, 30).expect("render");
        assert!(frame.contains("Error"));
        assert!(frame.contains("Result"));
        assert!(frame.contains("Steps (1)"));
        assert!(frame.contains("Step 1: sortBy"));
        assert_eq!(frame.lines().count(), 30);

        let clean = render_report(&report(None), 60, 30).expect("render");
        assert!(!clean.contains("Error"));
    }

    #[test]
    fn text_output_numbers_steps() {
        let text = render_text(&report(None));
        assert!(text.starts_with("Result:\n[\n  \"Katowice\",\n  \"Rybnik\"\n]"));
        assert!(text.contains("Step 1: sortBy\n  arguments:\n    []\n"));
    }

    #[test]
    fn json_output_carries_error_and_steps() {
        let rendered = render_json(&report(Some("can't process"))).expect("json");
        let parsed: serde_json::Value = serde_json::from_str(&rendered).expect("parse");
        assert_eq!(parsed["error"], "can't process");
        assert_eq!(parsed["steps"][0]["function_name"], "sortBy");
        assert_eq!(parsed["result"], json!(["Katowice", "Rybnik"]));
    }
}

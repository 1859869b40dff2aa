// TUI rendering: voltage and clamp-current traces + status panel.

use std::io::Stdout;

use autapse_core::{Phase, Schedule};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::Text,
    widgets::{Block, Borders, Paragraph, Sparkline},
    Terminal,
};

use crate::app::App;
use crate::backend::CellBackend;

/// Offset so resting potentials plot above zero.
const VOLTAGE_FLOOR_MV: f64 = -100.0;

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "idle",
        Phase::OnsetWait => "onset wait",
        Phase::Running(Schedule::Ramp) => "ramp",
        Phase::Running(Schedule::Hold) => "hold",
    }
}

/// Last `width` points of a trace, shifted to non-negative integers.
fn tail(trace: impl DoubleEndedIterator<Item = f64>, width: usize, map: impl Fn(f64) -> f64) -> Vec<u64> {
    let mut points: Vec<u64> = trace.rev().take(width).map(|x| map(x).max(0.0) as u64).collect();
    points.reverse();
    points
}

/// Draws the UI each frame:
/// - Top: membrane voltage (peak per ms)
/// - Middle: autapse current (peak inward per ms)
/// - Bottom: protocol/acquisition status and controls
pub fn draw<B: CellBackend>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &App<B>,
) -> anyhow::Result<()> {
    terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints(
                [
                    Constraint::Percentage(35),
                    Constraint::Percentage(35),
                    Constraint::Percentage(30),
                ]
                .as_ref(),
            )
            .split(f.size());

        let width = chunks[0].width.saturating_sub(2) as usize;

        let voltage = tail(app.voltage.iter().copied(), width, |v| v - VOLTAGE_FLOOR_MV);
        let v_now = app.backend.voltage() * 1e3;
        let voltage_widget = Sparkline::default()
            .block(
                Block::default()
                    .title(format!("Vm  {:.1} mV  (time →)", v_now))
                    .borders(Borders::ALL),
            )
            .data(&voltage)
            .style(Style::default().fg(Color::White));
        f.render_widget(voltage_widget, chunks[0]);

        let current = tail(app.current.iter().copied(), width, |i| -i);
        let out = app.last_output();
        let current_widget = Sparkline::default()
            .block(
                Block::default()
                    .title(format!("Isyn  {:.1} pA inward", -out.current * 1e12))
                    .borders(Borders::ALL),
            )
            .data(&current)
            .style(Style::default().fg(Color::Yellow));
        f.render_widget(current_widget, chunks[1]);

        let rt = &app.runtime;
        let cfg = rt.config();
        let snap = rt.snapshot();
        let buffer = rt.buffer();
        let last_file = rt
            .sink()
            .last()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        let status = format!(
            "Tick: {} | t: {:.3} s | dt: {:.0} µs | Running: {} | Bias: {:.0} pA\n\
             Protocol: {} | G: {:.3} nS | Onset: {:.2}/{:.2} s | Active: {} | Acquire: {}\n\
             Cell: {} | Buffered: {}/{} | Dropped: {} | Last file: {}\n\
             Info: {}\n\
             Controls: [s] Step  [r] Run/Pause  [a] Active  [l] Acquire  [c] Next cell  [+/-] Bias  [ ] Period  [q] Quit",
            app.tick,
            app.tick as f64 * rt.dt(),
            rt.dt() * 1e6,
            if app.running { "yes" } else { "no" },
            app.backend.bias(),
            phase_label(rt.protocol().phase()),
            out.conductance,
            snap.onset_elapsed,
            cfg.onset_delay,
            if cfg.active { "yes" } else { "no" },
            if cfg.acquire { "yes" } else { "no" },
            buffer.cell(),
            buffer.len(),
            buffer.capacity(),
            snap.dropped,
            last_file,
            cfg.info,
        );
        let status_widget = Paragraph::new(Text::from(status))
            .style(Style::default().fg(Color::Cyan))
            .block(Block::default().title("Status").borders(Borders::ALL));
        f.render_widget(status_widget, chunks[2]);
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_latest_points_in_order() {
        let trace = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(tail(trace.iter().copied(), 2, |x| x), vec![3, 4]);
        assert_eq!(tail(trace.iter().copied(), 10, |x| x - 2.0), vec![0, 0, 1, 2]);
    }
}

//! Rendering of analysed text: terminal highlights, HTML, JSON, summary table.
//!
//! Renderers only format what the resolver produced; they never look at raw
//! labels or re-derive spans.

use arrow::util::pretty::pretty_format_batches;
use nerlight_core::schema::summary_batch;
use nerlight_core::{Analysis, Anomaly, LabelCatalog, RenderedSegment, SummaryRow};

// ── Terminal ──

const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";

/// Render segments with 24-bit ANSI background colours, tag after each entity.
pub fn render_terminal(segments: &[RenderedSegment]) -> String {
    let mut out = String::new();
    for seg in segments {
        match seg {
            RenderedSegment::Plain { text, .. } => out.push_str(text),
            RenderedSegment::Entity {
                text, tag, color, ..
            } => {
                let (r, g, b) = parse_hex(color).unwrap_or((0xE0, 0xE0, 0xE0));
                let fg = if luminance(r, g, b) > 140.0 { "30" } else { "97" };
                out.push_str(&format!(
                    "\x1b[48;2;{r};{g};{b}m\x1b[{fg}m {text} {RESET}{DIM}[{tag}]{RESET}"
                ));
            }
        }
    }
    out
}

/// Parse `#RRGGBB`.
fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Perceived brightness (ITU-R BT.601), 0..255.
fn luminance(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

// ── HTML ──

/// Render segments as inline HTML with one highlighted `<span>` per entity.
pub fn render_html(segments: &[RenderedSegment]) -> String {
    let mut out = String::new();
    for seg in segments {
        match seg {
            RenderedSegment::Plain { text, .. } => out.push_str(&escape_html(text)),
            RenderedSegment::Entity {
                text, tag, color, ..
            } => {
                out.push_str(&format!(
                    "<span style=\"background-color:{color}; padding:3px 6px; \
                     border-radius:4px; margin:2px;\">{} <sub><code>{tag}</code></sub></span>",
                    escape_html(text)
                ));
            }
        }
    }
    out
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ── JSON ──

pub fn render_json(analysis: &Analysis) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(analysis)?)
}

// ── Summary table ──

/// Format the entity summary as an ASCII table.
pub fn format_summary(rows: &[SummaryRow]) -> anyhow::Result<String> {
    let batch = summary_batch(rows)?;
    Ok(pretty_format_batches(&[batch])?.to_string())
}

/// Print highlighted output followed by the summary table.
pub fn print_analysis(analysis: &Analysis, html: bool) -> anyhow::Result<()> {
    let res = &analysis.resolution;

    println!("=== Highlighted Output ===");
    if html {
        println!("{}", render_html(&res.segments));
    } else {
        println!("{}", render_terminal(&res.segments));
    }
    println!();

    println!("=== Entity Summary Table ===");
    if res.rows.is_empty() {
        println!("  (no entities)");
    } else {
        println!("{}", format_summary(&res.rows)?);
    }

    if !res.anomalies.is_empty() {
        println!();
        print_anomalies(&res.anomalies);
    }
    Ok(())
}

fn print_anomalies(anomalies: &[Anomaly]) {
    println!("Anomalies ({}):", anomalies.len());
    for a in anomalies {
        println!("  #{:<4} {}", a.index, a.kind);
    }
}

// ── Legend ──

pub fn print_legend(catalog: &LabelCatalog) {
    println!("Label Legend");
    for entry in catalog.legend() {
        println!(
            "  '{}'  {:<7} {}  {}",
            entry.raw_id,
            entry.tag.as_str(),
            entry.tag.color(),
            entry.description
        );
    }
    println!(
        "  other {:<7} {}  Outside of any entity",
        "O",
        nerlight_core::DEFAULT_COLOR
    );
}

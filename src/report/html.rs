//! HTML report generation with Chart.js charts

use crate::charts::SlotId;
use crate::panel::{Panel, PanelId};
use crate::report::Report;
use crate::view::{format_percent, DetailRow, LegendItem};
use std::io::{self, Write};

pub fn write<W: Write>(writer: &mut W, report: &Report) -> io::Result<()> {
    let view = report.view;
    let summary = &report.summary;

    // Canvas id -> Chart.js config
    let mut configs = serde_json::Map::new();
    for (slot, spec) in [
        (SlotId::Censorable, &view.bar_chart),
        (SlotId::TopicPie, &view.topic_pie),
        (SlotId::SentimentPie, &view.sentiment_pie),
    ] {
        configs.insert(slot.canvas_id().to_string(), spec.to_chartjs());
    }
    let chart_data = json_for_script(&serde_json::Value::Object(configs));

    let topic_size = view.topic_pie.size.unwrap_or_default();
    let sentiment_size = view.sentiment_pie.size.unwrap_or_default();

    let backdrop = report
        .backdrop
        .as_deref()
        .map(|svg| format!(r#"<div class="backdrop" aria-hidden="true">{}</div>"#, svg))
        .unwrap_or_default();

    // Write the full HTML document
    write!(writer, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Comment Analysis Report</title>
    <script src="https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js"></script>
    <style>
        :root {{
            --bg: #0d1117;
            --card: #161b22;
            --border: #30363d;
            --text: #e6edf3;
            --dim: #7d8590;
            --flag: #f85149;
            --accent: #58a6ff;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
            background: var(--bg);
            color: var(--text);
            line-height: 1.5;
        }}
        .backdrop {{ position: fixed; inset: 0; z-index: -1; overflow: hidden; }}
        .backdrop svg {{ position: absolute; inset: 0; width: 100%; height: 100%; }}
        .container {{ max-width: 1200px; margin: 0 auto; padding: 2rem; }}

        /* Header */
        .header {{
            margin-bottom: 2rem;
            padding-bottom: 1rem;
            border-bottom: 1px solid var(--border);
        }}
        .logo {{
            font-size: 2.5rem;
            font-weight: 800;
            background: linear-gradient(135deg, var(--accent), #a371f7);
            -webkit-background-clip: text;
            -webkit-text-fill-color: transparent;
        }}
        .subtitle {{ color: var(--dim); font-size: 1rem; word-break: break-all; }}

        /* Stats Row */
        .stats {{
            display: grid;
            grid-template-columns: repeat(4, 1fr);
            gap: 1rem;
            margin-bottom: 2rem;
        }}
        .stat {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 1.5rem;
            text-align: center;
        }}
        .stat-value {{ font-size: 2rem; font-weight: 700; line-height: 1.1; }}
        .stat-label {{ color: var(--dim); font-size: 0.875rem; text-transform: uppercase; letter-spacing: 0.05em; margin-top: 0.5rem; }}
        .stat.flag .stat-value {{ color: var(--flag); }}

        .card {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 1.5rem;
            margin-bottom: 1.5rem;
        }}
        .card-title {{ font-size: 1rem; font-weight: 600; margin-bottom: 1rem; color: var(--dim); }}
        .bar-wrap {{ position: relative; height: 280px; }}

        /* Panels */
        .toggle {{
            background: transparent;
            color: var(--accent);
            border: 1px solid var(--border);
            border-radius: 6px;
            padding: 0.4rem 0.9rem;
            cursor: pointer;
            margin-bottom: 1rem;
        }}
        .panel {{ display: none; }}
        .panel.shown {{ display: block; }}
        .pies {{ display: grid; grid-template-columns: 1fr 1fr; gap: 1.5rem; }}

        /* Legends */
        .legend {{ list-style: none; margin-top: 1rem; }}
        .legend li {{ display: flex; align-items: center; gap: 0.5rem; font-size: 0.875rem; }}
        .legend-dot {{ width: 12px; height: 12px; border-radius: 50%; flex-shrink: 0; }}
        .legend-pct {{ margin-left: auto; color: var(--dim); font-variant-numeric: tabular-nums; }}

        /* Detail table */
        table {{ width: 100%; border-collapse: collapse; font-size: 0.875rem; }}
        th, td {{ text-align: left; padding: 0.5rem; border-bottom: 1px solid var(--border); vertical-align: top; }}
        th {{ color: var(--dim); font-weight: 600; }}
        tr.censorable td {{ color: var(--flag); background: rgba(248, 81, 73, 0.08); }}
    </style>
</head>
<body>
    {backdrop}
    <div class="container">
        <div class="header">
            <div class="logo">commentlens</div>
            <div class="subtitle">{url}</div>
            <div class="subtitle">Generated {generated}</div>
        </div>

        <div class="stats">
            <div class="stat"><div class="stat-value">{total}</div><div class="stat-label">Comments</div></div>
            <div class="stat flag"><div class="stat-value">{censorable}</div><div class="stat-label">Censorable ({censorable_pct})</div></div>
            <div class="stat"><div class="stat-value" id="topTopic">{top_topic}</div><div class="stat-label">Top topic</div></div>
            <div class="stat"><div class="stat-value" id="topSentiment">{top_sentiment}</div><div class="stat-label">Top sentiment</div></div>
        </div>

        <div class="card">
            <div class="card-title">Flagged categories</div>
            <div class="bar-wrap"><canvas id="{bar_id}"></canvas></div>
        </div>

        <div class="card">
            {advanced_button}
            <div id="{advanced_id}" class="{advanced_class}">
                <div class="pies">
                    <div>
                        <div class="card-title">Topics</div>
                        <canvas id="{topic_id}" width="{topic_w}" height="{topic_h}"></canvas>
                        <ul class="legend">{topic_legend}</ul>
                    </div>
                    <div>
                        <div class="card-title">Sentiments</div>
                        <canvas id="{sentiment_id}" width="{sentiment_w}" height="{sentiment_h}"></canvas>
                        <ul class="legend">{sentiment_legend}</ul>
                    </div>
                </div>
            </div>
        </div>

        <div class="card">
            {full_button}
            <div id="{full_id}" class="{full_class}">
                <table>
                    <thead><tr><th>#</th><th>Comment</th><th>Topic</th><th>Sentiment</th></tr></thead>
                    <tbody>{table_rows}</tbody>
                </table>
            </div>
        </div>
    </div>

    <script>
    const charts = {chart_data};

    for (const [id, config] of Object.entries(charts)) {{
        const canvas = document.getElementById(id);
        if (!canvas) continue;
        const existing = Chart.getChart(canvas);
        if (existing) existing.destroy();
        new Chart(canvas, config);
    }}

    function togglePanel(panelId, buttonId) {{
        const panel = document.getElementById(panelId);
        const button = document.getElementById(buttonId);
        const shown = panel.classList.toggle('shown');
        button.setAttribute('aria-expanded', shown ? 'true' : 'false');
    }}
    </script>
</body>
</html>
"#,
        backdrop = backdrop,
        url = html_escape(&report.url),
        generated = html_escape(&report.generated),
        total = summary.total,
        censorable = summary.censorable,
        censorable_pct = format_percent(summary.censorable_percentage),
        top_topic = html_escape(&summary.top_topic),
        top_sentiment = html_escape(&summary.top_sentiment),
        bar_id = SlotId::Censorable.canvas_id(),
        advanced_button = toggle_button(&report.panels.advanced, "Advanced results"),
        advanced_id = PanelId::AdvancedResults.element_id(),
        advanced_class = panel_class(&report.panels.advanced),
        topic_id = SlotId::TopicPie.canvas_id(),
        topic_w = topic_size.width,
        topic_h = topic_size.height,
        topic_legend = legend_items(&view.topic_legend),
        sentiment_id = SlotId::SentimentPie.canvas_id(),
        sentiment_w = sentiment_size.width,
        sentiment_h = sentiment_size.height,
        sentiment_legend = legend_items(&view.sentiment_legend),
        full_button = toggle_button(&report.panels.full, "Full results"),
        full_id = PanelId::FullResults.element_id(),
        full_class = panel_class(&report.panels.full),
        table_rows = table_rows(&view.rows),
        chart_data = chart_data
    )?;

    Ok(())
}

fn toggle_button(panel: &Panel, label: &str) -> String {
    format!(
        r#"<button type="button" class="toggle" id="{button}" aria-controls="{element}" aria-expanded="{expanded}" onclick="togglePanel('{element}', '{button}')">{label}</button>"#,
        button = panel.id.button_id(),
        element = panel.id.element_id(),
        expanded = panel.aria_expanded(),
        label = label
    )
}

fn panel_class(panel: &Panel) -> &'static str {
    if panel.shown {
        "panel shown"
    } else {
        "panel"
    }
}

fn legend_items(items: &[LegendItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                r#"<li><span class="legend-dot" style="background:{}"></span>{}<span class="legend-pct">{}</span></li>"#,
                html_escape(&item.color),
                html_escape(&item.label),
                html_escape(&item.display)
            )
        })
        .collect()
}

fn table_rows(rows: &[DetailRow]) -> String {
    rows.iter()
        .map(|row| {
            let class = if row.censorable { r#" class="censorable""# } else { "" };
            format!(
                "<tr{}><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                class,
                row.index,
                html_escape(&row.comment),
                html_escape(&row.topic),
                html_escape(&row.sentiment)
            )
        })
        .collect()
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// JSON that can sit inside a `<script>` element
fn json_for_script(value: &serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}

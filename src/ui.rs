use crate::report::Report;
use crate::series::FormFilter;
use crate::window::RANGES;

pub fn render_report(report: &Report) -> String {
    fill(
        REPORT_HTML,
        &[
            ("STYLE", STYLE.to_string()),
            ("RANGE_OPTIONS", range_options(report.window.range)),
            ("FORM_OPTIONS", form_options(report)),
            ("TIMEZONE", escape_html(&report.timezone)),
            ("TABLE", escape_html(&report.table)),
            ("LABELS", script_json(&report.labels())),
            ("DATASETS", script_json(&report.datasets())),
        ],
    )
}

pub fn render_error(message: &str) -> String {
    fill(
        ERROR_HTML,
        &[("STYLE", STYLE.to_string()), ("MESSAGE", escape_html(message))],
    )
}

// Single pass over the template: substituted values are never rescanned.
fn fill(template: &str, values: &[(&str, String)]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            output.push_str(&rest[start..]);
            return output;
        };
        let name = &after[..end];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => output.push_str(value),
            None => output.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    output.push_str(rest);
    output
}

fn range_options(selected: u32) -> String {
    RANGES
        .iter()
        .map(|range| {
            format!(
                r#"<option value="{range}"{}>Last {range} days</option>"#,
                selected_attr(*range == selected)
            )
        })
        .collect::<Vec<_>>()
        .join("\n          ")
}

fn form_options(report: &Report) -> String {
    let mut options = vec![format!(
        r#"<option value="all"{}>All forms (total)</option>"#,
        selected_attr(report.filter == FormFilter::All)
    )];
    for form in &report.forms {
        options.push(format!(
            r#"<option value="{id}"{selected}>#{id} &mdash; {title}</option>"#,
            id = form.id,
            selected = selected_attr(report.filter == FormFilter::Form(form.id)),
            title = escape_html(&form.title),
        ));
    }
    options.join("\n          ")
}

fn selected_attr(selected: bool) -> &'static str {
    if selected { " selected" } else { "" }
}

fn script_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "[]".to_string())
        .replace('<', "\\u003c")
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const STYLE: &str = r#"
    :root {
      --bg-1: #f8f3e6;
      --ink: #2b2a28;
      --muted: #6b645d;
      --accent-2: #2f4858;
      --card: #ffffff;
      --border: #e3e3e7;
    }

    body {
      margin: 20px;
      background: var(--bg-1);
      color: var(--ink);
      font: 14px/1.4 system-ui, -apple-system, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
    }

    .container {
      max-width: 1100px;
      margin: 0 auto;
    }

    .controls {
      display: flex;
      gap: 12px;
      flex-wrap: wrap;
      align-items: center;
      margin-bottom: 16px;
    }

    label {
      font-weight: 600;
    }

    select {
      padding: 6px 8px;
    }

    .card {
      border: 1px solid var(--border);
      border-radius: 12px;
      padding: 16px;
      background: var(--card);
      box-shadow: 0 1px 2px rgba(0, 0, 0, 0.03);
    }

    .canvas-wrap {
      position: relative;
      height: 360px;
    }

    .note {
      color: var(--muted);
      font-size: 12px;
      margin-top: 8px;
    }

    .error {
      color: var(--accent-2);
      font-weight: 600;
    }
"#;

const REPORT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Form submissions history</title>
  <style>{{STYLE}}</style>
</head>
<body>
  <div class="container">
    <h1>Form submissions history</h1>
    <form method="get" class="controls card">
      <div>
        <label for="range">Range:</label>
        <select name="range" id="range">
          {{RANGE_OPTIONS}}
        </select>
      </div>
      <div>
        <label for="form">Form:</label>
        <select name="form" id="form">
          {{FORM_OPTIONS}}
        </select>
      </div>
      <div>
        <button type="submit">Update</button>
      </div>
    </form>

    <div class="card">
      <div class="canvas-wrap">
        <canvas id="chart" height="360"></canvas>
      </div>
      <div class="note">
        Timezone: {{TIMEZONE}}. Counts are aggregated per day (00:00&ndash;23:59). Source table: <code>{{TABLE}}</code>.
      </div>
    </div>
  </div>

  <script>
    (function () {
      const labels = {{LABELS}};
      const datasets = {{DATASETS}};

      const loadScript = (src) =>
        new Promise((resolve, reject) => {
          const script = document.createElement('script');
          script.src = src;
          script.onload = resolve;
          script.onerror = reject;
          document.head.appendChild(script);
        });

      (async () => {
        if (!window.Chart) {
          await loadScript('https://cdn.jsdelivr.net/npm/chart.js');
        }
        const ctx = document.getElementById('chart').getContext('2d');
        new Chart(ctx, {
          type: 'line',
          data: { labels, datasets },
          options: {
            responsive: true,
            maintainAspectRatio: false,
            interaction: { mode: 'index', intersect: false },
            plugins: { legend: { position: 'bottom' } },
            scales: {
              x: { title: { display: true, text: 'Day' } },
              y: { beginAtZero: true, ticks: { precision: 0 }, title: { display: true, text: 'Submissions' } }
            },
            elements: { point: { radius: 2 }, line: { tension: 0.2 } }
          }
        });
      })();
    })();
  </script>
</body>
</html>
"#;

const ERROR_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Form submissions history</title>
  <style>{{STYLE}}</style>
</head>
<body>
  <div class="container">
    <div class="card">
      <p class="error">{{MESSAGE}}</p>
    </div>
  </div>
</body>
</html>
"#;

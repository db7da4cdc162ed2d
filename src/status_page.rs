use crate::health::{HealthState, HealthStatus};
use chrono::{SecondsFormat, Utc};

/// Minimal self-refreshing status page, also served as the buffered path's
/// fallback body when the backend is down.
pub fn render_status_page(state: &HealthState) -> String {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let last_ok = state
        .last_ok
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "no data".to_string());

    let (color, message) = match state.status {
        HealthStatus::Ok => ("#4caf50", "LLM backend is available"),
        HealthStatus::Down => ("#ff5050", "LLM backend is temporarily unavailable"),
        HealthStatus::Unknown => ("#9ca3af", "LLM backend status is not known yet"),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <title>LLM Status</title>
  <meta http-equiv="refresh" content="10" />
  <style>
    body {{
      font-family: system-ui, -apple-system, BlinkMacSystemFont, sans-serif;
      background: #0f172a;
      color: #e5e7eb;
      margin: 0;
      display: flex;
      flex-direction: column;
      height: 100vh;
      justify-content: center;
      align-items: center;
      text-align: center;
    }}
    h1 {{ color: {color}; margin-bottom: 0.5rem; }}
    p {{ color: #9ca3af; margin: 0.25rem 0; }}
    code {{ color: #e5e7eb; background: #020617; padding: 2px 4px; border-radius: 4px; }}
  </style>
</head>
<body>
  <h1>{message}</h1>
  <p>Last successful backend response: <code>{last_ok}</code></p>
  <p>Current time (UTC): <code>{now}</code></p>
  <p>This page refreshes every 10 seconds</p>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_page_shows_last_ok_timestamp() {
        let state = HealthState {
            status: HealthStatus::Ok,
            last_ok: Some(Utc.with_ymd_and_hms(2024, 1, 5, 12, 30, 0).unwrap()),
        };
        let page = render_status_page(&state);
        assert!(page.contains("LLM backend is available"));
        assert!(page.contains("2024-01-05T12:30:00Z"));
    }

    #[test]
    fn test_page_without_last_ok() {
        let state = HealthState {
            status: HealthStatus::Down,
            last_ok: None,
        };
        let page = render_status_page(&state);
        assert!(page.contains("temporarily unavailable"));
        assert!(page.contains("no data"));
    }
}

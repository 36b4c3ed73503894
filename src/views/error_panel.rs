// Error log panel: client errors reported to the API and errors this server logged.
use crate::{
    services::ClientErrorEntry,
    utils::html::{escape, opt_text},
    views::badge,
};

const CLEAR_SCRIPT: &str = r#"
document.getElementById('clear-errors')?.addEventListener('click', async () => {
  const res = await fetch('/errors', { method: 'DELETE' });
  if (res.ok) location.reload();
});
"#;

fn server_section(server: &Result<Vec<ClientErrorEntry>, String>) -> String {
    match server {
        Err(reason) => format!(
            "<p class=\"muted\">Client error log unavailable: {}</p>",
            escape(reason)
        ),
        Ok(entries) if entries.is_empty() => "<p class=\"muted\">No client errors reported</p>".to_string(),
        Ok(entries) => {
            let rows: String = entries
                .iter()
                .map(|e| {
                    format!(
                        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                        escape(&opt_text(e.timestamp.as_deref())),
                        badge(e.level.as_deref().unwrap_or("error")),
                        escape(&e.message),
                        escape(&opt_text(e.user_id.as_deref())),
                        escape(&opt_text(e.url.as_deref())),
                    )
                })
                .collect();
            format!(
                "<table><thead><tr><th>When</th><th>Level</th><th>Message</th><th>User</th><th>Page</th></tr></thead>\
                 <tbody>{rows}</tbody></table>"
            )
        }
    }
}

pub fn error_panel(server: &Result<Vec<ClientErrorEntry>, String>, local: &[String]) -> String {
    let local_section = if local.is_empty() {
        "<p class=\"muted\">Nothing logged since start-up</p>".to_string()
    } else {
        let items: String = local
            .iter()
            .rev()
            .map(|message| format!("<li>{}</li>", escape(message)))
            .collect();
        format!("<ul>{items}</ul>")
    };

    format!(
        "<h2>Client errors</h2>{server}\
         <button id=\"clear-errors\" type=\"button\">Clear log</button>\
         <h2>Server errors</h2>{local}<script>{script}</script>",
        server = server_section(server),
        local = local_section,
        script = CLEAR_SCRIPT,
    )
}

use assetflow_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line("database.url", &config.database.url));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
    ));
    lines.push(render_line("database.timeout_secs", &config.database.timeout_secs.to_string()));

    lines.push(render_line("logging.level", &config.logging.level));
    lines.push(render_line("logging.format", &format!("{:?}", config.logging.format)));

    let roles = config
        .roles
        .levels
        .iter()
        .map(|role| format!("{}={}", role.name, role.level))
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(render_line("roles.levels", &roles));
    lines.push(render_line(
        "roles.min_approver_level",
        &config.roles.min_approver_level.to_string(),
    ));

    lines.push(render_line("notifier.enabled", &config.notifier.enabled.to_string()));
    lines.push(render_line("notifier.api_url", &config.notifier.api_url));
    let api_key = config
        .notifier
        .api_key
        .as_ref()
        .map(|key| redact_secret(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    lines.push(render_line("notifier.api_key", &api_key));
    lines.push(render_line("notifier.from_address", &config.notifier.from_address));
    lines.push(render_line("notifier.approvals_inbox", &config.notifier.approvals_inbox));

    lines.join("\n")
}

fn render_line(key: &str, value: &str) -> String {
    format!("  {key} = {value}")
}

fn redact_secret(raw: &str) -> String {
    if raw.len() <= 4 {
        return "****".to_string();
    }
    format!("{}****", &raw[..4])
}

#[cfg(test)]
mod tests {
    use super::redact_secret;

    #[test]
    fn secrets_are_redacted_to_a_short_prefix() {
        assert_eq!(redact_secret("re_abcdef123456"), "re_a****");
        assert_eq!(redact_secret("key"), "****");
    }
}

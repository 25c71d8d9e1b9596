//! `tabsplit serve` — run the HTTP gateway.

use tabsplit_config::AppConfig;

pub async fn run(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port {
        config.gateway.port = port;
    }

    if !config.has_api_key() {
        print_api_key_help();
        return Err("No API key found. See above for setup instructions.".into());
    }

    tabsplit_gateway::start(config).await
}

pub(crate) fn print_api_key_help() {
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    ANTHROPIC_API_KEY=sk-ant-...   (recommended)");
    eprintln!("    OPENAI_API_KEY=sk-...          (for OpenAI-compatible backends)");
    eprintln!("    TABSPLIT_API_KEY=...           (generic)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
}

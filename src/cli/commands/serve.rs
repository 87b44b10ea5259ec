//! Web server command.

use console::style;

use crate::config::Settings;
use crate::ocr::PopplerRenderer;

const DEFAULT_PORT: u16 = 5000;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind);

    println!("{} Preparing database...", style("→").cyan());
    settings.ensure_directories()?;
    let ctx = settings.create_db_context();
    if let Err(e) = ctx.init_schema().await {
        eprintln!("  {} Schema setup failed: {}", style("✗").red(), e);
        return Err(anyhow::anyhow!("Database setup failed: {}", e));
    }
    println!("  {} Database ready", style("✓").green());

    for (tool, found) in PopplerRenderer::check_tools().await {
        if !found {
            println!(
                "  {} {} not found (install poppler-utils); PDF uploads will fail",
                style("!").yellow(),
                tool
            );
        }
    }

    println!(
        "{} Starting Gradebook server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "5000" -> 127.0.0.1:5000
/// - Just a host: "0.0.0.0" -> 0.0.0.0:5000
/// - Host and port: "0.0.0.0:8080" -> 0.0.0.0:8080
fn parse_bind_address(bind: &str) -> (String, u16) {
    if let Ok(port) = bind.parse::<u16>() {
        return ("127.0.0.1".to_string(), port);
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return (host.to_string(), port);
        }
    }

    (bind.to_string(), DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_address() {
        assert_eq!(parse_bind_address("8080"), ("127.0.0.1".to_string(), 8080));
        assert_eq!(parse_bind_address("0.0.0.0"), ("0.0.0.0".to_string(), 5000));
        assert_eq!(
            parse_bind_address("0.0.0.0:3030"),
            ("0.0.0.0".to_string(), 3030)
        );
        assert_eq!(
            parse_bind_address("localhost:notaport"),
            ("localhost:notaport".to_string(), 5000)
        );
    }
}

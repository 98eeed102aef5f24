use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::interval;

use tabdash::logging::{info, obj, v_str, Domain};
use tabdash::{Config, Dashboard, Services};

fn draw(dash: &Dashboard) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    // clear screen, cursor home
    write!(stdout, "\x1b[2J\x1b[H{}", dash.render())?;
    stdout.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let services = Services::from_config(&cfg);
    info(
        Domain::System,
        "config",
        obj(&[
            ("backend", v_str(&cfg.backend_url)),
            ("fallback_city", v_str(&cfg.fallback_location.city)),
            ("network_gauge", serde_json::Value::Bool(cfg.show_network)),
        ]),
    );
    let mut dash = Dashboard::start(cfg, services);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut redraw = interval(dash.config().clock_tick);

    loop {
        tokio::select! {
            _ = redraw.tick() => draw(&dash)?,
            line = lines.next_line() => match line? {
                Some(text) => {
                    dash.set_query(&text);
                    dash.submit();
                    draw(&dash)?;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    dash.shutdown();
    println!();
    Ok(())
}

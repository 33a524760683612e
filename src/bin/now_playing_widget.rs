use dotenvy::dotenv;
use log::{error, info};
use nowplaying::{
    config::widget_url_from_env,
    widget::{HttpSnapshotSource, Widget},
};

// clear the screen and move the cursor home
const CLEAR: &str = "\x1b[2J\x1b[H";

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let url = match widget_url_from_env() {
        Ok(url) => url,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    info!("Polling {}", url);
    let mut handle = Widget::new(HttpSnapshotSource::new(url)).spawn();
    println!("{}{}", CLEAR, handle.view());

    loop {
        tokio::select! {
            changed = handle.changed() => {
                if !changed {
                    break;
                }

                println!("{}{}", CLEAR, handle.view());
            }

            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.stop();
}

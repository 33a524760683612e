use dotenvy::dotenv;
use log::error;
use nowplaying::{config::Config, proxy};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = proxy::serve(config).await {
        error!("Server failed: {}", err);
        std::process::exit(1);
    }
}

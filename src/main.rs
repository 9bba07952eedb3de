use std::process;

use iron::Iron;
use log::{error, info};

use posts_backend::{build_chain, Config, PostRepository};

// RUST_LOG=info POSTS_ADDR=127.0.0.1:5002 posts_backend > logs 2>&1 &
fn main() {
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let repository = if config.seed {
        PostRepository::seeded()
    } else {
        PostRepository::new()
    };
    info!("serving {} posts on {}", repository.len(), config.addr);

    if let Err(e) = Iron::new(build_chain(repository)).http(config.addr) {
        error!("could not listen on {}: {}", config.addr, e);
        process::exit(1);
    }
}

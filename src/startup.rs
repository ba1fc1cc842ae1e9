use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use crate::config::Settings;
use crate::routes::{handle_join_waitlist, health_check, json_error_handler};
use crate::store::WaitlistStore;

pub struct Application {
    pub port: u16,
    pub server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, std::io::Error> {
        let store = WaitlistStore::new(&config.storage);
        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            "Server listening on {}, waitlist stored at {}",
            listener.local_addr()?,
            store.path().display()
        );

        let server = run(listener, store)?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(listener: TcpListener, store: WaitlistStore) -> Result<Server, std::io::Error> {
    // One store shared by every worker, so its lock covers all requests
    let store = web::Data::new(store);

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/api/waitlist", web::post().to(handle_join_waitlist))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(store.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

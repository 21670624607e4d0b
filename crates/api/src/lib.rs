mod dispatch;
mod error;
mod job_schedulers;
mod occurrence;
mod reminder;
mod shared;
mod status;
mod webhook;

use actix_cors::Cors;
use actix_web::{dev::Server, middleware, web, App, HttpServer};
use carecall_infra::CarecallContext;
pub use job_schedulers::JobSchedulers;
use std::net::TcpListener;
use tracing::info;
use tracing_actix_web::TracingLogger;

pub fn configure_server_api(cfg: &mut web::ServiceConfig) {
    occurrence::configure_routes(cfg);
    reminder::configure_routes(cfg);
    status::configure_routes(cfg);
    webhook::configure_routes(cfg);
}

pub struct Application {
    server: Server,
    port: u16,
    job_schedulers: Option<JobSchedulers>,
}

impl Application {
    pub async fn new(context: CarecallContext) -> Result<Self, std::io::Error> {
        let (server, port) = Application::configure_server(context.clone()).await?;
        let job_schedulers = Application::start_job_schedulers(context);

        Ok(Self {
            server,
            port,
            job_schedulers,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn start_job_schedulers(context: CarecallContext) -> Option<JobSchedulers> {
        if context.config.job_schedulers_enabled {
            Some(JobSchedulers::start(context))
        } else {
            info!("Job schedulers are disabled, passes only run through the http api");
            None
        }
    }

    async fn configure_server(context: CarecallContext) -> Result<(Server, u16), std::io::Error> {
        let port = context.config.port;
        let address = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&address)?;
        let port = listener.local_addr()?.port();

        let server = HttpServer::new(move || {
            let ctx = context.clone();

            App::new()
                .wrap(Cors::permissive())
                .wrap(middleware::Compress::default())
                .wrap(TracingLogger::default())
                .app_data(web::Data::new(ctx))
                .service(web::scope("/api/v1").configure(configure_server_api))
        })
        .listen(listener)?
        .workers(4)
        .run();

        Ok((server, port))
    }

    pub async fn start(self) -> Result<(), std::io::Error> {
        let res = self.server.await;
        if let Some(job_schedulers) = self.job_schedulers {
            job_schedulers.stop();
        }
        res
    }
}

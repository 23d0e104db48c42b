//! HTTP server implementation

use crate::app::AppService;
use crate::error::ApiError;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Internal server struct
pub(crate) struct Server {
    service: AppService,
}

impl Server {
    pub fn new(service: AppService) -> Self {
        Self { service }
    }

    /// Run the server
    pub async fn run(self, addr: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = addr.parse()?;
        let listener = TcpListener::bind(addr).await?;

        info!(addr = %addr, "Verso server listening");

        loop {
            let (stream, _remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let app = self.service.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: hyper::Request<Incoming>| {
                    let app = app.clone();
                    async move { Ok::<_, Infallible>(handle_request(app, req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Connection error: {}", err);
                }
            });
        }
    }
}

/// Collect the body and run a single HTTP request through the app
async fn handle_request(app: AppService, req: hyper::Request<Incoming>) -> Response {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            return ApiError::bad_request("Failed to read request body")
                .with_internal(err.to_string())
                .into_response();
        }
    };

    app.handle(Request::new(parts, body)).await
}

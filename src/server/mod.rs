pub mod api;
pub mod websocket;

use crate::agent::CalcAgent;
use crate::cli::Args;
use std::error::Error;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::io::{ AsyncRead, AsyncWrite };
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ Request, Response };
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::http::response::Response as HttpResponse;
use lazy_static::lazy_static;
use governor::{ RateLimiter, Quota, state::{ InMemoryState, NotKeyed }, clock::DefaultClock };
use url::form_urlencoded;

use log::{ info, warn, error, debug };

lazy_static! {
    static ref CONNECTION_LIMITER: RateLimiter<NotKeyed, InMemoryState, DefaultClock> =
        RateLimiter::direct(Quota::per_second(NonZeroU32::new(10).unwrap()));
}

/// WebSocket front-end; every connection drives the same shared agent.
pub struct Server {
    addr: String,
    agent: Arc<Mutex<CalcAgent>>,
    api_key: Option<String>,
    http_port: Option<u16>,
}

impl Server {
    pub fn new(addr: String, agent: CalcAgent, args: &Args) -> Self {
        let api_key = args.server_api_key.clone().filter(|k| !k.trim().is_empty());

        if api_key.is_some() {
            info!("Server configured with API Key authentication.");
        } else {
            warn!("Server configured WITHOUT API Key authentication. Connections are open.");
        }

        Self {
            addr,
            agent: Arc::new(Mutex::new(agent)),
            api_key,
            http_port: args.http_port,
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(http_port) = self.http_port {
            let http_addr = format!("{}:{}", host_of(&self.addr), http_port);
            api::start_http_server(http_addr, self.agent.clone(), self.api_key.clone()).await?;
        }

        let listener = TcpListener::bind(&self.addr).await?;
        info!("WS server listening on: {}", self.addr);

        loop {
            let (stream, peer) = listener.accept().await?;

            if CONNECTION_LIMITER.check().is_err() {
                warn!("Global connection rate limit exceeded for {}. Dropping connection.", peer);
                continue;
            }

            info!("Incoming connection from: {}", peer);
            let agent_clone = Arc::clone(&self.agent);
            let required_api_key = self.api_key.clone();

            tokio::spawn(async move {
                if let Err(e) = Self::process_connection(peer, stream, agent_clone, required_api_key).await {
                    error!("Failed to process connection for {}: {}", peer, e);
                }
            });
        }
    }

    async fn process_connection<S>(
        peer: SocketAddr,
        stream: S,
        agent: Arc<Mutex<CalcAgent>>,
        required_api_key: Option<String>
    ) -> Result<(), Box<dyn Error + Send + Sync>>
        where S: AsyncRead + AsyncWrite + Unpin + Send + 'static
    {
        let auth_callback = |
            req: &Request,
            response: Response
        | -> Result<Response, HttpResponse<Option<String>>> {
            let Some(required) = required_api_key.as_deref() else {
                return Ok(response);
            };

            if provided_api_key(req).as_deref() == Some(required) {
                info!("{} authenticated", peer);
                return Ok(response);
            }

            warn!("{}: bad or missing API key", peer);
            let mut resp = HttpResponse::new(Some("Unauthorized".to_string()));
            *resp.status_mut() = StatusCode::UNAUTHORIZED;
            Err(resp)
        };

        match accept_hdr_async(stream, auth_callback).await {
            Ok(ws) => {
                websocket::handle_connection(peer, ws, agent).await;
                Ok(())
            }
            Err(e) => {
                error!("Handshake failed for {}: {}", peer, e);
                Err(Box::new(e) as _)
            }
        }
    }
}

/// `X-API-Key` header first, then the `api_key` query parameter.
fn provided_api_key(req: &Request) -> Option<String> {
    let header = req.headers().get("X-API-Key").and_then(|v| v.to_str().ok());
    api_key_from(header, req.uri().query())
}

pub(crate) fn api_key_from(header: Option<&str>, query: Option<&str>) -> Option<String> {
    if let Some(key) = header {
        return Some(key.to_owned());
    }

    let key = form_urlencoded::parse(query?.as_bytes())
        .find(|(name, _)| name == "api_key")
        .map(|(_, value)| value.into_owned());
    debug!("API key supplied via query: {}", key.is_some());
    key
}

/// Host part of `addr`, so side listeners stay on the same interface.
fn host_of(addr: &str) -> &str {
    match addr.rsplit_once(':') {
        Some((host, _)) if !host.is_empty() => host,
        _ => "127.0.0.1",
    }
}

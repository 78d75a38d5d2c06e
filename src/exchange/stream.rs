use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::{ SinkExt, StreamExt };
use rust_decimal::Decimal;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::{ connect_async, MaybeTlsStream, WebSocketStream };
use tracing::{ debug, error, info, warn };
use tungstenite::{ protocol::Message, Utf8Bytes };

use crate::error::StreamError;
use crate::models::binance_models::{ StreamMessage, StreamSubscription };
use crate::models::quote::BookTick;

const BINANCE_STREAM_URL: &str = "wss://stream.binance.com:9443/stream";
const TESTNET_STREAM_URL: &str = "wss://stream.testnet.binance.vision/stream";

/// Streams per SUBSCRIBE request
const SUBSCRIBE_CHUNK: usize = 200;
/// Streams the exchange accepts on one connection
pub const MAX_STREAMS_PER_CONNECTION: usize = 1024;
/// Spacing between SUBSCRIBE requests, the exchange allows 5 messages per second
const SUBSCRIBE_SPACING: Duration = Duration::from_millis(250);

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a streaming session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamExit {
    Shutdown,
    Disconnected,
}

/// `<symbol>@bookTicker` stream name for each symbol
pub fn stream_names(symbols: &[Arc<str>]) -> Vec<String> {
    symbols
        .iter()
        .map(|symbol| format!("{}@bookTicker", symbol.to_lowercase()))
        .collect()
}

/// Split symbols into groups that each fit on one connection
pub fn connection_groups(symbols: &[Arc<str>]) -> Vec<Vec<Arc<str>>> {
    symbols
        .chunks(MAX_STREAMS_PER_CONNECTION)
        .map(<[Arc<str>]>::to_vec)
        .collect()
}

/// SUBSCRIBE requests covering every symbol, numbered from 1.
///
/// Fails with [`StreamError::TooManyStreams`] when the symbols do not fit on
/// one connection, use [`connection_groups`] to split them first.
pub fn subscription_requests(symbols: &[Arc<str>]) -> Result<Vec<StreamSubscription>, StreamError> {
    if symbols.len() > MAX_STREAMS_PER_CONNECTION {
        return Err(StreamError::TooManyStreams {
            requested: symbols.len(),
            limit: MAX_STREAMS_PER_CONNECTION,
        });
    }

    Ok(
        stream_names(symbols)
            .chunks(SUBSCRIBE_CHUNK)
            .enumerate()
            .map(|(i, chunk)| StreamSubscription {
                method: "SUBSCRIBE",
                params: chunk.to_vec(),
                id: (i as u64) + 1,
            })
            .collect()
    )
}

/// Decode one text frame of the combined stream.
///
/// Returns `Ok(None)` for subscription acknowledgements.
pub fn parse_message(text: &str) -> Result<Option<BookTick>, StreamError> {
    match serde_json::from_str::<StreamMessage>(text)? {
        StreamMessage::BookTicker(event) => {
            let data = event.data;
            let price = |raw: &str, side: &str| {
                Decimal::from_str(raw).map_err(|e| StreamError::MalformedTick {
                    symbol: data.symbol.clone(),
                    reason: format!("{} price {:?}: {}", side, raw, e),
                })
            };

            let best_ask = price(&data.ask_price, "ask")?;
            let best_bid = price(&data.bid_price, "bid")?;

            Ok(Some(BookTick::new(&data.symbol, best_ask, best_bid)))
        }
        StreamMessage::Response(response) => {
            if let Some(error) = response.error {
                return Err(StreamError::Subscription(format!("request {}: {}", response.id, error)));
            }
            debug!("Subscription {} acknowledged", response.id);
            Ok(None)
        }
    }
}

/// Resolves once shutdown is signalled or its sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let stop = *shutdown.borrow_and_update();
        if stop || shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Binance combined-stream client for best bid/ask updates
#[derive(Debug, Clone)]
pub struct BookTickerClient {
    endpoint: String,
}

impl BookTickerClient {
    pub fn new(testnet: bool) -> Self {
        Self::with_endpoint(if testnet { TESTNET_STREAM_URL } else { BINANCE_STREAM_URL })
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }

    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn connect(&self) -> Result<WsStream, StreamError> {
        info!("Connecting to Binance WebSocket: {}", self.endpoint);

        let (ws_stream, _) = connect_async(self.endpoint.as_str()).await?;

        info!("Connected to Binance WebSocket");

        Ok(ws_stream)
    }

    /// Send SUBSCRIBE requests for every symbol's bookTicker stream.
    ///
    /// Acknowledgements arrive interleaved with data and are checked by
    /// [`parse_message`].
    pub async fn subscribe(&self, ws_stream: &mut WsStream, symbols: &[Arc<str>]) -> Result<(), StreamError> {
        let requests = subscription_requests(symbols)?;

        for (i, request) in requests.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(SUBSCRIBE_SPACING).await;
            }

            let payload = serde_json::to_string(request)?;

            ws_stream.send(Message::Text(Utf8Bytes::from(payload))).await?;
            debug!("Sent subscription {} for {} streams", request.id, request.params.len());
        }

        info!("Subscribed to {} bookTicker streams", symbols.len());

        Ok(())
    }

    /// Read frames until shutdown, a close frame, or a transport error
    pub async fn process_messages<F>(
        &self,
        ws_stream: &mut WsStream,
        shutdown: &mut watch::Receiver<bool>,
        on_tick: &mut F
    ) -> Result<StreamExit, StreamError>
        where F: FnMut(BookTick)
    {
        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                message = ws_stream.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            match parse_message(text.as_str()) {
                                Ok(Some(tick)) => on_tick(tick),
                                Ok(None) => {}
                                Err(e @ StreamError::Subscription(_)) => return Err(e),
                                Err(e) => warn!("Dropping stream message: {}", e),
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            ws_stream.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!("Server closed the stream: {:?}", frame);
                            return Ok(StreamExit::Disconnected);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(StreamExit::Disconnected),
                    }
                }
            }
        }

        if let Err(e) = ws_stream.close(None).await {
            debug!("Error closing stream: {}", e);
        }

        Ok(StreamExit::Shutdown)
    }

    /// One connection's lifetime. Shutdown is honoured while connecting and
    /// subscribing too, a stalled handshake never holds up the exit.
    async fn session<F>(
        &self,
        symbols: &[Arc<str>],
        shutdown: &mut watch::Receiver<bool>,
        on_tick: &mut F
    ) -> Result<StreamExit, StreamError>
        where F: FnMut(BookTick)
    {
        let establish = async {
            let mut ws_stream = self.connect().await?;
            self.subscribe(&mut ws_stream, symbols).await?;
            Ok::<_, StreamError>(ws_stream)
        };

        let mut ws_stream = tokio::select! {
            established = establish => established?,
            _ = shutdown_requested(shutdown) => {
                info!("Shutdown requested before the stream was established");
                return Ok(StreamExit::Shutdown);
            }
        };

        self.process_messages(&mut ws_stream, shutdown, on_tick).await
    }

    /// Stream ticks into `on_tick`, reconnecting after `reconnect_delay`
    /// whenever the connection drops, until shutdown is signalled.
    pub async fn run_with_reconnect<F>(
        &self,
        symbols: &[Arc<str>],
        reconnect_delay: Duration,
        mut shutdown: watch::Receiver<bool>,
        mut on_tick: F
    )
        where F: FnMut(BookTick)
    {
        if symbols.is_empty() {
            warn!("No symbols to stream");
            return;
        }

        loop {
            match self.session(symbols, &mut shutdown, &mut on_tick).await {
                Ok(StreamExit::Shutdown) => {
                    info!("Market data stream stopped");
                    return;
                }
                Ok(StreamExit::Disconnected) => {
                    warn!("Stream disconnected, reconnecting in {:?}", reconnect_delay);
                }
                Err(e @ StreamError::TooManyStreams { .. }) => {
                    error!("Stream error: {}, giving up", e);
                    return;
                }
                Err(e) => {
                    error!("Stream error: {}, reconnecting in {:?}", e, reconnect_delay);
                }
            }

            if *shutdown.borrow() {
                return;
            }

            tokio::select! {
                _ = tokio::time::sleep(reconnect_delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }
}

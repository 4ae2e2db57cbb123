use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::config::ServerContext;
use crate::error::TransportError;
use crate::handlers;
use crate::transport::{MessageReader, MessageWriter};

/// Language server speaking `Content-Length` framed JSON-RPC 2.0.
///
/// Requests are handled one at a time, in arrival order.
pub struct LspServer {
    ctx: ServerContext,
}

impl LspServer {
    pub fn new(ctx: ServerContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &ServerContext {
        &self.ctx
    }

    /// Serve over the process's stdin/stdout.
    pub async fn run(&self) -> Result<(), TransportError> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve until end of input or an `exit` notification.
    ///
    /// Framing errors are logged and the stream is resynchronised; only I/O
    /// failures end the loop with an error.
    pub async fn serve<R, W>(&self, input: R, output: W) -> Result<(), TransportError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = MessageReader::new(input);
        let mut writer = MessageWriter::new(output);
        info!(cache_dir = %self.ctx.config.cache_dir.display(), "server started");

        loop {
            let body = match reader.read_message().await {
                Ok(Some(body)) => body,
                Ok(None) => {
                    info!("input closed, shutting down");
                    break;
                }
                Err(TransportError::Framing(reason)) => {
                    warn!(%reason, "skipping malformed frame");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let outcome = handlers::handle_message(&body, &self.ctx).await;

            for notification in &outcome.notifications {
                debug!(method = %notification.method, "sending notification");
                writer.write_message(notification).await?;
            }
            if let Some(resp) = &outcome.response {
                writer.write_message(resp).await?;
            }

            if outcome.exit {
                info!("exit requested");
                break;
            }
        }

        Ok(())
    }
}

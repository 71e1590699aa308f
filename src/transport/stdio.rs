//! Stdio binding: one JSON object per input line, one per output line
//!
//! Requests are handled strictly in order and the loop ends at EOF. Logging must
//! go to stderr; stdout carries protocol lines only.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::mcp::rpc::{self, encode, Response};
use crate::mcp::server::{Dispatcher, TransportKind};
use crate::mcp::session::{ConnectionLifecycle, ConnectionState};

const TRANSPORT: TransportKind = TransportKind::Stdio;

pub async fn serve_stdio(dispatcher: Dispatcher) -> io::Result<()> {
    serve_lines(
        &dispatcher,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

/// Serves newline-delimited requests from `reader` until EOF. Blank lines are skipped.
pub async fn serve_lines<R, W>(dispatcher: &Dispatcher, reader: R, mut writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lifecycle = ConnectionLifecycle::new(TRANSPORT.as_str(), "stdio");
    lifecycle.advance(ConnectionState::Open);
    info!("stdio transport ready");

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match rpc::decode_str(line) {
            Ok(request) => dispatcher.handle(TRANSPORT, request).await,
            Err(err) => {
                warn!(error = %err, "undecodable stdio line");
                Response::parse_failure(&err)
            }
        };

        let mut out = encode(&response);
        out.push('\n');
        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;
    }

    lifecycle.advance(ConnectionState::Closing);
    info!("stdin closed, stdio transport stopping");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;

    use super::*;
    use crate::domain::tools::campaign_registry;
    use crate::mcp::rpc::{ERROR_ID, INTERNAL_ERROR};

    async fn run(input: &str) -> Vec<Value> {
        let dispatcher = Dispatcher::new(Arc::new(campaign_registry()));
        let mut output = Vec::new();

        serve_lines(&dispatcher, input.as_bytes(), &mut output)
            .await
            .expect("stdio loop");

        String::from_utf8(output)
            .expect("utf8 output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect()
    }

    #[tokio::test]
    async fn answers_each_line_in_order() {
        let responses = run(concat!(
            "{\"id\":\"1\",\"method\":\"ping\"}\n",
            "\n",
            "{\"id\":\"2\",\"method\":\"tools/call\",\"params\":{\"name\":\"nonexistent\",\"arguments\":{}}}\n",
        ))
        .await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], "1");
        assert!(responses[0]["result"]["pong"].is_i64());
        assert!(responses[0].get("error").is_none());
        assert_eq!(responses[1]["id"], "2");
        assert!(responses[1]["result"].is_null());
        assert_eq!(responses[1]["error"]["code"], INTERNAL_ERROR);
    }

    #[tokio::test]
    async fn malformed_line_keeps_the_loop_running() {
        let responses = run("not json\n{\"id\":\"3\",\"method\":\"tools/list\"}").await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], ERROR_ID);
        assert_eq!(responses[0]["error"]["code"], INTERNAL_ERROR);
        assert_eq!(responses[1]["result"]["tools"].as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn empty_input_produces_no_output() {
        assert!(run("").await.is_empty());
    }
}

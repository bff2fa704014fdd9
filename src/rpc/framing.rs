//! Content-Length framing of JSON-RPC messages on a byte stream.
//!
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <message-body>
//! ```
//!
//! Header names are matched case-insensitively, lines may end in CRLF or
//! LF, and headers other than Content-Length are skipped. Both the header
//! block and the body are size-bounded, so a misbehaving peer cannot make
//! the reader buffer without limit.

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted body (100MB). Serialized plans for long multi-robot
/// trajectories are large, but anything beyond this is a broken peer.
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Longest accepted header line, terminator included.
pub const MAX_HEADER_LINE: usize = 1024;

/// Most header lines accepted before the blank separator line.
const MAX_HEADER_LINES: usize = 16;

/// Read one header line of at most [`MAX_HEADER_LINE`] bytes. `Ok(None)`
/// means the peer closed the stream before sending anything.
async fn read_header_line<R>(reader: &mut R) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = (&mut *reader)
        .take(MAX_HEADER_LINE as u64)
        .read_line(&mut line)
        .await
        .context("Failed to read header line")?;

    if n == 0 {
        return Ok(None);
    }
    if !line.ends_with('\n') {
        if n >= MAX_HEADER_LINE {
            bail!("Header line longer than {} bytes", MAX_HEADER_LINE);
        }
        bail!("Stream ended inside a header line");
    }
    Ok(Some(line))
}

/// Consume the header block and return the announced body length.
async fn read_content_length<R>(reader: &mut R) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length = None;

    for _ in 0..=MAX_HEADER_LINES {
        let line = read_header_line(reader)
            .await?
            .ok_or_else(|| anyhow!("Connection closed by peer"))?;
        let line = line.trim();

        if line.is_empty() {
            return content_length.ok_or_else(|| anyhow!("Missing Content-Length header"));
        }

        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("Content-Length") {
            let value = value.trim();
            let length: usize = value
                .parse()
                .with_context(|| format!("Invalid Content-Length value: {}", value))?;
            content_length = Some(length);
        }
    }

    bail!("More than {} header lines", MAX_HEADER_LINES)
}

/// Read one framed message and return its body.
///
/// Fails on EOF, a missing or unparsable Content-Length, an oversized
/// header or body, a truncated body, or a body that is not UTF-8.
pub async fn read_message<R>(reader: &mut R) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let size = read_content_length(reader).await?;
    if size > MAX_MESSAGE_SIZE {
        bail!("Message size {} exceeds maximum {} bytes", size, MAX_MESSAGE_SIZE);
    }

    let mut body = vec![0u8; size];
    reader
        .read_exact(&mut body)
        .await
        .context("Failed to read message body")?;

    String::from_utf8(body).context("Message body is not valid UTF-8")
}

/// Write one framed message and flush it.
pub async fn write_message<W>(writer: &mut W, body: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut frame = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
    frame.extend_from_slice(body.as_bytes());

    writer.write_all(&frame).await.context("Failed to write message")?;
    writer.flush().await.context("Failed to flush message")?;
    Ok(())
}

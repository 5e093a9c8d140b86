use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Reads acquisition ids, one per line.
///
/// Surrounding whitespace is trimmed and blank lines are skipped.
pub async fn read_ids<R>(reader: R) -> std::io::Result<Vec<String>>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut ids = Vec::new();
    while let Some(line) = lines.next_line().await? {
        let id = line.trim();
        if !id.is_empty() {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

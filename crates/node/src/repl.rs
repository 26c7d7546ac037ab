use std::io;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::service::ChatService;

const PROMPT: &[u8] = b">> ";
const HISTORY_COMMAND: &str = "/h";

/// Interactive console.
///
/// `/h` prints the numbered chain; any other non-blank line is mined into
/// the chain as an independent task so a slow search never blocks the
/// prompt. Returns on end of input.
pub async fn run_repl(service: ChatService) -> io::Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut line = String::new();
    loop {
        stdout.write_all(PROMPT).await?;
        stdout.flush().await?;

        line.clear();
        if stdin.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == HISTORY_COMMAND {
            stdout.write_all(render_history(&service).as_bytes()).await?;
            continue;
        }
        if input.len() > chain::MAX_TEXT_BYTES {
            let notice = format!(
                "message too long: {} bytes, the limit is {}\n",
                input.len(),
                chain::MAX_TEXT_BYTES
            );
            stdout.write_all(notice.as_bytes()).await?;
            continue;
        }
        let service = service.clone();
        let text = input.to_owned();
        tokio::spawn(async move {
            service.create_and_broadcast_chat(text).await;
        });
    }
}

fn render_history(service: &ChatService) -> String {
    let history = service.ledger().snapshot();
    if history.is_empty() {
        return "the chain is empty\n".to_owned();
    }
    let mut rendered = String::new();
    for (index, chat) in history.iter().enumerate() {
        rendered.push_str(&format!("{index}: {}\n", chat.text()));
    }
    rendered
}

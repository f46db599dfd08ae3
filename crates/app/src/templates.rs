//! HTML for the chat page and the transcript of a session.
//!
//! Message bubbles are plain templates with a `{{MSG}}` placeholder; the
//! message is HTML-escaped before it is substituted.

use pdf_chat_core::{ChatTurn, Speaker};

pub const CSS: &str = r#"<style>
.chat-message { padding: 1.5rem; border-radius: 0.5rem; margin-bottom: 1rem; display: flex; }
.chat-message.user { background-color: #2b313e; }
.chat-message.bot { background-color: #475063; }
.chat-message .avatar { width: 20%; }
.chat-message .avatar span {
  display: inline-flex; align-items: center; justify-content: center;
  width: 78px; height: 78px; border-radius: 50%; background: #1f2430;
  color: #fff; font-weight: bold;
}
.chat-message .message { width: 80%; padding: 0 1.5rem; color: #fff; white-space: pre-wrap; }
</style>"#;

pub const USER_TEMPLATE: &str = r#"<div class="chat-message user">
  <div class="avatar"><span>You</span></div>
  <div class="message">{{MSG}}</div>
</div>"#;

pub const BOT_TEMPLATE: &str = r#"<div class="chat-message bot">
  <div class="avatar"><span>Bot</span></div>
  <div class="message">{{MSG}}</div>
</div>"#;

pub const PLACEHOLDER: &str = "{{MSG}}";

pub const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Chat with multiple PDFs</title>
<style>
body { font-family: sans-serif; margin: 0; display: flex; min-height: 100vh; background: #0e1117; color: #fafafa; }
aside { width: 300px; padding: 1.5rem; background: #262730; }
main { flex: 1; padding: 2rem 3rem; }
input[type=text] { width: 100%; padding: 0.6rem; box-sizing: border-box; }
button { margin-top: 0.8rem; padding: 0.5rem 1.2rem; }
#status { margin-top: 0.8rem; font-size: 0.9rem; }
#error { color: #ff6b6b; margin: 0.8rem 0; }
</style>
__CSS__
</head>
<body>
<aside>
  <h3>Your documents</h3>
  <input id="files" type="file" accept="application/pdf,.pdf" multiple>
  <button id="process">Process</button>
  <div id="status"></div>
</aside>
<main>
  <h1>Chat with multiple PDFs</h1>
  <form id="ask">
    <input id="question" type="text" placeholder="Ask a question about your documents:" autocomplete="off">
  </form>
  <div id="error"></div>
  <div id="transcript"></div>
</main>
<script>
let sessionId = null;

async function call(method, path, body) {
  const response = await fetch(path, {
    method,
    headers: body ? { "content-type": "application/json" } : {},
    body: body ? JSON.stringify(body) : undefined,
  });
  const text = await response.text();
  const payload = text ? JSON.parse(text) : {};
  if (!response.ok) {
    const error = new Error(payload.error || response.statusText);
    error.kind = payload.kind;
    throw error;
  }
  return payload;
}

// Runs `action` against the current session, starting a new one once if the
// server no longer knows it.
async function withSession(action) {
  try {
    return await action(await ensureSession());
  } catch (error) {
    if (error.kind !== "session_not_found") {
      throw error;
    }
    sessionId = null;
    return await action(await ensureSession());
  }
}

async function ensureSession() {
  if (!sessionId) {
    sessionId = (await call("POST", "/api/session")).session_id;
  }
  return sessionId;
}

function readBase64(file) {
  return new Promise((resolve, reject) => {
    const reader = new FileReader();
    reader.onload = () => {
      const url = reader.result;
      resolve(url.substring(url.indexOf(",") + 1));
    };
    reader.onerror = () => reject(reader.error);
    reader.readAsDataURL(file);
  });
}

function showError(message) {
  document.getElementById("error").textContent = message || "";
}

document.getElementById("process").addEventListener("click", async () => {
  const status = document.getElementById("status");
  showError("");
  status.textContent = "Processing";
  try {
    const files = Array.from(document.getElementById("files").files);
    const documents = await Promise.all(files.map(async (file) => ({
      name: file.name,
      content_base64: await readBase64(file),
    })));
    const result = await withSession((id) =>
      call("POST", `/api/session/${id}/process`, { documents }));
    status.textContent = `Processed ${result.summary.documents.length} document(s), ${result.summary.chunk_count} chunks.`;
    document.getElementById("transcript").innerHTML = "";
  } catch (error) {
    status.textContent = "";
    showError(error.message);
  }
});

document.getElementById("ask").addEventListener("submit", async (event) => {
  event.preventDefault();
  const input = document.getElementById("question");
  const question = input.value;
  showError("");
  try {
    const result = await withSession((id) =>
      call("POST", `/api/session/${id}/ask`, { question }));
    document.getElementById("transcript").innerHTML = result.transcript_html;
    input.value = "";
  } catch (error) {
    showError(error.message);
  }
});

window.addEventListener("pagehide", (event) => {
  // A page kept in the back/forward cache comes back with the same session.
  if (sessionId && !event.persisted) {
    fetch(`/api/session/${sessionId}`, { method: "DELETE", keepalive: true });
  }
});
</script>
</body>
</html>
"#;

pub fn index_page() -> String {
    INDEX_HTML.replace("__CSS__", CSS)
}

pub fn render_turn(turn: &ChatTurn) -> String {
    let template = match turn.speaker {
        Speaker::User => USER_TEMPLATE,
        Speaker::Assistant => BOT_TEMPLATE,
    };
    template.replace(PLACEHOLDER, &html_escape::encode_safe(&turn.message))
}

/// Renders the dialogue in order, oldest turn first.
pub fn render_transcript(turns: &[ChatTurn]) -> String {
    turns.iter().map(render_turn).collect::<Vec<_>>().join("\n")
}

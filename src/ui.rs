//! The single-page chat UI served at `/`.
//!
//! Plain HTML and script, no build step. Messages are submitted on Enter,
//! the input is cleared afterwards, and every turn carries 👍/👎 buttons.
//! All user and model text is inserted with `textContent`.

pub const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Comet Chatbot Assistant</title>
<style>
  body { font-family: system-ui, sans-serif; margin: 0; display: flex; min-height: 100vh; }
  aside { width: 300px; background: #f0f2f6; padding: 1.5rem; font-size: 0.9rem; }
  main { flex: 1; padding: 1.5rem 2rem; max-width: 900px; }
  .bubble { display: inline-block; max-width: 80%; padding: 10px; border-radius: 10px; margin: 10px 0; }
  .you { background: #007bff; border: 1px solid #007bff; color: #fff; }
  .bot { background: #e9e9e9; border: 1px solid #ccc; color: #000; white-space: pre-wrap; }
  .row-you { text-align: right; }
  .votes button { padding: 10px; font-size: 24px; margin-right: 6px; cursor: pointer; }
  .votes .sent { opacity: 0.4; }
  #input { width: 100%; padding: 10px; font-size: 1rem; box-sizing: border-box; }
  #clear { margin-top: 1rem; padding: 10px; }
  #status { color: #888; min-height: 1.2em; }
  #error { color: #b00020; min-height: 1.2em; }
</style>
</head>
<body>
<aside>
  <h2>About This App</h2>
  <h3>Comet Chatbot Assistant</h3>
  <p><strong>How to Use the App:</strong></p>
  <ol>
    <li>Enter your question about the Comet platform, SDKs, or general Python help in the input box.</li>
    <li>Press <code>Enter</code> to submit your question.</li>
    <li>View the bot's response in the conversation history.</li>
    <li>Provide feedback using the thumbs up (👍) or thumbs down (👎) buttons.</li>
  </ol>
  <p><strong>What It Does:</strong></p>
  <p>This chatbot is designed to assist you with:</p>
  <ul>
    <li>Integrating Comet SDKs and APIs into your existing codebases.</li>
    <li>Writing Python panel code.</li>
    <li>Answering questions related to the Comet platform.</li>
  </ul>
  <p><strong>About Comet:</strong></p>
  <p>Comet is a platform that allows data scientists and machine learning engineers to track, compare, explain, and optimize their experiments and models. Comet provides tools to manage and visualize your machine learning projects, helping you build better models faster.</p>
</aside>
<main>
  <h1>Comet Chatbot Assistant</h1>
  <p>Ask a question about the Comet platform, SDKs, or general Python help:</p>
  <div id="conversation"></div>
  <div id="status"></div>
  <div id="error"></div>
  <label for="input">Your message:</label>
  <input id="input" autocomplete="off">
  <button id="clear">Clear Conversation</button>
</main>
<script>
const conversation = document.getElementById('conversation');
const input = document.getElementById('input');
const statusLine = document.getElementById('status');
const errorLine = document.getElementById('error');

async function call(method, path, body) {
  const resp = await fetch(path, {
    method,
    credentials: 'same-origin',
    headers: body ? { 'Content-Type': 'application/json' } : {},
    body: body ? JSON.stringify(body) : undefined,
  });
  const data = await resp.json();
  if (!resp.ok) {
    throw new Error(data.error ? data.error.message : resp.statusText);
  }
  return data;
}

function bubble(kind, label, text) {
  const row = document.createElement('div');
  row.className = 'row-' + kind;
  const div = document.createElement('div');
  div.className = 'bubble ' + kind;
  const strong = document.createElement('strong');
  strong.textContent = label + ' ';
  div.appendChild(strong);
  div.appendChild(document.createTextNode(text));
  row.appendChild(div);
  return row;
}

function voteButton(index, vote, glyph) {
  const b = document.createElement('button');
  b.textContent = glyph;
  b.onclick = async () => {
    errorLine.textContent = '';
    try {
      await call('POST', '/api/feedback', { turn: index, vote });
      b.classList.add('sent');
    } catch (e) {
      errorLine.textContent = e.message;
    }
  };
  return b;
}

function render(turns) {
  conversation.replaceChildren();
  turns.forEach((t, i) => {
    conversation.appendChild(bubble('you', 'You:', t.question));
    conversation.appendChild(bubble('bot', 'Bot:', t.answer));
    const votes = document.createElement('div');
    votes.className = 'votes';
    votes.appendChild(voteButton(i, 'up', '👍'));
    votes.appendChild(voteButton(i, 'down', '👎'));
    conversation.appendChild(votes);
  });
}

input.addEventListener('keydown', async (ev) => {
  if (ev.key !== 'Enter' || !input.value) return;
  const message = input.value;
  input.disabled = true;
  statusLine.textContent = 'Thinking...';
  errorLine.textContent = '';
  try {
    const data = await call('POST', '/api/messages', { message });
    render(data.turns);
    input.value = '';
  } catch (e) {
    errorLine.textContent = e.message;
  } finally {
    statusLine.textContent = '';
    input.disabled = false;
    input.focus();
  }
});

document.getElementById('clear').onclick = async () => {
  errorLine.textContent = '';
  try {
    const data = await call('POST', '/api/clear');
    render(data.turns);
  } catch (e) {
    errorLine.textContent = e.message;
  }
};

call('GET', '/api/conversation')
  .then((data) => render(data.turns))
  .catch((e) => { errorLine.textContent = e.message; });
</script>
</body>
</html>
"#;

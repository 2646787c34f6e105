//! The probe injected into every service view and the messages it sends back.
//!
//! The probe is tiny on purpose: it answers a "request" by posting the page
//! title and the content of the adapter's indicator element. It never throws
//! across the channel; a missing element is reported as `indicator: null`.

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use crate::adapter::{PageSnapshot, ServiceAdapter};
use crate::badge::RawCount;

/// Evaluated in the view to trigger one poll.
pub const REQUEST_SCRIPT: &str = "window.__ttthRequest && window.__ttthRequest();";

/// Decoded message from a service view.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeMessage {
    Snapshot(PageSnapshot),
    DomReady,
    /// A bare value from a user-supplied probe via `ttth.sendToHost`.
    Raw(RawCount),
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum Envelope {
    Snapshot {
        #[serde(default)]
        title: String,
        #[serde(default)]
        indicator: Option<String>,
    },
    DomReady,
    Raw {
        #[serde(default)]
        value: Value,
    },
}

impl ProbeMessage {
    /// Decode an ipc payload. Anything unrecognized is treated as a bare value.
    pub fn decode(payload: &str) -> ProbeMessage {
        match serde_json::from_str::<Envelope>(payload) {
            Ok(Envelope::Snapshot { title, indicator }) => {
                ProbeMessage::Snapshot(PageSnapshot { title, indicator })
            }
            Ok(Envelope::DomReady) => ProbeMessage::DomReady,
            Ok(Envelope::Raw { value }) => ProbeMessage::Raw(RawCount::from_json(&value)),
            Err(_) => match serde_json::from_str::<Value>(payload) {
                Ok(value) => ProbeMessage::Raw(RawCount::from_json(&value)),
                Err(_) => ProbeMessage::Raw(RawCount::Text(payload.to_string())),
            },
        }
    }
}

fn js_string(value: &str) -> String {
    // serde_json string encoding is valid JavaScript string literal syntax
    Value::String(value.to_string()).to_string()
}

/// Build the initialization script for a service view.
///
/// `custom` is an optional user probe appended after the bridge; it can
/// report with `window.ttth.sendToHost(value)`.
pub fn build_script(adapter: &dyn ServiceAdapter, custom: Option<&str>) -> String {
    let (selector, attribute) = match adapter.indicator() {
        Some(ind) => (
            js_string(ind.selector),
            ind.attribute.map(js_string).unwrap_or_else(|| "null".into()),
        ),
        None => ("null".to_string(), "null".to_string()),
    };

    let mut script = format!(
        r#"(function () {{
  if (window.__ttthRequest) {{ return; }}
  var post = function (msg) {{
    try {{ window.ipc.postMessage(JSON.stringify(msg)); }} catch (e) {{}}
  }};
  var selector = {selector};
  var attribute = {attribute};
  window.ttth = {{
    sendToHost: function (value) {{ post({{ kind: "raw", value: value === undefined ? null : value }}); }}
  }};
  window.__ttthRequest = function () {{
    var indicator = null;
    try {{
      if (selector) {{
        var node = document.querySelector(selector);
        if (node) {{
          indicator = attribute ? node.getAttribute(attribute) : node.textContent;
        }}
      }}
    }} catch (e) {{
      indicator = null;
    }}
    post({{ kind: "snapshot", title: document.title || "", indicator: indicator }});
  }};
  document.addEventListener("DOMContentLoaded", function () {{ post({{ kind: "dom-ready" }}); }});
}})();
"#
    );

    if let Some(custom) = custom {
        script.push_str(custom);
        script.push('\n');
    }

    script
}

/// Load a user probe referenced by a service's inject code.
///
/// Bundled probes are referenced by type name and need no file; anything
/// ending in `.js` is looked up under `<config>/probes/`.
pub fn load_custom_probe(config_dir: &Path, inject_code: &str) -> Option<String> {
    if !inject_code.ends_with(".js") {
        return None;
    }

    let file_name = Path::new(inject_code).file_name()?;
    let path = config_dir.join("probes").join(file_name);
    match std::fs::read_to_string(&path) {
        Ok(source) => {
            tracing::debug!(path = %path.display(), "Loaded custom probe");
            Some(source)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "Failed to read custom probe: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::adapter_for;

    #[test]
    fn test_decode_snapshot() {
        let msg = ProbeMessage::decode(r#"{"kind":"snapshot","title":"(2) Chat","indicator":null}"#);
        assert_eq!(
            msg,
            ProbeMessage::Snapshot(PageSnapshot {
                title: "(2) Chat".into(),
                indicator: None,
            })
        );
    }

    #[test]
    fn test_decode_lifecycle_and_raw() {
        assert_eq!(ProbeMessage::decode(r#"{"kind":"dom-ready"}"#), ProbeMessage::DomReady);
        assert_eq!(
            ProbeMessage::decode(r#"{"kind":"raw","value":"4"}"#),
            ProbeMessage::Raw(RawCount::Text("4".into()))
        );
        assert_eq!(ProbeMessage::decode("7"), ProbeMessage::Raw(RawCount::Number(7.0)));
        assert_eq!(ProbeMessage::decode("null"), ProbeMessage::Raw(RawCount::Null));
        assert_eq!(
            ProbeMessage::decode("12 new"),
            ProbeMessage::Raw(RawCount::Text("12 new".into()))
        );
    }

    #[test]
    fn test_script_embeds_indicator() {
        let script = build_script(adapter_for("googleMail"), None);
        assert!(script.contains(r#"".aim .aio span a""#));
        assert!(script.contains(r#""aria-label""#));

        let script = build_script(adapter_for("whatsapp"), Some("ttth.sendToHost(1);"));
        assert!(script.contains("var selector = null;"));
        assert!(script.ends_with("ttth.sendToHost(1);\n"));
    }

    #[test]
    fn test_custom_probe_only_for_js_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("probes")).unwrap();
        std::fs::write(dir.path().join("probes/mine.js"), "ttth.sendToHost(3);").unwrap();

        assert_eq!(load_custom_probe(dir.path(), "googleMail"), None);
        assert_eq!(
            load_custom_probe(dir.path(), "js/ttth/services/mine.js").as_deref(),
            Some("ttth.sendToHost(3);")
        );
        assert_eq!(load_custom_probe(dir.path(), "missing.js"), None);
    }
}

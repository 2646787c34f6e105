//! The two built-in pages of the window: the tab strip and the Settings pane.
//!
//! Both pages are static documents that expose `render(state)`; the host
//! pushes a JSON snapshot of the shell into them after every change and
//! reads user actions back from their ipc messages as [`UiAction`].

use serde::{Deserialize, Serialize};

use crate::controller::ContextFactory;
use crate::error::ShellResult;
use crate::host::HostSink;
use crate::notify::Notice;
use crate::registry::ServiceId;
use crate::shell::{ServiceForm, Shell, TabView};
use crate::tabs::{TabId, ViewOption};

/// Height of the tab strip in logical pixels.
pub const STRIP_HEIGHT: f64 = 40.0;

/// Something the user did in the strip or the Settings pane.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum UiAction {
    SwitchTab { tab: String },
    Toggle { id: ServiceId },
    Delete { id: ServiceId },
    Configure { id: ServiceId },
    #[serde(rename_all = "camelCase")]
    AddService { service_type: String },
    SaveForm { name: String, icon: String, url: String },
    CancelForm,
    SetDefaultView { id: ServiceId },
    ResetDefaultView,
    Autostart { enabled: bool },
    AutostartMinimized { enabled: bool },
    HideMenubar { enabled: bool },
    OpenConfigFolder,
    /// Close the notice at this position in the strip.
    DismissNotice { index: usize },
}

impl UiAction {
    pub fn decode(payload: &str) -> Option<UiAction> {
        match serde_json::from_str(payload) {
            Ok(action) => Some(action),
            Err(e) => {
                tracing::warn!("Ignoring malformed ui message: {}", e);
                None
            }
        }
    }

    /// Tab addressed by a strip click.
    pub fn tab_id(raw: &str) -> ShellResult<TabId> {
        if raw == TabId::Settings.to_string() {
            Ok(TabId::Settings)
        } else {
            ServiceId::parse(raw).map(TabId::Service)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeView {
    pub level: String,
    pub message: String,
}

impl From<&Notice> for NoticeView {
    fn from(notice: &Notice) -> Self {
        NoticeView {
            level: notice.level.to_string(),
            message: notice.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StripView {
    pub tabs: Vec<TabView>,
    pub notices: Vec<NoticeView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRow {
    pub id: ServiceId,
    pub name: String,
    pub service_type: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRow {
    pub id: String,
    pub name_long: String,
    pub multiple: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormView {
    pub id: ServiceId,
    pub service_type: String,
    pub name: String,
    pub icon: String,
    pub url: String,
    pub is_new: bool,
}

impl From<&ServiceForm> for FormView {
    fn from(form: &ServiceForm) -> Self {
        FormView {
            id: form.id.clone(),
            service_type: form.service_type.clone(),
            name: form.name.clone(),
            icon: form.icon.clone(),
            url: form.url.clone(),
            is_new: form.is_new,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub services: Vec<ServiceRow>,
    pub catalog: Vec<CatalogRow>,
    pub default_view: Option<ServiceId>,
    pub default_view_options: Vec<ViewOption>,
    pub autostart: bool,
    pub autostart_minimized: bool,
    pub hide_menubar: bool,
    pub form: Option<FormView>,
}

impl SettingsView {
    pub fn from_shell<F: ContextFactory, S: HostSink>(shell: &Shell<F, S>) -> ShellResult<Self> {
        let services = shell
            .registry()
            .list()?
            .into_values()
            .map(|service| ServiceRow {
                id: service.id,
                name: service.name,
                service_type: service.service_type,
                enabled: service.service_enable_status,
            })
            .collect();

        let settings = shell.settings();
        Ok(SettingsView {
            services,
            catalog: shell
                .catalog()
                .iter()
                .map(|d| CatalogRow {
                    id: d.id.clone(),
                    name_long: d.name_long.clone(),
                    multiple: d.multiple,
                })
                .collect(),
            default_view: settings.default_view.clone(),
            default_view_options: shell.tabs().ui().default_view_options().to_vec(),
            autostart: settings.autostart,
            autostart_minimized: settings.autostart_minimized,
            hide_menubar: settings.hide_menubar,
            form: shell.form().map(FormView::from),
        })
    }
}

/// Script that re-renders a page with `state`.
pub fn render_script<T: Serialize>(state: &T) -> String {
    match serde_json::to_string(state) {
        Ok(json) => format!("window.render && window.render({});", json),
        Err(e) => {
            tracing::error!("Failed to serialize page state: {}", e);
            String::new()
        }
    }
}

const BRIDGE: &str = r#"
function send(msg) { window.ipc.postMessage(JSON.stringify(msg)); }
function el(tag, text, cls) {
  var node = document.createElement(tag);
  if (text !== undefined && text !== null) { node.textContent = text; }
  if (cls) { node.className = cls; }
  return node;
}
"#;

pub fn strip_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><style>
body {{ margin: 0; font: 13px sans-serif; display: flex; height: 40px; align-items: stretch; background: #2b2b2b; color: #ddd; }}
#tabs {{ display: flex; flex: 1; }}
.tab {{ padding: 0 14px; display: flex; align-items: center; cursor: pointer; }}
.tab.active {{ background: #444; color: #fff; }}
.badge {{ margin-left: 6px; background: #e53935; color: #fff; border-radius: 8px; padding: 0 6px; font-size: 11px; }}
.key {{ margin-left: 6px; opacity: .5; font-size: 11px; }}
#notices {{ display: flex; align-items: center; padding-right: 10px; }}
.notice {{ margin-left: 8px; padding: 2px 8px; border-radius: 3px; cursor: pointer; }}
.notice.success {{ background: #2e7d32; }} .notice.info {{ background: #1565c0; }}
.notice.warning {{ background: #ef6c00; }} .notice.error {{ background: #c62828; }}
</style></head><body><div id="tabs"></div><div id="notices"></div><script>
{BRIDGE}
window.render = function (state) {{
  var tabs = document.getElementById("tabs");
  tabs.textContent = "";
  state.tabs.forEach(function (tab) {{
    var node = el("div", tab.name, "tab" + (tab.active ? " active" : ""));
    node.title = tab.name;
    if (tab.accessKey) {{ node.appendChild(el("span", tab.accessKey, "key")); }}
    if (tab.badge) {{ node.appendChild(el("span", tab.badge, "badge")); }}
    node.onclick = function () {{ send({{ action: "switch-tab", tab: tab.id }}); }};
    tabs.appendChild(node);
  }});
  var notices = document.getElementById("notices");
  notices.textContent = "";
  state.notices.forEach(function (n, index) {{
    var node = el("span", n.message, "notice " + n.level);
    node.title = "Click to dismiss";
    node.onclick = function () {{ send({{ action: "dismiss-notice", index: index }}); }};
    notices.appendChild(node);
  }});
}};
</script></body></html>"#
    )
}

pub fn settings_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><style>
body {{ font: 14px sans-serif; margin: 20px; }}
h2 {{ font-size: 16px; margin-top: 24px; }}
table {{ border-collapse: collapse; }} td {{ padding: 4px 10px 4px 0; }}
.disabled {{ opacity: .5; }}
label {{ display: block; margin: 6px 0; }}
</style></head><body><div id="root"></div><script>
{BRIDGE}
function button(text, msg) {{
  var b = el("button", text);
  b.onclick = function () {{ send(msg); }};
  return b;
}}
function checkbox(text, checked, action) {{
  var label = el("label");
  var box = el("input");
  box.type = "checkbox";
  box.checked = checked;
  box.onchange = function () {{ send({{ action: action, enabled: box.checked }}); }};
  label.appendChild(box);
  label.appendChild(document.createTextNode(" " + text));
  return label;
}}
function field(form, name) {{
  var label = el("label", name + " ");
  var input = el("input");
  input.id = "form-" + name;
  input.value = form[name];
  label.appendChild(input);
  return label;
}}
window.render = function (state) {{
  var root = document.getElementById("root");
  root.textContent = "";

  if (state.form) {{
    var f = state.form;
    root.appendChild(el("h2", (f.isNew ? "Add " : "Configure ") + f.serviceType));
    root.appendChild(field(f, "name"));
    root.appendChild(field(f, "icon"));
    root.appendChild(field(f, "url"));
    var save = el("button", "Save");
    save.onclick = function () {{
      send({{ action: "save-form",
        name: document.getElementById("form-name").value,
        icon: document.getElementById("form-icon").value,
        url: document.getElementById("form-url").value }});
    }};
    root.appendChild(save);
    root.appendChild(button("Cancel", {{ action: "cancel-form" }}));
    return;
  }}

  root.appendChild(el("h2", "Services"));
  var table = el("table");
  state.services.forEach(function (s) {{
    var row = el("tr", null, s.enabled ? "" : "disabled");
    row.appendChild(el("td", s.name));
    row.appendChild(el("td", s.serviceType));
    var actions = el("td");
    actions.appendChild(button(s.enabled ? "Disable" : "Enable", {{ action: "toggle", id: s.id }}));
    actions.appendChild(button("Configure", {{ action: "configure", id: s.id }}));
    actions.appendChild(button("Delete", {{ action: "delete", id: s.id }}));
    row.appendChild(actions);
    table.appendChild(row);
  }});
  root.appendChild(table);

  var add = el("select");
  state.catalog.forEach(function (c) {{
    var opt = el("option", c.nameLong);
    opt.value = c.id;
    add.appendChild(opt);
  }});
  root.appendChild(add);
  var addButton = el("button", "Add");
  addButton.onclick = function () {{ send({{ action: "add-service", serviceType: add.value }}); }};
  root.appendChild(addButton);

  root.appendChild(el("h2", "Default view"));
  var view = el("select");
  view.appendChild(el("option", "Settings"));
  state.defaultViewOptions.forEach(function (o) {{
    var opt = el("option", o.name);
    opt.value = o.id;
    opt.selected = o.id === state.defaultView;
    view.appendChild(opt);
  }});
  root.appendChild(view);
  var setView = el("button", "Save");
  setView.onclick = function () {{
    if (view.selectedIndex === 0) {{ send({{ action: "reset-default-view" }}); }}
    else {{ send({{ action: "set-default-view", id: view.value }}); }}
  }};
  root.appendChild(setView);

  root.appendChild(el("h2", "General"));
  root.appendChild(checkbox("Start at login", state.autostart, "autostart"));
  root.appendChild(checkbox("Start minimized", state.autostartMinimized, "autostart-minimized"));
  root.appendChild(checkbox("Hide menubar", state.hideMenubar, "hide-menubar"));
  root.appendChild(button("Open configuration folder", {{ action: "open-config-folder" }}));
}};
</script></body></html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_actions() {
        assert_eq!(
            UiAction::decode(r#"{"action":"switch-tab","tab":"settings"}"#),
            Some(UiAction::SwitchTab { tab: "settings".into() })
        );
        assert_eq!(
            UiAction::decode(r#"{"action":"add-service","serviceType":"slack"}"#),
            Some(UiAction::AddService { service_type: "slack".into() })
        );
        assert_eq!(
            UiAction::decode(r#"{"action":"autostart","enabled":true}"#),
            Some(UiAction::Autostart { enabled: true })
        );
        assert_eq!(
            UiAction::decode(r#"{"action":"dismiss-notice","index":1}"#),
            Some(UiAction::DismissNotice { index: 1 })
        );
        assert_eq!(UiAction::decode(r#"{"action":"dismiss-notice","index":-1}"#), None);
        assert_eq!(UiAction::decode(r#"{"action":"launch-rockets"}"#), None);
        assert_eq!(UiAction::decode("not json"), None);
    }

    #[test]
    fn test_tab_id_from_strip() {
        assert_eq!(UiAction::tab_id("settings").unwrap(), TabId::Settings);
        assert!(matches!(UiAction::tab_id("abc_slack").unwrap(), TabId::Service(_)));
        assert!(UiAction::tab_id("../etc").is_err());
    }

    #[test]
    fn test_render_script_embeds_state() {
        let view = StripView {
            tabs: vec![],
            notices: vec![NoticeView {
                level: "info".into(),
                message: "hi".into(),
            }],
        };
        let script = render_script(&view);
        assert!(script.starts_with("window.render && window.render({"));
        assert!(script.contains(r#""message":"hi""#));
    }

    #[test]
    fn test_pages_define_render() {
        assert!(strip_page().contains("window.render = function"));
        assert!(settings_page().contains("window.render = function"));
    }

    #[test]
    fn test_strip_notices_are_dismissable() {
        assert!(strip_page().contains(r#"action: "dismiss-notice", index: index"#));
    }
}

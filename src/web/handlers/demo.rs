//! Demo page: a small form whose control state travels in hidden fields.

use std::fmt::Write as _;

use axum::{extract::State, http::StatusCode, response::Html, Form};

use crate::codec::Value;
use crate::error::StateError;
use crate::page::{Page, PostedFields};
use crate::tree::{ControlTree, NodeId, NodeSpec, StateMode};
use crate::web::error::WebError;
use crate::web::state::WebAppState;

/// Layout key of the demo template. Bump when its control structure changes.
pub const DEMO_LAYOUT: &str = "demo/counter@1";

/// Form field naming the posted interaction, as `target` or `target|argument`.
pub const EVENT_FIELD: &str = "__EVENT";

/// Handles to the controls the demo reads and writes.
#[derive(Debug, Clone, Copy)]
pub struct DemoControls {
    pub form: NodeId,
    pub count: NodeId,
    pub name: NodeId,
    pub greeting: NodeId,
    pub toggle: NodeId,
    pub notice: NodeId,
    pub inc: NodeId,
    pub dec: NodeId,
    pub greet: NodeId,
    pub flip: NodeId,
}

/// Build the demo template. Defaults written here happen before tracking,
/// so they never reach the persisted state.
pub fn build_demo_tree(separator: char) -> (ControlTree, DemoControls) {
    let mut tree = ControlTree::with_separator("page", separator);
    let root = tree.root();
    let form = tree.add_child(root, NodeSpec::new("form").id("form").naming_container());

    let count = tree.add_child(form, NodeSpec::new("label").id("count"));
    tree.set(count, "value", 0);
    let name = tree.add_child(form, NodeSpec::new("textbox").id("name"));
    tree.set(name, "text", "");
    let greeting = tree.add_child(form, NodeSpec::new("label").id("greeting"));
    tree.set(greeting, "text", "Hello, stranger");
    let toggle = tree.add_child(form, NodeSpec::new("checkbox").id("toggle"));
    tree.set(toggle, "on", false);
    let notice = tree.add_child(
        form,
        NodeSpec::new("label").id("notice").state_mode(StateMode::Disabled),
    );

    let inc = tree.add_child(form, NodeSpec::new("button").id("inc"));
    let dec = tree.add_child(form, NodeSpec::new("button").id("dec"));
    let greet = tree.add_child(form, NodeSpec::new("button").id("greet"));
    let flip = tree.add_child(form, NodeSpec::new("button").id("flip"));

    let controls = DemoControls {
        form,
        count,
        name,
        greeting,
        toggle,
        notice,
        inc,
        dec,
        greet,
        flip,
    };
    (tree, controls)
}

/// Shown when a posted interaction was never offered by the previous response.
const REJECTED_NOTICE: &str = "That action was not offered by this page; nothing was changed.";

/// One finished request cycle.
#[derive(Debug)]
struct Rendered {
    html: String,
    /// The posted interaction failed replay validation and was not dispatched.
    rejected: bool,
}

impl Rendered {
    fn into_response(self) -> (StatusCode, Html<String>) {
        let status = if self.rejected {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::OK
        };
        (status, Html(self.html))
    }
}

/// Show the page on a first visit.
pub async fn show_page(
    State(state): State<WebAppState>,
) -> Result<(StatusCode, Html<String>), WebError> {
    run_cycle(&state, &[]).map(Rendered::into_response)
}

/// Rebuild the page, restore its state, and handle the posted interaction.
///
/// An interaction that fails replay validation is dropped, but the page is
/// still rendered (with status 400) so the visitor keeps the form.
pub async fn post_page(
    State(state): State<WebAppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<(StatusCode, Html<String>), WebError> {
    run_cycle(&state, &pairs).map(Rendered::into_response)
}

fn run_cycle(state: &WebAppState, pairs: &[(String, String)]) -> Result<Rendered, WebError> {
    let (tree, controls) = build_demo_tree(state.id_separator());
    let mut page = Page::new(tree, DEMO_LAYOUT, state.persister().clone()).with_options(state.options());
    // Post counter; kept even with state persistence off.
    page.require_control_state(controls.form);

    let posted = PostedFields::from_form(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    let report = page.load(&posted)?;
    if report.postback {
        let posts = page
            .tree()
            .control_state(controls.form)
            .and_then(Value::as_i64)
            .unwrap_or(0);
        page.tree_mut().set_control_state(controls.form, posts.saturating_add(1));
    }
    if report.layout_mismatch {
        set(&mut page, controls.notice, "text", "The page changed; your previous input was reset.");
    }

    let name_field = page.tree().unique_id(controls.name);
    if let Some((_, text)) = pairs.iter().find(|(k, _)| *k == name_field) {
        set(&mut page, controls.name, "text", text.as_str());
    }

    let mut rejected = false;
    if let Some((_, event)) = pairs.iter().find(|(k, _)| k == EVENT_FIELD) {
        let (target, argument) = match event.split_once('|') {
            Some((target, argument)) => (target, Some(argument)),
            None => (event.as_str(), None),
        };
        match page.validate_interaction(target, argument) {
            Ok(()) => dispatch(&mut page, &controls, target, argument)?,
            Err(e @ StateError::InvalidInteraction { .. }) => {
                tracing::warn!(error = %e, "Dropped posted interaction");
                set(&mut page, controls.notice, "text", REJECTED_NOTICE);
                rejected = true;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let html = render(&mut page, &controls)?;
    Ok(Rendered { html, rejected })
}

fn dispatch(
    page: &mut Page,
    controls: &DemoControls,
    target: &str,
    argument: Option<&str>,
) -> Result<(), WebError> {
    let node = page
        .tree()
        .find_by_unique_id(target)
        .ok_or_else(|| WebError::BadRequest(format!("Unknown control `{target}`")))?;
    tracing::debug!(target_id = %target, argument = ?argument, "Dispatching interaction");

    let count = int(page, controls.count, "value");
    if node == controls.inc {
        let step = argument
            .map(str::parse::<i32>)
            .transpose()
            .map_err(|_| WebError::BadRequest(format!("Invalid step for `{target}`")))?
            .unwrap_or(1);
        set(page, controls.count, "value", count.saturating_add(step));
    } else if node == controls.dec {
        set(page, controls.count, "value", count.saturating_sub(1));
    } else if node == controls.greet {
        let name = text(page, controls.name, "text");
        let greeting = if name.trim().is_empty() {
            "Hello, stranger".to_string()
        } else {
            format!("Hello, {}", name.trim())
        };
        set(page, controls.greeting, "text", greeting);
    } else if node == controls.flip {
        let on = page.tree().get(controls.toggle, "on").and_then(Value::as_bool).unwrap_or(false);
        set(page, controls.toggle, "on", !on);
    } else {
        return Err(WebError::BadRequest(format!("`{target}` is not a button")));
    }
    Ok(())
}

fn render(page: &mut Page, controls: &DemoControls) -> Result<String, WebError> {
    let buttons = [
        (controls.inc, Some("1"), "+1"),
        (controls.inc, Some("10"), "+10"),
        (controls.dec, None, "-1"),
        (controls.greet, None, "Greet"),
        (controls.flip, None, "Toggle"),
    ];

    let mut button_html = String::new();
    for (node, argument, caption) in buttons {
        let target = page.tree().unique_id(node);
        page.register_interaction(&target, argument);
        let value = match argument {
            Some(argument) => format!("{target}|{argument}"),
            None => target,
        };
        let _ = writeln!(
            button_html,
            r#"  <button type="submit" name="{EVENT_FIELD}" value="{}">{}</button>"#,
            escape_html(&value),
            escape_html(caption)
        );
    }

    let fields = page.save()?;
    let mut hidden = String::new();
    for (name, value) in fields.hidden_fields() {
        let _ = writeln!(
            hidden,
            r#"  <input type="hidden" name="{}" value="{}">"#,
            escape_html(&name),
            escape_html(&value)
        );
    }

    let count = int(page, controls.count, "value");
    let name_field = page.tree().unique_id(controls.name);
    let on = page.tree().get(controls.toggle, "on").and_then(Value::as_bool).unwrap_or(false);
    let notice = text(page, controls.notice, "text");
    let posts = page
        .tree()
        .control_state(controls.form)
        .and_then(Value::as_i64)
        .unwrap_or(0);

    Ok(format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>postback demo</title></head>
<body>
<form method="post" action="/">
{hidden}  <p class="notice">{notice}</p>
  <p>Posts: <output id="posts">{posts}</output></p>
  <p>Count: <output id="count">{count}</output></p>
  <p>Toggle: <output id="toggle">{toggle}</output></p>
  <p><label>Name <input type="text" name="{name_field}" value="{name}"></label></p>
  <p id="greeting">{greeting}</p>
{button_html}</form>
</body>
</html>
"#,
        notice = escape_html(&notice),
        toggle = if on { "on" } else { "off" },
        name_field = escape_html(&name_field),
        name = escape_html(&text(page, controls.name, "text")),
        greeting = escape_html(&text(page, controls.greeting, "text")),
    ))
}

fn set(page: &mut Page, node: NodeId, key: &str, value: impl Into<Value>) {
    page.tree_mut().set(node, key, value);
}

fn int(page: &Page, node: NodeId, key: &str) -> i32 {
    page.tree()
        .get(node, key)
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok())
        .unwrap_or(0)
}

fn text(page: &Page, node: NodeId, key: &str) -> String {
    page.tree()
        .get(node, key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, anyhow};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

use crate::Data;
use crate::config::ViewSettings;
use crate::protocol::{ChangeRequest, Changeset, Handler, LiveSession, LiveView, handler};
use crate::render::{TemplateSet, Templates};
use crate::transport::RequestInfo;
use crate::utils::LiveResult;
use crate::wire::{Action, escape_html};

const DEFAULT_LIMIT: usize = 3;
const MIN_TEXT_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub text: String,
    pub status: String,
    /// Monotonic edit sequence used for ordering.
    pub updated: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    pub offset: usize,
    pub limit: usize,
    pub order: String,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
            order: "asc".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TodoRequest {
    id: String,
    text: String,
}

/// In-memory stand-in for the todo table.
#[derive(Debug, Default)]
pub struct TodoStore {
    todos: RwLock<Vec<Todo>>,
    clock: AtomicU64,
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn create(&self, text: &str) -> Todo {
        let todo = Todo {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            status: "inprogress".to_string(),
            updated: self.tick(),
        };
        self.todos.write().push(todo.clone());
        todo
    }

    pub fn update(&self, id: &str, text: &str) -> Option<Todo> {
        let updated = self.tick();
        let mut todos = self.todos.write();
        let todo = todos.iter_mut().find(|t| t.id == id)?;
        todo.text = text.to_string();
        todo.updated = updated;
        Some(todo.clone())
    }

    pub fn delete(&self, id: &str) -> bool {
        let mut todos = self.todos.write();
        let before = todos.len();
        todos.retain(|t| t.id != id);
        todos.len() != before
    }

    pub fn count(&self) -> usize {
        self.todos.read().len()
    }

    pub fn page(&self, query: &Query) -> Vec<Todo> {
        let mut todos = self.todos.read().clone();
        todos.sort_by_key(|t| t.updated);
        if query.order != "asc" {
            todos.reverse();
        }
        todos
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect()
    }
}

/// Change-request handlers of the todos page.
#[derive(Debug, Clone)]
pub struct TodoHandlers {
    db: Arc<TodoStore>,
}

impl TodoHandlers {
    pub fn new(db: Arc<TodoStore>) -> Self {
        Self { db }
    }

    /// Handlers keyed by change request id.
    pub fn handlers(&self) -> Vec<(String, Handler)> {
        let list = self.clone();
        let insert = self.clone();
        let update = self.clone();
        let delete = self.clone();
        vec![
            (
                "list".to_string(),
                handler(move |req, s| {
                    let this = list.clone();
                    async move { this.list(req, s) }
                }),
            ),
            (
                "insert".to_string(),
                handler(move |req, s| {
                    let this = insert.clone();
                    async move { this.create(req, s) }
                }),
            ),
            (
                "update".to_string(),
                handler(move |req, s| {
                    let this = update.clone();
                    async move { this.update(req, s) }
                }),
            ),
            (
                "delete".to_string(),
                handler(move |req, s| {
                    let this = delete.clone();
                    async move { this.delete(req, s) }
                }),
            ),
            (
                "validate_input".to_string(),
                handler(|req, s| async move { validate_input(req, s) }),
            ),
        ]
    }

    pub fn on_mount(&self, _req: &RequestInfo) -> (u16, Data) {
        match self.page_data(&Query::default()) {
            Ok(data) => (200, data),
            Err(e) => {
                error!("todos on mount: {e}");
                (500, Data::new())
            }
        }
    }

    fn page_data(&self, query: &Query) -> LiveResult<Data> {
        let limit = query.limit.max(1);
        let query = Query {
            limit,
            ..query.clone()
        };
        let count = self.db.count();
        let mut data = Data::new();
        data.insert("todos".into(), serde_json::to_value(self.db.page(&query))?);
        if count.saturating_sub(query.offset) > limit {
            data.insert("next".into(), json!(query.offset + limit));
        }
        if query.offset >= limit {
            data.insert("prev".into(), json!(query.offset - limit));
        }
        data.insert("limit".into(), json!(limit));
        data.insert("offset".into(), json!(query.offset));
        data.insert("order".into(), json!(query.order));
        data.insert("query".into(), serde_json::to_value(&query)?);
        Ok(data)
    }

    fn current_query(session: &LiveSession) -> Query {
        session.get_as("query").ok().flatten().unwrap_or_default()
    }

    fn list(&self, req: ChangeRequest, s: LiveSession) -> anyhow::Result<()> {
        let query: Query = params(&req).context("error parsing params")?;
        let data = self.page_data(&query).context("error fetching data")?;
        s.change(Changeset::from(data));
        Ok(())
    }

    fn create(&self, req: ChangeRequest, s: LiveSession) -> anyhow::Result<()> {
        s.temporary(["loading"]);
        s.change(loading(true));
        let result = self.insert_todo(&req, &s);
        s.change(loading(false));
        result
    }

    fn insert_todo(&self, req: &ChangeRequest, s: &LiveSession) -> anyhow::Result<()> {
        let params: TodoRequest = params(req).context("err decode params")?;
        if params.text.chars().count() < MIN_TEXT_LEN {
            return Err(anyhow!("minimum text size is {MIN_TEXT_LEN}")).context("err");
        }
        self.db.create(&params.text);
        let data = self
            .page_data(&Self::current_query(s))
            .context("error fetching data")?;
        s.change(Changeset::from(data));
        Ok(())
    }

    fn update(&self, req: ChangeRequest, s: LiveSession) -> anyhow::Result<()> {
        let params: TodoRequest = params(&req).context("err decode params")?;
        if params.text.chars().count() < MIN_TEXT_LEN {
            return Err(anyhow!("minimum text size is {MIN_TEXT_LEN}")).context("err");
        }
        let todo = self
            .db
            .update(&params.id, &params.text)
            .ok_or_else(|| anyhow!("todo not found"))
            .with_context(|| format!("err update todo {}", params.id))?;
        s.flash(
            s.settings().flash_duration(),
            Changeset::new().insert("message", "saved"),
        );
        s.change(Changeset::from_serialize(&todo)?);
        Ok(())
    }

    fn delete(&self, req: ChangeRequest, s: LiveSession) -> anyhow::Result<()> {
        let params: TodoRequest = params(&req).context("err decode params")?;
        if !self.db.delete(&params.id) {
            return Err(anyhow!("error deleting todo"))
                .with_context(|| format!("err delete todo {}", params.id));
        }
        let data = self
            .page_data(&Self::current_query(&s))
            .context("error fetching data")?;
        s.change(Changeset::from(data));
        Ok(())
    }
}

/// Missing params decode to the default value.
fn params<T: DeserializeOwned + Default>(req: &ChangeRequest) -> LiveResult<T> {
    if req.params.is_null() {
        return Ok(T::default());
    }
    req.decode_params()
}

fn loading(enable: bool) -> Changeset {
    let change = Changeset::target(Action::Update, "new_todo", "new_todo");
    if enable {
        change.insert("loading", 1)
    } else {
        change
    }
}

fn validate_input(req: ChangeRequest, s: LiveSession) -> anyhow::Result<()> {
    let params: TodoRequest = params(&req).context("err decode params")?;
    let change = Changeset::target(Action::Update, "new_todo", "new_todo");
    if params.text.chars().count() < MIN_TEXT_LEN {
        s.temporary(["new_todo_error"]);
        s.change(change.insert(
            "new_todo_error",
            format!("minimum text length is {MIN_TEXT_LEN}"),
        ));
    } else {
        s.change(change);
    }
    Ok(())
}

fn text(d: &Data, key: &str) -> String {
    match d.get(key) {
        Some(Value::String(s)) => escape_html(s),
        Some(Value::Null) | None => String::new(),
        Some(other) => escape_html(&other.to_string()),
    }
}

fn render_items(set: &TemplateSet, d: &Data) -> LiveResult<String> {
    let mut html = String::new();
    if let Some(Value::Array(todos)) = d.get("todos") {
        for todo in todos {
            if let Value::Object(item) = todo {
                html.push_str(&set.render("todo-item", item)?);
            }
        }
    }
    Ok(html)
}

/// Fragments of the todos page.
pub fn templates() -> TemplateSet {
    TemplateSet::new()
        .fragment("layout", |set, d| {
            Ok(format!(
                "<!doctype html><html><body>{}<div id=\"glv-flash\"></div>{}{}</body></html>",
                set.render("glv-error", &Data::new())?,
                set.render("new_todo", &Data::new())?,
                set.render("todos", d)?,
            ))
        })
        .fragment("todos", |set, d| {
            let mut pager = String::new();
            if d.contains_key("prev") {
                pager.push_str(&format!(
                    "<button data-offset=\"{}\">prev</button>",
                    text(d, "prev")
                ));
            }
            if d.contains_key("next") {
                pager.push_str(&format!(
                    "<button data-offset=\"{}\">next</button>",
                    text(d, "next")
                ));
            }
            Ok(format!(
                "<div id=\"todos\"><ul id=\"todo-list\">{}</ul>{}</div>",
                render_items(set, d)?,
                pager
            ))
        })
        .fragment("todo-item", |_, d| {
            Ok(format!(
                "<li id=\"todo-{}\" class=\"{}\">{}</li>",
                text(d, "id"),
                text(d, "status"),
                text(d, "text")
            ))
        })
        .fragment("new_todo", |_, d| {
            let disabled = if d.contains_key("loading") { " disabled" } else { "" };
            Ok(format!(
                "<form id=\"new_todo\"><input name=\"text\"{disabled}><small>{}</small></form>",
                text(d, "new_todo_error")
            ))
        })
        .fragment("glv-error", |_, d| {
            Ok(format!("<div id=\"glv-error\">{}</div>", text(d, "error")))
        })
        .fragment("glv-flash-message", |_, d| {
            Ok(format!(
                "<p id=\"{}\" class=\"flash\">{}</p>",
                text(d, "flash_id"),
                text(d, "message")
            ))
        })
}

/// Assembles the todos page over `db`.
pub fn live_view(settings: ViewSettings, db: Arc<TodoStore>) -> LiveView {
    let todos = TodoHandlers::new(db);
    let mount = todos.clone();
    LiveView::builder(Arc::new(templates()))
        .settings(settings)
        .handlers(todos.handlers())
        .on_mount(move |req| mount.on_mount(req))
        .build()
}

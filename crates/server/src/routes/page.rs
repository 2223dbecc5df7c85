use actix_web::{get, web, HttpResponse};
use std::sync::Arc;

use crate::state::AppState;
use crate::types::TaskTrigger;

/// GET / - the single page; submits a run per render when enabled
#[get("/")]
pub async fn home(state: web::Data<Arc<AppState>>) -> HttpResponse {
    let task_id = if state.config.run_on_render {
        Some(state.submit_workflow(TaskTrigger::Render).await)
    } else {
        None
    };

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render_home(task_id.as_deref()))
}

pub fn render_home(task_id: Option<&str>) -> String {
    let status = match task_id {
        Some(id) => format!(
            r#"<p class="status">Workflow run <a href="/progress/{id}">{id}</a> started.</p>"#,
            id = id
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>pinecall</title>
  <style>
    body {{ margin: 0; background: #0f172a; color: #fff; font-family: sans-serif; }}
    main {{ display: flex; min-height: 100vh; flex-direction: column; align-items: center; justify-content: center; }}
    button {{ font-weight: bold; color: #fff; background: transparent; border: 1px solid #60a5fa; padding: 0.5rem 1rem; }}
    a {{ color: #93c5fd; }}
  </style>
</head>
<body>
  <main>
    <form method="post" action="/run">
      <button type="submit">Press me to run</button>
    </form>
    {status}
  </main>
</body>
</html>
"#,
        status = status
    )
}

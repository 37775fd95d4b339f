use crate::context::AppContext;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use lessonmap_application::LessonView;
use lessonmap_core::api::DiagramSink;
use lessonmap_core::diagram::{NodeRef, RenderOutcome, extract_node_labels};
use lessonmap_core::generation::GenerationState;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Echoes streamed diagram text to stdout as it arrives.
#[derive(Default)]
struct StdoutSink {
    printed: Mutex<usize>,
}

impl DiagramSink for StdoutSink {
    fn publish(&self, text: &str, streaming: bool) {
        let mut printed = self.printed.lock().unwrap_or_else(|e| e.into_inner());
        let mut stdout = std::io::stdout().lock();
        if let Some(delta) = text.get(*printed..) {
            let _ = stdout.write_all(delta.as_bytes());
            *printed = text.len();
        }
        if !streaming && !text.ends_with('\n') {
            let _ = stdout.write_all(b"\n");
        }
        let _ = stdout.flush();
    }
}

pub async fn generate(ctx: &AppContext, topic: &str, save: bool, svg: Option<&Path>) -> Result<()> {
    let lessons = ctx.lessons()?;
    lessons.set_prompt(topic);

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("[Generate] Interrupted, cancelling stream");
                cancel.cancel();
            }
        })
    };

    let state = lessons.generate(&StdoutSink::default(), &cancel, save).await;
    ctrl_c.abort();

    match state? {
        GenerationState::Idle if cancel.is_cancelled() => return Ok(()),
        GenerationState::Idle => bail!("generation failed"),
        _ => {}
    }

    println!();
    print_diagram(&lessons.view(), svg, false)
}

pub async fn list(ctx: &AppContext) -> Result<()> {
    let lessons = ctx.lessons()?;
    let Some(history) = lessons.refresh_history().await else {
        bail!("could not load lessons");
    };

    if history.is_empty() {
        println!("No saved lessons.");
        return Ok(());
    }

    for lesson in history.iter().rev() {
        println!(
            "{}  {}  {}",
            lesson.id.bright_black(),
            lesson.title.bold(),
            format!(
                "(grade {}, {})",
                lesson.grade.as_deref().unwrap_or("?"),
                lesson.model_used.as_deref().unwrap_or("unknown model")
            )
            .bright_black()
        );
    }
    Ok(())
}

pub async fn show(ctx: &AppContext, id: &str, svg: Option<&Path>) -> Result<()> {
    let lessons = ctx.lessons()?;
    if lessons.open_lesson(id).await.is_none() {
        bail!("could not open lesson {id}");
    }

    let view = lessons.view();
    println!("{}", view.prompt.bold());
    println!(
        "{}",
        format!(
            "grade {}, {}",
            view.grade,
            view.model.as_deref().unwrap_or("unknown model")
        )
        .bright_black()
    );
    println!();
    print_diagram(&view, svg, true)?;

    let nodes = match &view.render {
        Some(RenderOutcome::Rendered(diagram)) => diagram.nodes(),
        _ => extract_node_labels(&view.diagram),
    };
    if !nodes.is_empty() {
        println!();
        println!("{}", "Subtopics (lessonmap open <lesson-id> <node-id>):".bright_black());
        for NodeRef { id, label } in nodes {
            println!("  {}  {}", id.cyan(), label);
        }
    }
    Ok(())
}

pub async fn open(ctx: &AppContext, id: &str, node_id: &str) -> Result<()> {
    let lessons = ctx.lessons()?;
    if lessons.open_lesson(id).await.is_none() {
        bail!("could not open lesson {id}");
    }

    let Some(content) = lessons.select_node(node_id).await else {
        bail!("lesson {id} has no node '{node_id}'");
    };

    let view = lessons.view();
    if let Some(node) = &view.selected_node {
        println!("{} {}", view.prompt.bright_black(), format!("› {}", node.label).bold());
        println!();
    }
    println!("{content}");
    Ok(())
}

pub async fn delete(ctx: &AppContext, id: &str) -> Result<()> {
    let lessons = ctx.lessons()?;
    if !lessons.delete_lesson(id).await {
        bail!("could not delete lesson {id}");
    }
    println!("{} Deleted lesson {}", "✔".green(), id);
    Ok(())
}

pub async fn clear_history(ctx: &AppContext) -> Result<()> {
    let lessons = ctx.lessons()?;
    if !lessons.clear_history().await {
        bail!("could not clear history");
    }
    println!("{} Cleared lesson history", "✔".green());
    Ok(())
}

/// Prints the outline of a rendered diagram and writes the SVG if asked.
///
/// Unrendered text is only echoed with `echo_raw`; `generate` has already
/// streamed it.
fn print_diagram(view: &LessonView, svg: Option<&Path>, echo_raw: bool) -> Result<()> {
    match &view.render {
        Some(RenderOutcome::Rendered(diagram)) => {
            print!("{}", diagram.outline());
            if let Some(path) = svg {
                std::fs::write(path, diagram.svg())
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("{} Wrote {}", "✔".green(), path.display());
            }
        }
        Some(RenderOutcome::Failed { message }) => {
            eprintln!("{}", format!("Diagram could not be rendered: {message}").yellow());
            if echo_raw {
                println!("{}", view.diagram);
            }
            if svg.is_some() {
                tracing::warn!("[Renderer] No SVG written for an unrendered diagram");
            }
        }
        Some(RenderOutcome::Raw(text)) => println!("{text}"),
        None => println!("{}", "(no diagram)".bright_black()),
    }
    Ok(())
}

use orphan_core::CreateOutcome;

use super::Panel;

/// Execute the `create` command: create the document an orphan link points to.
///
/// A document that already exists is reported and opened, not treated as a failure.
pub async fn execute(panel: &Panel, name: &str) -> Result<String, String> {
    let outcome = panel
        .view()
        .create_from_orphan(name)
        .await
        .map_err(|e| e.to_string())?;

    let doc = outcome.document();
    let path = panel.store().path_for(&doc.id);
    let message = match &outcome {
        CreateOutcome::Created(_) => format!("Created {} ({})", doc.id, path.display()),
        CreateOutcome::OpenedExisting(_) => {
            format!("{} already exists, opening it ({})", doc.id, path.display())
        }
    };
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::test_support::panel_with;

    #[tokio::test]
    async fn creates_file_from_template() {
        let (dir, panel) = panel_with(&[("A.md", "[[Ghost]]")]).await;
        let output = execute(&panel, "Ghost").await.unwrap();
        assert!(output.starts_with("Created Ghost.md"), "got {}", output);
        assert_eq!(std::fs::read_to_string(dir.path().join("Ghost.md")).unwrap(), "# Ghost\n");
        assert!(panel.view().get_orphans().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn existing_document_is_opened() {
        let (_dir, panel) = panel_with(&[("A.md", "[[Ghost]]"), ("Ghost.md", "hi")]).await;
        let output = execute(&panel, "Ghost").await.unwrap();
        assert!(output.starts_with("Ghost.md already exists"), "got {}", output);
    }

    #[tokio::test]
    async fn invalid_name_reports_reason() {
        let (_dir, panel) = panel_with(&[("A.md", "[[what?]]")]).await;
        let err = execute(&panel, "what?").await.unwrap_err();
        assert!(err.contains("contains '?'"), "got {}", err);
        assert_eq!(panel.view().get_orphans().await.unwrap(), vec!["what?"]);
    }
}

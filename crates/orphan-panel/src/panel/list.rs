use orphan_core::PanelState;

use super::Panel;

/// Execute the `list` command: render the orphan panel.
///
/// An existence-check failure is returned as `Err` so it is never shown as an
/// empty panel.
pub async fn execute(panel: &Panel, json: bool) -> Result<String, String> {
    if json {
        let orphans = panel.view().get_orphans().await.map_err(|e| e.to_string())?;
        return serde_json::to_string_pretty(&orphans).map_err(|e| e.to_string());
    }

    match panel.view().render().await {
        PanelState::Error(reason) => Err(format!("could not compute orphan links: {}", reason)),
        state => Ok(state.to_string()),
    }
}

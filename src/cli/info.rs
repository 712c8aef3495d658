use super::ui;
use crate::core::session::QuerySession;
use anyhow::Result;

pub async fn run(session: &QuerySession) -> Result<()> {
    let pb = ui::new_spinner("Fetching ticker info...");
    let result = session.info().await;
    pb.finish_and_clear();

    let info = result?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

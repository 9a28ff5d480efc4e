use super::{json_pretty, EXIT_SUCCESS};
use berth_model::volumes;

pub fn run(workspace_id: &str, origin: &str, json: bool) -> Result<u8, String> {
    let volume = volumes::generate(workspace_id, origin);
    if json {
        let payload = serde_json::json!({
            "workspace_id": workspace_id,
            "origin": origin,
            "volume": volume,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{volume}");
    }
    Ok(EXIT_SUCCESS)
}

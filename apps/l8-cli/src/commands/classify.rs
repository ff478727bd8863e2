// classify.rs — `l8 classify`: show the gateway's decision without running anything.

use l8_exec::Gateway;

pub fn execute(
    ctx: &super::Context,
    command: &str,
    approval: Option<&str>,
    json: bool,
) -> anyhow::Result<i32> {
    let gateway = Gateway::new(ctx.exec_config()?);
    let decision = gateway.evaluate(command, approval);

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        println!("{}", decision.classification);
        if let Some(reason) = &decision.block_reason {
            println!("{}", reason);
        }
    }
    Ok(0)
}

use anyhow::Result;

pub fn execute() -> Result<()> {
    println!("vigil version {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

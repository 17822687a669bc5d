use shared::{
    Result,
    info,
};

use dump2xyz::cli::run;

fn main() -> Result<()> {
    let now = std::time::Instant::now();

    run()?;

    info!("Time used: {:?}", now.elapsed());
    Ok(())
}

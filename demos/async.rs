use corsairlink::{aio::PowerSupply, OpenError, RAILS};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), OpenError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut list = corsairlink::list()?;
    if let Some(path) = list.pop() {
        let psu = PowerSupply::open(path).await?;
        println!("Model: {:?}", psu.model());
        println!("Name: {}", psu.identity());
        println!("PC uptime: {:?}", psu.pc_uptime().await);
        println!("PSU uptime: {:?}", psu.uptime().await);
        println!("Temp1: {:?}", psu.temperature(0).await);
        println!("Temp2: {:?}", psu.temperature(1).await);
        println!("Fan: {:?} RPM", psu.fan_rpm().await);
        println!("Input voltage: {:?} mV", psu.input_voltage().await);
        println!("Input power: {:?} uW", psu.input_power().await);

        for rail in RAILS.iter() {
            println!("{} sample: {:?}", rail, psu.rail(*rail).await);
        }
        Ok(())
    } else {
        println!("No power supplies found");
        Ok(())
    }
}

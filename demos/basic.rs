use corsairlink::{OpenError, PowerSupply, SensorKind, RAILS, SENSOR_KINDS};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), OpenError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut list = corsairlink::list()?;
    if let Some(path) = list.pop() {
        let psu = PowerSupply::open(path)?;
        println!("Model: {:?}", psu.model());
        println!("Name: {}", psu.identity());
        println!("Vendor: {:?}", psu.vendor());
        println!("Product: {:?}", psu.product());
        println!("PC uptime: {:?}", psu.pc_uptime());
        println!("PSU uptime: {:?}", psu.uptime());

        for kind in SENSOR_KINDS.iter() {
            for channel in 0..kind.channels() {
                let label = kind.label(channel).unwrap_or("");
                match psu.read(*kind, channel) {
                    Ok(value) => println!("{:?}{} {}: {}", kind, channel, label, value),
                    Err(e) => println!("{:?}{} {}: {}", kind, channel, label, e),
                }
            }
        }

        for rail in RAILS.iter() {
            let sample = psu.rail(*rail);
            println!("{} sample: {:#?}", rail, sample);
        }
        println!("+12V current: {:?} mA", psu.read(SensorKind::Current, 0));
        Ok(())
    } else {
        println!("No power supplies found");
        Ok(())
    }
}
